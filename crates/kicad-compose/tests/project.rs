//! End-to-end project tests over an on-disk fixture: hierarchical sheet
//! resolution, metadata numbers, and round-trip stability.

use std::fs;

use approx::assert_relative_eq;
use kicad_compose::sexpr::from_str;
use kicad_compose::{Error, Project, Schematic};

const TOP_SCH: &str = r##"(kicad_sch (version 20211123) (generator eeschema)
  (uuid 00000000-0000-4000-8000-0000000000f1)
  (paper "A4")
  (lib_symbols)
  (sheet (at 20 20) (size 12.7 7.62)
    (stroke (width 0) (type solid) (color 0 0 0 0))
    (fill (color 0 0 0 0.0))
    (uuid 00000000-0000-4000-8000-00000000e001)
    (property "Sheet name" "sub one" (id 0) (at 20 20 0))
    (property "Sheet file" "sub.kicad_sch" (id 1) (at 20 30 0)))
  (sheet (at 60 20) (size 12.7 7.62)
    (stroke (width 0) (type solid) (color 0 0 0 0))
    (fill (color 0 0 0 0.0))
    (uuid 00000000-0000-4000-8000-00000000e002)
    (property "Sheet name" "sub two" (id 0) (at 60 20 0))
    (property "Sheetfile" "sub.kicad_sch" (id 1) (at 60 30 0)))
  (symbol (lib_id "Device:R") (at 50 50 0) (unit 1) (in_bom yes) (on_board yes)
    (uuid 00000000-0000-4000-8000-0000000000a1)
    (property "Reference" "R1" (id 0) (at 0 0 0))
    (property "Value" "10k" (id 1) (at 0 0 0))
    (property "Footprint" "Resistor_SMD:R_0402" (id 2) (at 0 0 0)))
  (symbol (lib_id "power:GND") (at 60 60 0) (unit 1) (in_bom yes) (on_board yes)
    (uuid 00000000-0000-4000-8000-0000000000b1)
    (property "Reference" "#PWR01" (id 0) (at 0 0 0))
    (property "Value" "GND" (id 1) (at 0 0 0)))
  (symbol (lib_id "Device:R") (at 70 70 0) (unit 1) (in_bom no) (on_board yes)
    (uuid 00000000-0000-4000-8000-0000000000c1)
    (property "Reference" "R9" (id 0) (at 0 0 0))
    (property "Value" "DNP" (id 1) (at 0 0 0))
    (property "Footprint" "Resistor_SMD:R_0402" (id 2) (at 0 0 0)))
  (sheet_instances (path "/" (page "1")))
  (symbol_instances
    (path "/00000000-0000-4000-8000-0000000000a1"
      (reference "R1") (unit 1) (value "10k") (footprint "Resistor_SMD:R_0402"))
    (path "/00000000-0000-4000-8000-0000000000b1"
      (reference "#PWR01") (unit 1) (value "GND") (footprint ""))
    (path "/00000000-0000-4000-8000-00000000e001/00000000-0000-4000-8000-0000000000a2"
      (reference "C1") (unit 1) (value "100n") (footprint "Capacitor_SMD:C_0402"))
    (path "/00000000-0000-4000-8000-00000000e002/00000000-0000-4000-8000-0000000000a2"
      (reference "C2") (unit 1) (value "100n") (footprint "Capacitor_SMD:C_0402"))))
"##;

const SUB_SCH: &str = r#"(kicad_sch (version 20211123) (generator eeschema)
  (uuid 00000000-0000-4000-8000-0000000000f2)
  (paper "A4")
  (lib_symbols)
  (hierarchical_label "SIG" (shape input) (at 0 0 0)
    (effects (font (size 1.27 1.27))))
  (symbol (lib_id "Device:C") (at 30 30 0) (unit 1) (in_bom yes) (on_board yes)
    (uuid 00000000-0000-4000-8000-0000000000a2)
    (property "Reference" "C" (id 0) (at 0 0 0))
    (property "Value" "100n" (id 1) (at 0 0 0))
    (property "Footprint" "Capacitor_SMD:C_0402" (id 2) (at 0 0 0))
    (property "LCSC" "C1525" (id 3) (at 0 0 0))))
"#;

const PCB: &str = r#"(kicad_pcb (version 20211014) (generator pcbnew)
  (layers (0 "F.Cu" signal) (31 "B.Cu" signal) (34 "B.Paste" paste))
  (net 0 "") (net 1 "GND")
  (gr_poly (pts (xy 0 0) (xy 40 0) (xy 40 25) (xy 0 25))))
"#;

fn write_fixture(dir: &std::path::Path) {
    fs::write(dir.join("demo.kicad_sch"), TOP_SCH).unwrap();
    fs::write(dir.join("sub.kicad_sch"), SUB_SCH).unwrap();
    fs::write(dir.join("demo.kicad_pcb"), PCB).unwrap();
}

#[test]
fn test_project_metadata_numbers() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let mut project = Project::new(
        dir.path().join("demo.kicad_sch"),
        dir.path().join("demo.kicad_pcb"),
    );
    project.parse().unwrap();
    let metadata = project.metadata().unwrap();

    // R1 once, the shared sub-sheet symbol counted per instance; the power
    // symbol and the in_bom-excluded one are skipped
    assert_eq!(metadata.count_part, 3);
    // 10k/R_0402 and the LCSC-keyed capacitor
    assert_eq!(metadata.count_unique, 2);
    // top plus two sheet instances of the same file
    assert_eq!(metadata.sheets, 3);
    assert_eq!(metadata.copper_layers, Some(2));
    assert_relative_eq!(metadata.area.unwrap(), 1000.0);
    assert_relative_eq!(metadata.width.unwrap(), 40.0);
    assert_relative_eq!(metadata.height.unwrap(), 25.0);
    assert!(metadata.parse_time >= 0.0);

    // the shared symbol carries both instance references
    let cap = &metadata.parts["00000000-0000-4000-8000-0000000000a2"];
    assert_eq!(cap.references, vec!["C1".to_string(), "C2".to_string()]);
    assert_eq!(cap.properties["LCSC"], "C1525");
    // virtual symbols never make it into the parts table
    assert!(!metadata
        .parts
        .contains_key("00000000-0000-4000-8000-0000000000b1"));

    // the shared sub-sheet was parsed once
    assert_eq!(project.schematics.len(), 2);
}

#[test]
fn test_metadata_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let mut project = Project::new(
        dir.path().join("demo.kicad_sch"),
        dir.path().join("demo.kicad_pcb"),
    );
    project.parse().unwrap();
    let json = serde_json::to_value(project.metadata().unwrap()).unwrap();
    assert_eq!(json["count_part"], 3);
    assert_eq!(json["copper_layers"], 2);
    assert_eq!(
        json["parts"]["00000000-0000-4000-8000-0000000000a2"]["Reference"][0],
        "C1"
    );
}

#[test]
fn test_round_trip_stability() {
    for text in [TOP_SCH, SUB_SCH, PCB] {
        let parsed = from_str(text).unwrap();
        let once = parsed.to_string();
        let reparsed = from_str(&once).unwrap();
        assert_eq!(parsed, reparsed);
        // serialization is stable from the first round on
        assert_eq!(once, reparsed.to_string());
    }
}

#[test]
fn test_missing_pcb_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    fs::remove_file(dir.path().join("demo.kicad_pcb")).unwrap();

    let mut project = Project::new(
        dir.path().join("demo.kicad_sch"),
        dir.path().join("demo.kicad_pcb"),
    );
    match project.parse() {
        Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn test_old_format_version_is_rejected_early() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.kicad_sch");
    fs::write(
        &path,
        "(kicad_sch (version 20200310) (uuid 00000000-0000-4000-8000-0000000000f3))",
    )
    .unwrap();

    match Schematic::from_file(&path) {
        Err(Error::Version { found, .. }) => assert_eq!(found, 20200310),
        other => panic!("expected version error, got {other:?}"),
    }
}

#[test]
fn test_merge_of_parsed_projects() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let one = Schematic::from_file(&dir.path().join("demo.kicad_sch")).unwrap();
    let two = Schematic::from_file(&dir.path().join("sub.kicad_sch")).unwrap();

    let mut target = Schematic::empty();
    target
        .append(&[("demo".to_string(), one), ("sub".to_string(), two)])
        .unwrap();

    let text = target.to_string();
    let merged = from_str(&text).unwrap();
    assert_eq!(merged.get("sheet").list().len(), 2);
    // the sub project exposes its hierarchical label as a sheet pin
    let pins: Vec<_> = merged
        .get("sheet")
        .list()
        .iter()
        .flat_map(|s| s.get_all("pin"))
        .map(|p| p.str_at(0).unwrap().to_string())
        .collect();
    assert_eq!(pins, vec!["SIG".to_string()]);
}
