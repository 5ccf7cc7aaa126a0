use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::debug;

use kicad_compose::{Error, Project, Schematic};

/// Exit codes, one per failure category so batch callers can tell them
/// apart: errno-flavored codes for path problems, sysexits-flavored codes
/// for the parse taxonomy.
const EXIT_NOT_FOUND: i32 = 2;
const EXIT_TOO_MANY_PROJECTS: i32 = 7;
const EXIT_NOT_A_DIRECTORY: i32 = 20;
const EXIT_INVALID_ARGUMENT: i32 = 22;
const EXIT_SYNTAX: i32 = 65;
const EXIT_VERSION: i32 = 66;
const EXIT_VALIDATION: i32 = 67;
const EXIT_NOT_IMPLEMENTED: i32 = 68;
const EXIT_IO: i32 = 74;

/// Minimal project descriptor written next to a merged schematic.
const EMPTY_PROJECT: &str = r#"{
  "board": { "design_settings": {} },
  "boards": [],
  "libraries": { "pinned_footprint_libs": [], "pinned_symbol_libs": [] },
  "meta": { "filename": "{project_name}.kicad_pro", "version": 1 },
  "net_settings": { "classes": [] },
  "schematic": { "legacy_lib_dir": "", "legacy_lib_list": [] },
  "sheets": [],
  "text_variables": {}
}
"#;

#[derive(Parser)]
#[command(
    name = "kicad-compose",
    about = "Tool to parse, render, and merge KiCad projects"
)]
struct Cli {
    /// Extract metadata from a KiCad project and write JSON to stdout or to
    /// the output file
    #[arg(long)]
    extract_meta: bool,

    /// Merge the listed KiCad projects into a single project in the output
    /// directory
    #[arg(long, conflicts_with = "extract_meta")]
    merge: bool,

    /// Output directory for merge, or output file for metadata extraction
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path(s) to KiCad project directories or .kicad_pro files
    #[arg(required = true)]
    projects: Vec<PathBuf>,
}

fn error_exit_code(err: &Error) -> i32 {
    match err {
        Error::Syntax(_) => EXIT_SYNTAX,
        Error::Version { .. } => EXIT_VERSION,
        Error::Validation(_) => EXIT_VALIDATION,
        Error::NotImplemented(_) => EXIT_NOT_IMPLEMENTED,
        Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => EXIT_NOT_FOUND,
        Error::Io(_) | Error::Json(_) => EXIT_IO,
    }
}

fn fail(code: i32, message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(code);
}

/// Resolve a project directory or `.kicad_pro` path to the project name and
/// its root schematic and board files.
fn resolve_project(path: &Path) -> (String, PathBuf, PathBuf) {
    if path.extension().and_then(|e| e.to_str()) == Some("kicad_pro") {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sch = path.with_extension("kicad_sch");
        let pcb = path.with_extension("kicad_pcb");
        (name, sch, pcb)
    } else if path.is_dir() {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sch = path.join(format!("{name}.kicad_sch"));
        let pcb = path.join(format!("{name}.kicad_pcb"));
        (name, sch, pcb)
    } else {
        fail(
            EXIT_NOT_FOUND,
            format!(
                "{} doesn't point to a KiCad project file or project directory",
                path.display()
            ),
        );
    }
}

fn extract_meta(cli: &Cli) {
    if cli.projects.len() != 1 {
        fail(
            EXIT_TOO_MANY_PROJECTS,
            format!("need exactly one KiCad project, found {}", cli.projects.len()),
        );
    }
    let (_, sch_path, pcb_path) = resolve_project(&cli.projects[0]);

    let mut project = Project::new(sch_path, pcb_path);
    if let Err(e) = project.parse() {
        fail(error_exit_code(&e), e);
    }
    let metadata = match project.metadata() {
        Ok(m) => m,
        Err(e) => fail(error_exit_code(&e), e),
    };
    let json = match serde_json::to_string(&metadata) {
        Ok(j) => j,
        Err(e) => fail(EXIT_IO, e),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                fail(EXIT_IO, e);
            }
        }
        None => println!("{json}"),
    }
}

fn merge(cli: &Cli) {
    let Some(output) = &cli.output else {
        fail(EXIT_INVALID_ARGUMENT, "output needs to be specified");
    };
    if !output.is_dir() {
        fail(
            EXIT_NOT_A_DIRECTORY,
            format!("output path \"{}\" is not a directory", output.display()),
        );
    }
    let output_name = output
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "merged".to_string());

    // group the inputs, renaming repeated instances of the same project
    let mut order: Vec<PathBuf> = Vec::new();
    let mut instances: HashMap<PathBuf, Vec<String>> = HashMap::new();
    for path in &cli.projects {
        let (name, sch, _) = resolve_project(path);
        if !sch.is_file() {
            fail(
                EXIT_NOT_FOUND,
                format!("{} has no root schematic", path.display()),
            );
        }
        match instances.entry(path.clone()) {
            Entry::Vacant(entry) => {
                order.push(entry.key().clone());
                entry.insert(vec![name]);
            }
            Entry::Occupied(mut entry) => {
                let names = entry.get_mut();
                if names.len() == 1 {
                    let base = names[0].clone();
                    names[0] = format!("{base} 1");
                }
                let next = names.len() + 1;
                names.push(format!("{name} {next}"));
            }
        }
    }

    // parse everything before writing anything
    let mut merged: Vec<(String, Schematic)> = Vec::new();
    for path in &order {
        let (project_name, sch_path, _) = resolve_project(path);
        for instance_name in &instances[path] {
            debug!("merging schematic {} as {instance_name}", sch_path.display());
            let mut sch = match Schematic::from_file(&sch_path) {
                Ok(s) => s,
                Err(e) => fail(error_exit_code(&e), e),
            };
            sch.name = project_name.clone();
            merged.push((instance_name.clone(), sch));
        }
    }

    let mut target = Schematic::empty();
    if let Err(e) = target.append(&merged) {
        fail(error_exit_code(&e), e);
    }

    // write the combined schematic
    let target_path = output.join(format!("{output_name}.kicad_sch"));
    if let Err(e) = fs::write(&target_path, target.to_string()) {
        fail(EXIT_IO, e);
    }

    // copy the source schematics next to it
    for path in &order {
        let dir = if path.is_dir() {
            path.clone()
        } else {
            path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => fail(EXIT_IO, e),
        };
        for entry in entries.flatten() {
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) == Some("kicad_sch") && file.is_file() {
                let dest = output.join(file.file_name().unwrap_or_default());
                if let Err(e) = fs::copy(&file, &dest) {
                    fail(EXIT_IO, e);
                }
            }
        }
    }

    // generate the project descriptor
    let descriptor = EMPTY_PROJECT.replace("{project_name}", &output_name);
    if let Err(e) = fs::write(output.join(format!("{output_name}.kicad_pro")), descriptor) {
        fail(EXIT_IO, e);
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.extract_meta {
        extract_meta(&cli);
    } else if cli.merge {
        merge(&cli);
    } else {
        fail(
            EXIT_INVALID_ARGUMENT,
            "only --merge and --extract-meta are implemented for now",
        );
    }
}
