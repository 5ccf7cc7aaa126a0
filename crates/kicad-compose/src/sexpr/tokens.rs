//! Tokenizer for the KiCad s-expression text format.
//!
//! Splits raw text into parens, quoted strings, and maximal runs of other
//! non-whitespace characters. No semantic interpretation (number vs. symbol)
//! happens here. Quoted strings are one token with the quote characters and
//! any backslash escapes preserved verbatim.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

/// Split `text` into tokens.
///
/// Equivalent to scanning with `("[^"\\]*(?:\\.[^"\\]*)*"|\(|\)|"|[^\s()"]+)`:
/// an unterminated quote is not specially detected, the quote character just
/// becomes a token of its own and scanning continues after it.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
            b'(' => {
                tokens.push(Token::Open);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                pos += 1;
            }
            b'"' => {
                let start = pos;
                pos += 1;
                let mut closed = false;
                while pos < bytes.len() {
                    match bytes[pos] {
                        b'\\' => pos = (pos + 2).min(bytes.len()),
                        b'"' => {
                            pos += 1;
                            closed = true;
                            break;
                        }
                        _ => pos += 1,
                    }
                }
                if closed {
                    tokens.push(Token::Atom(&text[start..pos]));
                } else {
                    // degenerate: a lone quote token, continue after it
                    tokens.push(Token::Atom(&text[start..start + 1]));
                    pos = start + 1;
                }
            }
            _ => {
                let start = pos;
                while pos < bytes.len()
                    && !matches!(
                        bytes[pos],
                        b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'"'
                    )
                {
                    pos += 1;
                }
                tokens.push(Token::Atom(&text[start..pos]));
            }
        }
    }

    tokens
}
