//! G-code line parsing and parameter access.
//!
//! Two views of a line: the structured [`ParsedLine`] for code that wants the
//! whole shape, and the letter-keyed accessors ([`param_value`],
//! [`tool_index`]) for the scans that only need one number. Both are
//! comment-aware; nothing after `;` is ever treated as live.

pub mod ast;
pub mod lexer;

pub use ast::{Command, Comment, Parameter, ParsedLine};
pub use lexer::{Token, TokenKind, live_tokens, tokenize_line};

use crate::error::ValueError;

/// Parse a single line of G-code into structured data
pub fn parse_line(line: &str) -> ParsedLine {
    let tokens = lexer::tokenize_line(line);
    ast::tokens_to_parsed_line(&tokens)
}

/// Extract the numeric value of a letter-prefixed parameter from a line.
///
/// Returns `Ok(None)` when the letter is not present as a live parameter;
/// absence is a normal result. Returns an error when the letter *is* present
/// but its token does not parse as a number; callers must not coerce that to
/// zero (a silently-zeroed tool index corrupts every downstream scan).
///
/// A bare letter with no digits (a flag like the `X` in `G28 X Y`) counts as
/// absent, matching how the slicer's own accessor treats it.
pub fn param_value(line: &str, letter: char) -> Result<Option<f64>, ValueError> {
    for token in lexer::live_tokens(line) {
        let mut chars = token.text.chars();
        let Some(first) = chars.next() else { continue };
        if !first.eq_ignore_ascii_case(&letter) {
            continue;
        }

        let raw = chars.as_str();
        if raw.is_empty() {
            return Ok(None);
        }
        return match raw.parse::<f64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ValueError {
                letter: letter.to_ascii_uppercase(),
                raw: raw.to_string(),
            }),
        };
    }

    Ok(None)
}

/// The raw token following a parameter letter, comment-aware.
pub fn param_token(line: &str, letter: char) -> Option<&str> {
    lexer::live_tokens(line)
        .find(|t| {
            t.text
                .chars()
                .next()
                .is_some_and(|c| c.eq_ignore_ascii_case(&letter))
        })
        .map(|t| &t.text[1..])
}

/// The tool index of a tool-select line (`T<n>`), or `None` for any other
/// line. Only a leading `T` command selects a tool; a `T` parameter on e.g.
/// `M104 T0 S200` addresses a heater, not the active tool.
pub fn tool_index(line: &str) -> Result<Option<u8>, ValueError> {
    let Some(first) = lexer::live_tokens(line).next() else {
        return Ok(None);
    };
    if first.kind != TokenKind::Command {
        return Ok(None);
    }

    let mut chars = first.text.chars();
    if !chars.next().is_some_and(|c| c.eq_ignore_ascii_case(&'T')) {
        return Ok(None);
    }

    let raw = chars.as_str();
    match raw.parse::<u8>() {
        Ok(index) => Ok(Some(index)),
        Err(_) => Err(ValueError {
            letter: 'T',
            raw: raw.to_string(),
        }),
    }
}

/// Whether the line's command is a motion command (G0/G1/G2/G3).
pub fn is_motion_command(line: &str) -> bool {
    match lexer::live_tokens(line).next() {
        Some(token) if token.kind == TokenKind::Command => matches!(
            token.text.to_ascii_uppercase().as_str(),
            "G0" | "G1" | "G2" | "G3"
        ),
        _ => false,
    }
}

/// Whether the letter appears as a live parameter on the line, with or
/// without a value.
pub fn has_live_param(line: &str, letter: char) -> bool {
    lexer::live_tokens(line)
        .skip(1)
        .any(|t| {
            t.text
                .chars()
                .next()
                .is_some_and(|c| c.eq_ignore_ascii_case(&letter))
        })
}
