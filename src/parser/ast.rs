//! Structured view of a single G-code line.
//!
//! Minimal data types recovered on demand from the text buffer. The passes
//! deliberately do not build a whole-file AST; a line is parsed when a scan
//! needs to look at it and the result is thrown away.

use crate::parser::lexer::{Token, TokenKind};

/// A parsed line of G-code
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// A command with parameters and an optional trailing comment
    Command(Command),
    /// A comment-only line
    Comment(Comment),
    /// An empty or whitespace-only line
    Empty,
}

/// A command like "G1" or "T0"
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command name (e.g., "G1", "M104", "T0")
    pub name: String,
    /// Parameters in first-seen order
    pub parameters: Vec<Parameter>,
    /// Optional trailing comment
    pub comment: Option<Comment>,
}

/// A command parameter like "X10" or "S255"
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter letter (e.g., 'X', 'Y', 'S')
    pub letter: char,
    /// Parameter value as text; numeric interpretation happens in the
    /// accessor so unparsable values stay visible
    pub value: String,
}

/// A comment (semicolon or parenthetical)
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Comment text (without the delimiters)
    pub text: String,
}

/// Convert tokens into a parsed line.
///
/// The first command token names the line; everything before the trailing
/// comment contributes parameters in order of appearance.
pub fn tokens_to_parsed_line(tokens: &[Token<'_>]) -> ParsedLine {
    if tokens.is_empty() {
        return ParsedLine::Empty;
    }

    let command_token = tokens.iter().find(|t| t.kind == TokenKind::Command);

    if let Some(cmd_token) = command_token {
        let parameters: Vec<Parameter> = tokens
            .iter()
            .take_while(|t| t.kind != TokenKind::Comment)
            .filter(|t| t.kind == TokenKind::Parameter)
            .filter_map(|t| parse_parameter_token(t.text))
            .collect();

        let comment = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Comment)
            .map(|t| Comment {
                text: extract_comment_text(t.text),
            });

        ParsedLine::Command(Command {
            name: cmd_token.text.to_string(),
            parameters,
            comment,
        })
    } else if let Some(comment_token) = tokens.iter().find(|t| t.kind == TokenKind::Comment) {
        ParsedLine::Comment(Comment {
            text: extract_comment_text(comment_token.text),
        })
    } else {
        ParsedLine::Empty
    }
}

/// Parse a parameter token like "X10.5" into a Parameter
fn parse_parameter_token(text: &str) -> Option<Parameter> {
    let mut chars = text.chars();
    let letter = chars.next()?;

    if !letter.is_ascii_alphabetic() {
        return None;
    }

    Some(Parameter {
        letter: letter.to_ascii_uppercase(),
        value: chars.collect(),
    })
}

/// Extract comment text, removing delimiters
fn extract_comment_text(text: &str) -> String {
    if let Some(stripped) = text.strip_prefix(';') {
        stripped.to_string()
    } else if text.starts_with('(') && text.ends_with(')') {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize_line;

    #[test]
    fn test_parse_parameter_token() {
        let param = parse_parameter_token("X10.5").unwrap();
        assert_eq!(param.letter, 'X');
        assert_eq!(param.value, "10.5");
    }

    #[test]
    fn test_parameter_letter_uppercased() {
        let param = parse_parameter_token("x3").unwrap();
        assert_eq!(param.letter, 'X');
    }

    #[test]
    fn test_extract_semicolon_comment() {
        let text = extract_comment_text("; this is a comment");
        assert_eq!(text, " this is a comment");
    }

    #[test]
    fn test_extract_paren_comment() {
        let text = extract_comment_text("(this is a comment)");
        assert_eq!(text, "this is a comment");
    }

    #[test]
    fn test_tokens_to_command() {
        let tokens = tokenize_line("G1 X10 Y20");
        let result = tokens_to_parsed_line(&tokens);

        if let ParsedLine::Command(cmd) = result {
            assert_eq!(cmd.name, "G1");
            assert_eq!(cmd.parameters.len(), 2);
            assert_eq!(cmd.parameters[0].letter, 'X');
            assert_eq!(cmd.parameters[0].value, "10");
        } else {
            panic!("Expected command");
        }
    }

    #[test]
    fn test_commented_parameters_are_not_live() {
        let tokens = tokenize_line("G1 X10 ; Y20 Z5");
        let result = tokens_to_parsed_line(&tokens);

        if let ParsedLine::Command(cmd) = result {
            assert_eq!(cmd.parameters.len(), 1);
            assert_eq!(cmd.parameters[0].letter, 'X');
            assert!(cmd.comment.is_some());
        } else {
            panic!("Expected command");
        }
    }
}
