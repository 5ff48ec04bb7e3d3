//! G-code lexer.
//!
//! Fast, allocation-light tokenization of a single G-code line. Tokens borrow
//! from the input line; everything after a semicolon is one comment token.

/// Token types in G-code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// Command like "G1", "M104", "T0"
    Command,
    /// Parameter like "X10", "S255"
    Parameter,
    /// Comment (semicolon or parenthetical)
    Comment,
}

/// A token borrowing its text from the line it was lexed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Tokenize a line of G-code into tokens.
///
/// Leading padding and the column-alignment spaces some passes emit in front
/// of inline comments are plain whitespace and are skipped here, so aligned
/// output lexes identically to unaligned output.
pub fn tokenize_line(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some((start_idx, ch)) = chars.next() {
        match ch {
            // Skip whitespace
            ' ' | '\t' | '\r' | '\n' => continue,

            // Semicolon comment: consume rest of line
            ';' => {
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: &line[start_idx..],
                });
                break;
            }

            // Parenthetical comment
            '(' => {
                let mut end_idx = start_idx + 1;
                let mut found_close = false;

                for (idx, ch) in chars.by_ref() {
                    if ch == ')' {
                        end_idx = idx + 1;
                        found_close = true;
                        break;
                    }
                    end_idx = idx + 1;
                }

                if !found_close {
                    end_idx = line.len();
                }

                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: &line[start_idx..end_idx],
                });
            }

            // Letter starts a command or a parameter
            c if c.is_ascii_alphabetic() => {
                let mut end_idx = start_idx + 1;

                // Consume digits, dots, minus, plus
                while let Some(&(idx, next_ch)) = chars.peek() {
                    if next_ch.is_ascii_alphanumeric()
                        || next_ch == '.'
                        || next_ch == '-'
                        || next_ch == '+'
                    {
                        end_idx = idx + 1;
                        chars.next();
                    } else {
                        break;
                    }
                }

                let text = &line[start_idx..end_idx];
                let kind = if is_command(text) {
                    TokenKind::Command
                } else {
                    TokenKind::Parameter
                };

                tokens.push(Token { kind, text });
            }

            // Skip other characters (malformed input)
            _ => continue,
        }
    }

    tokens
}

/// Determine if a token is a command.
///
/// G/M/T codes are commands, everything else is a parameter. T is a command
/// here because tool selection is emitted as a standalone `T<n>` line by the
/// slicer.
fn is_command(text: &str) -> bool {
    if let Some(first_char) = text.chars().next() {
        matches!(first_char.to_ascii_uppercase(), 'G' | 'M' | 'T')
    } else {
        false
    }
}

/// The tokens of a line up to (not including) its trailing comment.
///
/// This is the view every state-reading scan wants: a `Z` inside `; lift Z`
/// must never count as a live parameter.
pub fn live_tokens(line: &str) -> impl Iterator<Item = Token<'_>> {
    tokenize_line(line)
        .into_iter()
        .take_while(|t| t.kind != TokenKind::Comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple_command() {
        let tokens = tokenize_line("G1 X10 Y20");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Command);
        assert_eq!(tokens[0].text, "G1");
        assert_eq!(tokens[1].kind, TokenKind::Parameter);
        assert_eq!(tokens[1].text, "X10");
        assert_eq!(tokens[2].kind, TokenKind::Parameter);
        assert_eq!(tokens[2].text, "Y20");
    }

    #[test]
    fn test_tokenize_with_semicolon_comment() {
        let tokens = tokenize_line("G1 X10 ; move to X10");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, "; move to X10");
    }

    #[test]
    fn test_tokenize_paren_comment() {
        let tokens = tokenize_line("G1 (rapid move) X10");

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "(rapid move)");
    }

    #[test]
    fn test_tokenize_comment_only() {
        let tokens = tokenize_line(";LAYER:12");

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].text, ";LAYER:12");
    }

    #[test]
    fn test_tokenize_empty_line() {
        let tokens = tokenize_line("   ");
        assert_eq!(tokens.len(), 0);
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("G1"));
        assert!(is_command("M104"));
        assert!(is_command("T0"));
        assert!(!is_command("X10"));
        assert!(!is_command("S255"));
    }

    #[test]
    fn test_float_parameters() {
        let tokens = tokenize_line("G1 X10.5 Y-2.3 Z+1.0");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].text, "X10.5");
        assert_eq!(tokens[2].text, "Y-2.3");
        assert_eq!(tokens[3].text, "Z+1.0");
    }

    #[test]
    fn test_live_tokens_stop_at_comment() {
        let live: Vec<_> = live_tokens("G0 X5 ; Z99 is not live").collect();

        assert_eq!(live.len(), 2);
        assert!(live.iter().all(|t| t.kind != TokenKind::Comment));
    }

    #[test]
    fn test_aligned_comment_padding_is_ignored() {
        let padded = "G0 F300 Z0.8                  ; travel hop";
        let tokens = tokenize_line(padded);

        assert_eq!(tokens[0].text, "G0");
        assert_eq!(tokens[1].text, "F300");
        assert_eq!(tokens[2].text, "Z0.8");
        assert_eq!(tokens[3].kind, TokenKind::Comment);
    }
}
