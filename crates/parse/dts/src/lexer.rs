//! Tokenizer for devicetree source text.
//!
//! Produces a stream of [`Token`]s from DTS text. Handles node and property
//! names (which may contain `@`, `,`, `.`, `+`, `-`, `?`, `#`), numeric
//! literals (decimal and hex, radix preserved as written), quoted strings,
//! `&label` references, and `//` / `/* */` comments.

use crate::DtsError;

/// A token with source location.
#[derive(Debug, Clone)]
pub struct Token {
    /// Token variant.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

/// Source location for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct Span {
    /// 1-based source line.
    pub line: usize,
    /// 1-based source column.
    pub col: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Token variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A node or property name (`serial@40011000`, `#address-cells`).
    Ident(String),
    /// A numeric literal, raw text preserved (`0x40`, `1024`).
    ///
    /// The value is parsed at the use site: inside `< >` it is a cell,
    /// inside `[ ]` it is hex byte pairs, after `/memreserve/` it is a u64.
    Number(String),
    /// Quoted string content (quotes stripped, escapes applied).
    Str(String),
    /// A `&label` reference.
    Ref(String),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `;`
    Semi,
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `/` (root node name or directive delimiter)
    Slash,
    /// End of input.
    Eof,
}

/// Characters legal inside a node or property name.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ',' | '.' | '+' | '?' | '#' | '@')
}

/// Tokenize DTS source text.
///
/// # Errors
///
/// Returns [`DtsError::Lex`] for unterminated strings or comments and for
/// characters outside the grammar.
pub fn tokenize(source: &str) -> Result<Vec<Token>, DtsError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    let mut line = 1usize;
    let mut line_start = 0usize;

    while let Some(&(pos, ch)) = chars.peek() {
        let col = pos - line_start + 1;
        let span = Span { line, col };

        match ch {
            '\n' => {
                chars.next();
                line += 1;
                line_start = pos + 1;
            }
            c if c.is_whitespace() => {
                chars.next();
            }

            // Comments share the '/' start with the root node name and
            // directive delimiters; disambiguate on the second character.
            '/' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '/')) => {
                        while let Some(&(_, c)) = chars.peek() {
                            if c == '\n' {
                                break;
                            }
                            chars.next();
                        }
                    }
                    Some(&(_, '*')) => {
                        chars.next();
                        let mut closed = false;
                        while let Some((p, c)) = chars.next() {
                            if c == '\n' {
                                line += 1;
                                line_start = p + 1;
                            } else if c == '*' {
                                if let Some(&(_, '/')) = chars.peek() {
                                    chars.next();
                                    closed = true;
                                    break;
                                }
                            }
                        }
                        if !closed {
                            return Err(DtsError::Lex {
                                line: span.line,
                                col: span.col,
                                msg: "unterminated block comment".to_string(),
                            });
                        }
                    }
                    _ => tokens.push(Token {
                        kind: TokenKind::Slash,
                        span,
                    }),
                }
            }

            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => {
                            if let Some((_, escaped)) = chars.next() {
                                match escaped {
                                    'n' => s.push('\n'),
                                    't' => s.push('\t'),
                                    '\\' => s.push('\\'),
                                    '"' => s.push('"'),
                                    _ => {
                                        s.push('\\');
                                        s.push(escaped);
                                    }
                                }
                            }
                        }
                        Some((p, c)) => {
                            if c == '\n' {
                                line += 1;
                                line_start = p + 1;
                            }
                            s.push(c);
                        }
                        None => {
                            return Err(DtsError::Lex {
                                line: span.line,
                                col: span.col,
                                msg: "unterminated string".to_string(),
                            });
                        }
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Str(s),
                    span,
                });
            }

            '&' => {
                chars.next();
                let mut label = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                        label.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if label.is_empty() {
                    return Err(DtsError::Lex {
                        line: span.line,
                        col: span.col,
                        msg: "'&' must be followed by a label name".to_string(),
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Ref(label),
                    span,
                });
            }

            '{' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::LBrace, span });
            }
            '}' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::RBrace, span });
            }
            ';' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Semi, span });
            }
            '=' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Eq, span });
            }
            '<' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Lt, span });
            }
            '>' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Gt, span });
            }
            '[' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::LBracket, span });
            }
            ']' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::RBracket, span });
            }
            ':' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Colon, span });
            }
            // A ',' inside a name ("linux,phandle") is consumed by the name
            // loop below; one at token start separates value groups.
            ',' => {
                chars.next();
                tokens.push(Token { kind: TokenKind::Comma, span });
            }

            // Numbers keep their raw text; cells, byte strings, and
            // memreserve arguments interpret it differently.
            '0'..='9' => {
                let start = pos;
                chars.next();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() {
                        chars.next();
                    } else {
                        break;
                    }
                }
                let end = chars.peek().map_or(source.len(), |&(p, _)| p);
                tokens.push(Token {
                    kind: TokenKind::Number(source[start..end].to_string()),
                    span,
                });
            }

            c if is_name_char(c) => {
                let start = pos;
                chars.next();
                while let Some(&(_, c)) = chars.peek() {
                    if is_name_char(c) {
                        chars.next();
                    } else {
                        break;
                    }
                }
                let end = chars.peek().map_or(source.len(), |&(p, _)| p);
                tokens.push(Token {
                    kind: TokenKind::Ident(source[start..end].to_string()),
                    span,
                });
            }

            _ => {
                return Err(DtsError::Lex {
                    line: span.line,
                    col: span.col,
                    msg: format!("unexpected character '{ch}'"),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { line, col: 1 },
    });

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_node_header() {
        let toks = kinds("uart0: serial@40011000 {");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("uart0".into()),
                TokenKind::Colon,
                TokenKind::Ident("serial@40011000".into()),
                TokenKind::LBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenize_cells_and_refs() {
        let toks = kinds("interrupts = <&gic 5 0x4>;");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("interrupts".into()),
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::Ref("gic".into()),
                TokenKind::Number("5".into()),
                TokenKind::Number("0x4".into()),
                TokenKind::Gt,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comma_splits_groups_but_not_names() {
        let toks = kinds("linux,phandle = <1>, <2>;");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("linux,phandle".into()),
                TokenKind::Eq,
                TokenKind::Lt,
                TokenKind::Number("1".into()),
                TokenKind::Gt,
                TokenKind::Comma,
                TokenKind::Lt,
                TokenKind::Number("2".into()),
                TokenKind::Gt,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenize_comments() {
        let toks = kinds("/* block */ reg; // trailing");
        assert_eq!(
            toks,
            vec![TokenKind::Ident("reg".into()), TokenKind::Semi, TokenKind::Eof]
        );
    }

    #[test]
    fn tokenize_root_and_directive() {
        let toks = kinds("/dts-v1/; / {");
        assert_eq!(
            toks,
            vec![
                TokenKind::Slash,
                TokenKind::Ident("dts-v1".into()),
                TokenKind::Slash,
                TokenKind::Semi,
                TokenKind::Slash,
                TokenKind::LBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize(r#"model = "oops"#).unwrap_err();
        assert!(matches!(err, DtsError::Lex { .. }));
    }
}
