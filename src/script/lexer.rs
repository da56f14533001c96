use crate::error::RuleError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Ident(String),
    Function,
    Return,
    Let,
    Const,
    Var,
    If,
    Else,
    While,
    For,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Question,
    Bang,
    Assign,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Lte,
    Gt,
    Gte,
    AndAnd,
    OrOr,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, RuleError> {
    let mut chars = input.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some((idx, ch)) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        match ch {
            '0'..='9' => {
                let start = idx;
                let mut end = idx;
                let mut seen_dot = false;
                while let Some((i, c)) = chars.peek().copied() {
                    if c.is_ascii_digit() {
                        end = i;
                        chars.next();
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        end = i;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let raw = &input[start..=end];
                let n: f64 = raw.parse().map_err(|e| {
                    RuleError::Script(format!("invalid number literal '{raw}' at {start}: {e}"))
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(n),
                    pos: start,
                });
            }
            '"' | '\'' => {
                let quote = ch;
                chars.next();
                let start = idx;
                let mut out = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        match chars.next() {
                            Some((_, '"')) => out.push('"'),
                            Some((_, '\'')) => out.push('\''),
                            Some((_, '\\')) => out.push('\\'),
                            Some((_, 'n')) => out.push('\n'),
                            Some((_, 't')) => out.push('\t'),
                            Some((_, 'r')) => out.push('\r'),
                            Some((_, other)) => out.push(other),
                            None => {
                                return Err(RuleError::Script(
                                    "unterminated escape sequence".to_string(),
                                ))
                            }
                        }
                    } else {
                        out.push(c);
                    }
                }

                if !closed {
                    return Err(RuleError::Script(format!(
                        "unterminated string literal starting at {start}"
                    )));
                }

                tokens.push(Token {
                    kind: TokenKind::String(out),
                    pos: start,
                });
            }
            '/' => {
                chars.next();
                match chars.peek().copied() {
                    Some((_, '/')) => {
                        for (_, c) in chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    }
                    Some((_, '*')) => {
                        chars.next();
                        let mut closed = false;
                        while let Some((_, c)) = chars.next() {
                            if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                                chars.next();
                                closed = true;
                                break;
                            }
                        }
                        if !closed {
                            return Err(RuleError::Script(format!(
                                "unterminated block comment starting at {idx}"
                            )));
                        }
                    }
                    _ => tokens.push(Token {
                        kind: TokenKind::Slash,
                        pos: idx,
                    }),
                }
            }
            '+' => push_single(&mut chars, &mut tokens, TokenKind::Plus, idx),
            '-' => push_single(&mut chars, &mut tokens, TokenKind::Minus, idx),
            '*' => push_single(&mut chars, &mut tokens, TokenKind::Star, idx),
            '%' => push_single(&mut chars, &mut tokens, TokenKind::Percent, idx),
            '(' => push_single(&mut chars, &mut tokens, TokenKind::LParen, idx),
            ')' => push_single(&mut chars, &mut tokens, TokenKind::RParen, idx),
            '{' => push_single(&mut chars, &mut tokens, TokenKind::LBrace, idx),
            '}' => push_single(&mut chars, &mut tokens, TokenKind::RBrace, idx),
            '[' => push_single(&mut chars, &mut tokens, TokenKind::LBracket, idx),
            ']' => push_single(&mut chars, &mut tokens, TokenKind::RBracket, idx),
            ',' => push_single(&mut chars, &mut tokens, TokenKind::Comma, idx),
            '.' => push_single(&mut chars, &mut tokens, TokenKind::Dot, idx),
            ';' => push_single(&mut chars, &mut tokens, TokenKind::Semicolon, idx),
            ':' => push_single(&mut chars, &mut tokens, TokenKind::Colon, idx),
            '?' => push_single(&mut chars, &mut tokens, TokenKind::Question, idx),
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                        tokens.push(Token {
                            kind: TokenKind::NotEqEq,
                            pos: idx,
                        });
                    } else {
                        tokens.push(Token {
                            kind: TokenKind::NotEq,
                            pos: idx,
                        });
                    }
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Bang,
                        pos: idx,
                    });
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                        tokens.push(Token {
                            kind: TokenKind::EqEqEq,
                            pos: idx,
                        });
                    } else {
                        tokens.push(Token {
                            kind: TokenKind::EqEq,
                            pos: idx,
                        });
                    }
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Assign,
                        pos: idx,
                    });
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token {
                        kind: TokenKind::Lte,
                        pos: idx,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Lt,
                        pos: idx,
                    });
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token {
                        kind: TokenKind::Gte,
                        pos: idx,
                    });
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Gt,
                        pos: idx,
                    });
                }
            }
            '&' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '&'))) {
                    chars.next();
                    tokens.push(Token {
                        kind: TokenKind::AndAnd,
                        pos: idx,
                    });
                } else {
                    return Err(RuleError::Script(format!(
                        "unexpected '&' at {idx}; expected '&&'"
                    )));
                }
            }
            '|' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '|'))) {
                    chars.next();
                    tokens.push(Token {
                        kind: TokenKind::OrOr,
                        pos: idx,
                    });
                } else {
                    return Err(RuleError::Script(format!(
                        "unexpected '|' at {idx}; expected '||'"
                    )));
                }
            }
            c if is_ident_start(c) => {
                let start = idx;
                let mut end = idx;
                while let Some((i, cc)) = chars.peek().copied() {
                    if is_ident_continue(cc) {
                        end = i;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let raw = &input[start..=end];
                let kind = match raw {
                    "true" => TokenKind::Bool(true),
                    "false" => TokenKind::Bool(false),
                    "null" | "undefined" => TokenKind::Null,
                    "function" => TokenKind::Function,
                    "return" => TokenKind::Return,
                    "let" => TokenKind::Let,
                    "const" => TokenKind::Const,
                    "var" => TokenKind::Var,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    "for" => TokenKind::For,
                    _ => TokenKind::Ident(raw.to_string()),
                };
                tokens.push(Token { kind, pos: start });
            }
            _ => {
                return Err(RuleError::Script(format!(
                    "unexpected character '{}' at {}",
                    ch, idx
                )))
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: input.len(),
    });
    Ok(tokens)
}

fn push_single(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    tokens: &mut Vec<Token>,
    kind: TokenKind,
    pos: usize,
) {
    chars.next();
    tokens.push(Token { kind, pos });
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
