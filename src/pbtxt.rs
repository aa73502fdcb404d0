//! Protobuf text format reader
//!
//! Reads the subset of the protobuf text format used by TensorFlow Object
//! Detection label maps and pipeline configs: nested messages (`{}` or `<>`),
//! scalar fields, quoted strings with either quote style, `[a, b]` lists and
//! `#` comments. Field order is preserved and values are kept as text; callers
//! decide how to interpret them. [`quote`] writes string literals the reader
//! accepts.

use crate::error::{TpodError, TpodResult};

/// A parsed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar value (number, enum identifier or unquoted string contents)
    Scalar(String),
    /// Nested message
    Message(Message),
}

impl Value {
    /// Scalar text, if this is a scalar
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Message(_) => None,
        }
    }

    /// Nested message, if this is a message
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            Self::Scalar(_) => None,
        }
    }
}

/// A named field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

/// An ordered list of fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub fields: Vec<Field>,
}

impl Message {
    /// All values for a field name, in order
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| &f.value)
    }

    /// First value for a field name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// First scalar value for a field name
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_scalar)
    }

    /// Follow a path of nested message names and read the final scalar
    ///
    /// `msg.path(&["model", "faster_rcnn", "num_classes"])`
    pub fn path(&self, path: &[&str]) -> Option<&str> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for name in parents {
            current = current.get(name)?.as_message()?;
        }
        current.scalar(last)
    }
}

/// Format text as a double-quoted string literal that [`parse`] reads back
/// unchanged
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Colon,
    Open,
    Close,
    ListOpen,
    ListClose,
    Separator,
}

fn tokenize(input: &str) -> TpodResult<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ':' => {
                chars.next();
                tokens.push((Token::Colon, line));
            }
            '{' | '<' => {
                chars.next();
                tokens.push((Token::Open, line));
            }
            '}' | '>' => {
                chars.next();
                tokens.push((Token::Close, line));
            }
            '[' => {
                chars.next();
                tokens.push((Token::ListOpen, line));
            }
            ']' => {
                chars.next();
                tokens.push((Token::ListClose, line));
            }
            ',' | ';' => {
                chars.next();
                tokens.push((Token::Separator, line));
            }
            '\'' | '"' => {
                let quote = c;
                let start_line = line;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        None | Some('\n') => {
                            return Err(TpodError::PbtxtParse {
                                line: start_line,
                                reason: "unterminated string".to_string(),
                            })
                        }
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some('r') => s.push('\r'),
                            Some(other) => s.push(other),
                            None => {
                                return Err(TpodError::PbtxtParse {
                                    line: start_line,
                                    reason: "unterminated string".to_string(),
                                })
                            }
                        },
                        Some(c) => s.push(c),
                    }
                }
                tokens.push((Token::Str(s), start_line));
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push((Token::Word(word), line));
            }
            other => {
                return Err(TpodError::PbtxtParse {
                    line,
                    reason: format!("unexpected character '{}'", other),
                })
            }
        }
    }

    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | '/')
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, l)| *l)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> TpodError {
        TpodError::PbtxtParse {
            line: self.line(),
            reason: reason.into(),
        }
    }

    fn message(&mut self, nested: bool) -> TpodResult<Message> {
        let mut message = Message::default();

        loop {
            match self.peek() {
                None if nested => return Err(self.error("missing closing brace")),
                None => return Ok(message),
                Some(Token::Close) if nested => {
                    self.pos += 1;
                    return Ok(message);
                }
                Some(Token::Separator) => {
                    self.pos += 1;
                }
                Some(Token::Word(_)) => self.field(&mut message)?,
                Some(other) => {
                    let reason = format!("expected field name, found {:?}", other);
                    return Err(self.error(reason));
                }
            }
        }
    }

    fn field(&mut self, message: &mut Message) -> TpodResult<()> {
        let Some(Token::Word(name)) = self.next() else {
            return Err(self.error("expected field name"));
        };

        let has_colon = self.peek() == Some(&Token::Colon);
        if has_colon {
            self.pos += 1;
        }

        match self.peek() {
            Some(Token::Open) => {
                self.pos += 1;
                let value = Value::Message(self.message(true)?);
                message.fields.push(Field { name, value });
            }
            Some(Token::ListOpen) if has_colon => {
                self.pos += 1;
                loop {
                    match self.peek() {
                        Some(Token::ListClose) => {
                            self.pos += 1;
                            break;
                        }
                        Some(Token::Separator) => self.pos += 1,
                        Some(Token::Open) => {
                            self.pos += 1;
                            let value = Value::Message(self.message(true)?);
                            message.fields.push(Field {
                                name: name.clone(),
                                value,
                            });
                        }
                        Some(_) => {
                            let value = Value::Scalar(self.scalar()?);
                            message.fields.push(Field {
                                name: name.clone(),
                                value,
                            });
                        }
                        None => return Err(self.error("unterminated list")),
                    }
                }
            }
            _ if has_colon => {
                let value = Value::Scalar(self.scalar()?);
                message.fields.push(Field { name, value });
            }
            _ => return Err(self.error(format!("expected ':' or '{{' after {}", name))),
        }

        Ok(())
    }

    fn scalar(&mut self) -> TpodResult<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            Some(Token::Str(mut s)) => {
                // Adjacent string literals concatenate
                while let Some(Token::Str(more)) = self.peek() {
                    s.push_str(more);
                    self.pos += 1;
                }
                Ok(s)
            }
            _ => {
                self.pos -= 1;
                Err(self.error("expected scalar value"))
            }
        }
    }
}

/// Parse a text format document into its top-level message
pub fn parse(input: &str) -> TpodResult<Message> {
    let tokens = tokenize(input)?;
    Parser { tokens, pos: 0 }.message(false)
}
