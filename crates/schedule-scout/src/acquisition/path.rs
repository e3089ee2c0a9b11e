//! Restricted property-access paths into the page's global scope.
//!
//! A path is an identifier followed by `.field`, `[0]`, `['key']` or
//! `["key"]` segments. It is parsed once, before the browser starts, into
//! a list of segments; the page is then only ever asked to walk those
//! segments. Nothing the user typed is executed.

use crate::error::ConfigError;
use serde_json::Value;
use std::fmt;

/// One step of a [`PathExpr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(u64),
}

/// A validated property-access path such as `window.__DATA__["schedule"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    root: String,
    segments: Vec<Segment>,
}

impl PathExpr {
    /// Parse a path expression, rejecting anything outside the grammar.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let mut parser = Parser::new(input.trim());
        let root = parser.identifier()?;
        let mut segments = Vec::new();

        while let Some(c) = parser.peek() {
            match c {
                '.' => {
                    parser.bump();
                    segments.push(Segment::Field(parser.identifier()?));
                }
                '[' => {
                    parser.bump();
                    segments.push(parser.bracket()?);
                }
                _ => return Err(parser.error("expected '.' or '['")),
            }
        }

        Ok(Self { root, segments })
    }

    /// The global identifier the path starts from.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk the path through a decoded value standing in for the global scope.
    pub fn resolve<'a>(&self, globals: &'a Value) -> Option<&'a Value> {
        let mut current = globals.get(&self.root)?;
        for segment in &self.segments {
            current = match (segment, current) {
                (Segment::Field(name), Value::Object(map)) => map.get(name)?,
                (Segment::Index(i), Value::Array(items)) => items.get(usize::try_from(*i).ok()?)?,
                (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string())?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Render the in-page accessor for this path.
    ///
    /// The root identifier is emitted bare (it matched the identifier
    /// grammar, so it can only name a binding); every further segment is a
    /// JSON literal. The accessor evaluates to the value's JSON text, or
    /// `null` when a step is missing or the value cannot be serialized.
    pub fn to_page_accessor(&self) -> String {
        let keys: Vec<Value> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Field(name) => Value::String(name.clone()),
                Segment::Index(i) => Value::from(*i),
            })
            .collect();
        let keys = Value::Array(keys).to_string();

        format!(
            "(() => {{ \
               let value; \
               try {{ value = {root}; }} catch (_) {{ return null; }} \
               for (const key of {keys}) {{ \
                 if (value === null || value === undefined) return null; \
                 value = value[key]; \
               }} \
               if (value === undefined) return null; \
               try {{ return JSON.stringify(value); }} catch (_) {{ return null; }} \
             }})()",
            root = self.root,
        )
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            match segment {
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, reason: &'static str) -> ConfigError {
        ConfigError::InvalidPathExpression {
            position: self.pos,
            reason,
        }
    }

    fn identifier(&mut self) -> Result<String, ConfigError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                self.bump();
            }
            _ => return Err(self.error("expected identifier")),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                self.bump();
            } else {
                break;
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Parse the inside of `[...]`; the opening bracket is already consumed.
    fn bracket(&mut self) -> Result<Segment, ConfigError> {
        let segment = match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                let index = self.input[start..self.pos]
                    .parse::<u64>()
                    .map_err(|_| self.error("index out of range"))?;
                Segment::Index(index)
            }
            Some(q @ ('\'' | '"')) => {
                self.bump();
                let start = self.pos;
                loop {
                    match self.peek() {
                        Some(c) if c == q => break,
                        Some('\\') | Some('\n') | Some('\r') | None => {
                            return Err(self.error("unterminated or escaped key"))
                        }
                        Some(_) => {
                            self.bump();
                        }
                    }
                }
                let key = self.input[start..self.pos].to_string();
                self.bump();
                Segment::Field(key)
            }
            _ => return Err(self.error("expected index or quoted key")),
        };

        if self.bump() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(segment)
    }
}
