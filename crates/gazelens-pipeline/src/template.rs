//! Placeholder templates for generated code.
//!
//! A template is plain text with `%name%` placeholders, where `name` is
//! one or more ASCII letters, digits or underscores. Templates are
//! parsed once into literal runs and placeholders when a descriptor is
//! built; rendering only concatenates. Nothing is ever evaluated.
//!
//! A `%` that does not open a well-formed placeholder is literal text,
//! so `100%` or `a % b` survive untouched.

use std::fmt::Write as _;

use crate::params::ParamBindings;

/// One parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text copied verbatim.
    Literal(String),
    /// A `%name%` placeholder.
    Placeholder(String),
}

/// A parsed code template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    source: String,
    tokens: Vec<Token>,
}

const fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl Template {
    /// Parse `source` into tokens.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut tokens = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'%' {
                let name_start = i + 1;
                let mut end = name_start;
                while end < bytes.len() && is_name_byte(bytes[end]) {
                    end += 1;
                }
                if end > name_start && end < bytes.len() && bytes[end] == b'%' {
                    if literal_start < i {
                        tokens.push(Token::Literal(source[literal_start..i].to_string()));
                    }
                    tokens.push(Token::Placeholder(source[name_start..end].to_string()));
                    i = end + 1;
                    literal_start = i;
                    continue;
                }
            }
            i += 1;
        }
        if literal_start < bytes.len() {
            tokens.push(Token::Literal(source[literal_start..].to_string()));
        }

        Self {
            source: source.to_string(),
            tokens,
        }
    }

    /// The unparsed template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Placeholder names in order of first appearance, deduplicated.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for token in &self.tokens {
            if let Token::Placeholder(name) = token
                && !names.contains(&name.as_str())
            {
                names.push(name);
            }
        }
        names
    }

    /// Substitute bound values into the template.
    ///
    /// Numbers render as literals and strings verbatim, with no quoting
    /// or escaping. An unbound placeholder is left as `%name%`.
    #[must_use]
    pub fn render(&self, bindings: &ParamBindings) -> String {
        let mut out = String::with_capacity(self.source.len());
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Placeholder(name) => match bindings.get(name) {
                    Some(value) => {
                        let _ = write!(out, "{value}");
                    }
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                },
            }
        }
        out
    }
}
