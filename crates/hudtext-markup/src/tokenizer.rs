//! Tokenizer for `<tag>`-style rich text.
//!
//! Recognized forms:
//!
//! - `<name>` and `<name=param>`: opening tags
//! - `</name>`: closing tags
//!
//! Tag names start with an ASCII letter, followed by letters, digits,
//! underscores or hyphens. Names are matched case-insensitively later, so
//! the tokenizer accepts either case. Bracketed content that is not a valid
//! tag becomes [`Token::Invalid`] and is emitted literally by the compiler.

/// Token types produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Plain text content.
    Text(&'a str),
    /// Opening tag: `<name>` or `<name=param>`.
    Open {
        name: &'a str,
        param: Option<&'a str>,
        raw: &'a str,
    },
    /// Closing tag: `</name>`.
    Close { name: &'a str, raw: &'a str },
    /// Bracketed text that is not a valid tag.
    Invalid(&'a str),
}

impl<'a> Token<'a> {
    /// The exact input text this token was produced from.
    pub(crate) fn raw(&self) -> &'a str {
        match *self {
            Token::Text(raw)
            | Token::Invalid(raw)
            | Token::Open { raw, .. }
            | Token::Close { raw, .. } => raw,
        }
    }
}

pub(crate) struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn is_valid_tag_name(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    fn classify(full: &'a str) -> Token<'a> {
        let content = &full[1..full.len() - 1];

        if let Some(name) = content.strip_prefix('/') {
            return if Self::is_valid_tag_name(name) {
                Token::Close { name, raw: full }
            } else {
                Token::Invalid(full)
            };
        }

        let (name, param) = match content.split_once('=') {
            Some((name, param)) => (name, Some(param)),
            None => (content, None),
        };

        if Self::is_valid_tag_name(name) {
            Token::Open {
                name,
                param,
                raw: full,
            }
        } else {
            Token::Invalid(full)
        }
    }

    fn advance(&mut self, len: usize) -> &'a str {
        let slice = &self.input[self.pos..self.pos + len];
        self.pos += len;
        slice
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }

        let remaining = &self.input[self.pos..];

        let Some(open) = remaining.find('<') else {
            return Some(Token::Text(self.advance(remaining.len())));
        };
        if open > 0 {
            return Some(Token::Text(self.advance(open)));
        }

        // At a '<'. A second '<' before the next '>' means this one is stray.
        let after = &remaining[1..];
        match (after.find('>'), after.find('<')) {
            (Some(close), Some(next_open)) if next_open < close => {
                Some(Token::Text(self.advance(next_open + 1)))
            }
            (Some(close), _) => {
                let full = self.advance(close + 2);
                Some(Self::classify(full))
            }
            (None, _) => Some(Token::Text(self.advance(remaining.len()))),
        }
    }
}
