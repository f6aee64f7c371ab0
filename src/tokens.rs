use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenizerError {
    Malformed(String),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::Malformed(near) => write!(f, "malformed tokens in input near {:?}", near),
        }
    }
}

lazy_static! {
    static ref SKIP_RE: Regex = Regex::new(r"^(?:\s+|;[^\n]*)+").unwrap();
    static ref TOKEN_RE: Regex = Regex::new(
        r#"(?x)                               # ignore whitespace in this pattern & allow comments
            ^(?:
                '?                            # a quote is glued onto what follows it
                (?:
                    \(
                    |"(?:                     # string literal, escapes kept verbatim:
                        (?s:\\.)              #    escapes
                        |[^\\"]               #    anything which isn't a backslash or a quote
                      )*"
                    |[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)
                    |[^\s()'";]+              # symbol
                )
                |\)
            )
        "#
    )
    .unwrap();
}

/// Lazily splits source text into tokens. Whitespace and `;` comments are
/// skipped, as is a leading `#!` line. After the first error nothing more
/// is produced.
pub struct Tokens<'a> {
    remaining: &'a str,
    failed: bool,
}

pub fn tokenize(input: &str) -> Tokens<'_> {
    Tokens {
        remaining: strip_shebang(input),
        failed: false,
    }
}

fn strip_shebang(input: &str) -> &str {
    if !input.starts_with("#!") {
        return input;
    }
    match input.find('\n') {
        Some(end) => &input[end + 1..],
        None => "",
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<&'a str, TokenizerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let mut remaining = self.remaining;
        if let Some(skipped) = SKIP_RE.find(remaining) {
            remaining = &remaining[skipped.end()..];
        }
        if remaining.is_empty() {
            self.remaining = remaining;
            return None;
        }
        match TOKEN_RE.find(remaining) {
            Some(token) => {
                self.remaining = &remaining[token.end()..];
                Some(Ok(&remaining[..token.end()]))
            }
            None => {
                self.failed = true;
                let near = remaining.chars().take(20).collect();
                Some(Err(TokenizerError::Malformed(near)))
            }
        }
    }
}
