// String literals understand the usual C-like escapes. Anything after a
// backslash which isn't a known escape is kept as written, backslash included.

use bimap::BiMap;
use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

lazy_static! {
    static ref ESCAPES: BiMap<char, char> = {
        let mut m = BiMap::new();
        m.insert('a', '\x07');
        m.insert('b', '\x08');
        m.insert('e', '\x1b');
        m.insert('f', '\x0c');
        m.insert('n', '\n');
        m.insert('r', '\r');
        m.insert('t', '\t');
        m.insert('v', '\x0b');
        m.insert('"', '"');
        m.insert('\\', '\\');
        m
    };
}

struct StringBuilder<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> StringBuilder<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
        }
    }

    // `\xHH`, committed only if both hex digits are present.
    fn hex_escape(&mut self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        let high = lookahead.next()?.to_digit(16)?;
        let low = lookahead.next()?.to_digit(16)?;
        self.chars = lookahead;
        Some(char::from((high * 16 + low) as u8))
    }

    // `\0` followed by at most two octal digits.
    fn octal_escape(&mut self) -> char {
        self.chars.next();
        let mut value = 0;
        for _ in 0..2 {
            match self.chars.peek().and_then(|c| c.to_digit(8)) {
                Some(digit) => {
                    value = value * 8 + digit;
                    self.chars.next();
                }
                None => break,
            }
        }
        char::from(value as u8)
    }
}

impl Iterator for StringBuilder<'_> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.chars.next()?;
        if c != '\\' {
            return Some(c);
        }
        let decoded = match self.chars.peek().copied() {
            Some('x') => self.hex_escape(),
            Some('0') => Some(self.octal_escape()),
            Some(escape) => ESCAPES.get_by_left(&escape).copied().map(|value| {
                self.chars.next();
                value
            }),
            None => None,
        };
        // An unrecognised escape leaves the backslash in place; whatever
        // followed it comes out on the next call.
        Some(decoded.unwrap_or('\\'))
    }
}

/// Decodes a string literal token, surrounding quotes included.
pub fn parse_strlit(token: &str) -> String {
    let body = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token);
    StringBuilder::new(body).collect()
}

/// The inverse of `parse_strlit`: a quoted literal which reads back as `src`.
pub(crate) fn string_repr(src: &str) -> String {
    let mut output = String::with_capacity(src.len() + 2);
    output.push('"');
    for c in src.chars() {
        match ESCAPES.get_by_right(&c) {
            Some(&escape) => {
                output.push('\\');
                output.push(escape);
            }
            None if c.is_control() && (c as u32) <= 0xff => {
                // Writing to a String can't fail.
                let _ = write!(output, "\\x{:02x}", c as u32);
            }
            None => output.push(c),
        }
    }
    output.push('"');
    output
}
