use crate::strings;
use crate::tokens::{tokenize, TokenizerError};
use crate::types::{Float, Int, Value};
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Tokenizer(TokenizerError),
    NotClosed,
    TooManyClosingParens,
    EmptyQuote,
    TooDeep(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tokenizer(e) => write!(f, "{}", e),
            Error::NotClosed => write!(f, "s-expression not closed"),
            Error::TooManyClosingParens => write!(f, "too many closing parens"),
            Error::EmptyQuote => write!(f, "nothing to quote"),
            Error::TooDeep(limit) => write!(f, "s-expressions nested more than {} deep", limit),
        }
    }
}

impl From<TokenizerError> for Error {
    fn from(e: TokenizerError) -> Self {
        Error::Tokenizer(e)
    }
}

pub type Result<T = Value> = std::result::Result<T, Error>;

/// How deeply s-expressions may nest in source text.
pub const MAX_NESTING: usize = 1000;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)$").unwrap();
}

/// Lazily turns a stream of tokens into top level expressions, one per item.
/// Stops after the first error.
pub struct Parser<I> {
    tokens: I,
    depth: usize,
    failed: bool,
}

pub fn parse<I, T>(tokens: I) -> Parser<I::IntoIter>
where
    I: IntoIterator<Item = std::result::Result<T, TokenizerError>>,
    T: AsRef<str>,
{
    Parser {
        tokens: tokens.into_iter(),
        depth: 0,
        failed: false,
    }
}

/// Reads the first expression in `input`, or `NIL` if there is none.
pub fn read_str(input: &str) -> Result {
    parse(tokenize(input)).next().unwrap_or(Ok(Value::Nil))
}

impl<I, T> Iterator for Parser<I>
where
    I: Iterator<Item = std::result::Result<T, TokenizerError>>,
    T: AsRef<str>,
{
    type Item = Result;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.tokens.next()? {
            Ok(token) => self.read_form(token.as_ref()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            log::debug!("parse failed: {}", e);
            self.failed = true;
        }
        Some(result)
    }
}

impl<I, T> Parser<I>
where
    I: Iterator<Item = std::result::Result<T, TokenizerError>>,
    T: AsRef<str>,
{
    fn read_form(&mut self, token: &str) -> Result {
        match token {
            "(" => self.read_sexpr(),
            ")" => Err(Error::TooManyClosingParens),
            _ => match token.strip_prefix('\'') {
                Some("") => Err(Error::EmptyQuote),
                Some(quoted) => self.read_form(quoted).map(Value::quote),
                None => Ok(read_atom(token)),
            },
        }
    }

    fn read_sexpr(&mut self) -> Result {
        if self.depth == MAX_NESTING {
            return Err(Error::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let elements = self.read_elements();
        self.depth -= 1;
        Ok(Value::sexpr(elements?))
    }

    fn read_elements(&mut self) -> Result<Vec<Value>> {
        let mut elements = Vec::new();
        loop {
            match self.tokens.next() {
                None => return Err(Error::NotClosed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(token)) => match token.as_ref() {
                    ")" => return Ok(elements),
                    other => elements.push(self.read_form(other)?),
                },
            }
        }
    }
}

fn read_atom(token: &str) -> Value {
    if token.starts_with('"') {
        return Value::string(strings::parse_strlit(token));
    }
    if NUMBER_RE.is_match(token) {
        return read_number(token);
    }
    Value::symbol(token)
}

// Integers which overflow fall back to floats.
fn read_number(token: &str) -> Value {
    if !token.contains('.') {
        if let Ok(x) = token.parse::<Int>() {
            return Value::Integer(x);
        }
    }
    match token.parse::<Float>() {
        Ok(x) => Value::Float(x),
        Err(_) => Value::symbol(token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(input: &str) -> Result<Vec<Value>> {
        parse(tokenize(input)).collect()
    }

    fn printed(input: &str) -> Vec<String> {
        read_all(input)
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn atoms() {
        assert_eq!(read_str("42").unwrap(), Value::Integer(42));
        assert_eq!(read_str("-7").unwrap(), Value::Integer(-7));
        assert_eq!(read_str("1.").unwrap(), Value::Float(1.0));
        assert_eq!(read_str(".25").unwrap(), Value::Float(0.25));
        assert_eq!(read_str("foo").unwrap(), Value::symbol("foo"));
        assert_eq!(read_str(r#""\x41""#).unwrap(), Value::string("A"));
        assert_eq!(
            read_str("99999999999999999999").unwrap(),
            Value::Float(1e20)
        );
    }

    #[test]
    fn number_followed_by_symbol() {
        assert_eq!(
            read_all("8-dogcows").unwrap(),
            vec![Value::Integer(8), Value::symbol("-dogcows")]
        );
    }

    #[test]
    fn nested_expressions() {
        assert_eq!(
            printed("(define (f x) (+ x 1)) (f 2)"),
            vec!["(define (f x) (+ x 1))", "(f 2)"]
        );
    }

    #[test]
    fn empty_parens_are_nil() {
        assert_eq!(read_str("()").unwrap(), Value::Nil);
        assert_eq!(printed("(a ())"), vec!["(a NIL)"]);
    }

    #[test]
    fn quotes() {
        assert_eq!(printed("'x '(1 2) '()"), vec!["'x", "'(1 2)", "'NIL"]);
    }

    #[test]
    fn empty_input_reads_as_nil() {
        assert_eq!(read_str("   ; nothing here"), Ok(Value::Nil));
        assert!(read_all("").unwrap().is_empty());
    }

    #[test]
    fn unclosed_expression() {
        assert_eq!(read_all("(print 1"), Err(Error::NotClosed));
        assert_eq!(read_all("(a (b)"), Err(Error::NotClosed));
    }

    #[test]
    fn nesting_is_limited() {
        let within = format!("{}{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(read_str(&within).is_ok());
        let beyond = "(".repeat(200_000);
        assert_eq!(read_str(&beyond), Err(Error::TooDeep(MAX_NESTING)));
        let mut forms = parse(tokenize("(a) ((b)) c"));
        assert!(forms.next().unwrap().is_ok());
        assert!(forms.next().unwrap().is_ok());
        assert_eq!(forms.next(), Some(Ok(Value::symbol("c"))));
    }

    #[test]
    fn stray_closing_paren() {
        let mut forms = parse(tokenize("(a) ) (b)"));
        assert!(forms.next().unwrap().is_ok());
        assert_eq!(forms.next(), Some(Err(Error::TooManyClosingParens)));
        assert_eq!(forms.next(), None);
    }

    #[test]
    fn tokenizer_errors_propagate() {
        assert!(matches!(read_all("(\"abc"), Err(Error::Tokenizer(_))));
    }

    #[test]
    fn forms_are_produced_before_later_errors() {
        let mut forms = parse(tokenize("(a) (b"));
        assert_eq!(forms.next().unwrap().unwrap().to_string(), "(a)");
        assert_eq!(forms.next(), Some(Err(Error::NotClosed)));
    }

    #[test]
    fn accepts_any_token_source() {
        let tokens = vec!["(", "+", "1", "2", ")"]
            .into_iter()
            .map(|t| Ok::<_, TokenizerError>(t.to_string()));
        assert_eq!(
            parse(tokens).next().unwrap().unwrap().to_string(),
            "(+ 1 2)"
        );
    }
}
