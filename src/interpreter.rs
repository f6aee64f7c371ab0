use crate::environment::{self, Scope};
use crate::evaluator::{self, DEFAULT_MAX_DEPTH};
use crate::{reader, tokens, Value};
use std::fmt;
use std::rc::Rc;

pub type Result = std::result::Result<Value, Error>;

/// Longest expression text quoted in a depth error.
const MAX_REPORTED_LEN: usize = 80;

#[derive(Debug)]
pub enum Error {
    Read(reader::Error),
    Eval(evaluator::Error),
    DepthExceeded { expression: String, limit: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "syntax error: {}", e),
            Error::Eval(e) => write!(f, "{}", e),
            Error::DepthExceeded { expression, limit } => write!(
                f,
                "maximum recursion depth ({}) exceeded while evaluating {}",
                limit, expression
            ),
        }
    }
}

impl Error {
    /// True if more input could complete the program.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Read(reader::Error::NotClosed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Nested, non-tail evaluations allowed before giving up.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Owns a global scope which persists between calls.
pub struct Interpreter {
    globals: Rc<Scope>,
    config: Config,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        log::debug!("new interpreter with {:?}", config);
        Self {
            globals: environment::global(),
            config,
        }
    }

    pub fn globals(&self) -> &Rc<Scope> {
        &self.globals
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn evaluate(&self, expr: &Value) -> Result {
        evaluator::with_depth_limit(self.config.max_depth, || {
            evaluator::evaluate(expr, &self.globals)
        })
        .map_err(|e| match e {
            evaluator::Error::RecursionDepth(limit) => Error::DepthExceeded {
                expression: abbreviate(expr.to_string()),
                limit,
            },
            e => Error::Eval(e),
        })
    }

    /// Evaluates every top level form in `source`, returning the value of the
    /// last one (`NIL` if there are none). Forms before a syntax error still run.
    pub fn execute(&self, source: &str) -> Result {
        let mut last = Value::Nil;
        for form in reader::parse(tokens::tokenize(source)) {
            last = self.evaluate(&form.map_err(Error::Read)?)?;
        }
        Ok(last)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn abbreviate(text: String) -> String {
    match text.char_indices().nth(MAX_REPORTED_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

/// Checks that `source` parses without evaluating any of it.
pub fn check_syntax(source: &str) -> std::result::Result<(), reader::Error> {
    for form in reader::parse(tokens::tokenize(source)) {
        form?;
    }
    Ok(())
}
