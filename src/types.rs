use crate::environment::Scope;
use crate::evaluator::{self, ApplyOutcome};
use crate::lists::{self, ConsCell, Pair, Sequence, Shape};
use derive_more::Deref;
use itertools::Itertools;
use std::borrow::Borrow;
use std::fmt::{self, Formatter};
use std::iter::FromIterator;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;

pub type Int = i64;
pub type Float = f64;

#[derive(Deref, Debug, PartialEq, Eq, Hash, Clone)]
#[deref(forward)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(name.into())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &*self.0)
    }
}

/// The decoded contents of a string literal.
#[derive(Deref, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
#[deref(forward)]
pub struct LispString(Rc<str>);

impl LispString {
    pub fn new<S: Into<Rc<str>>>(text: S) -> Self {
        Self(text.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

#[derive(Debug)]
pub struct BadArgCount {
    name: String,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} expected {} arguments, but received {}",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub(crate) fn validate_for(&self, n: usize, name: &str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name: name.to_string(),
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

/// A builtin which receives its arguments already evaluated.
pub struct PrimitiveFn {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: fn(&[Value]) -> evaluator::Result,
}

impl fmt::Debug for PrimitiveFn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveFn #<{}>", self.name)
    }
}

/// A builtin which receives its operands unevaluated, together with the
/// calling scope. It may hand back an expression for the caller to keep
/// evaluating in place of the macro call.
pub struct PrimitiveMacro {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: fn(&[Value], &Rc<Scope>) -> evaluator::Result<ApplyOutcome>,
}

impl fmt::Debug for PrimitiveMacro {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveMacro #<{}>", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClosureParameters {
    pub positional: Vec<Symbol>,
    pub rest: Option<Symbol>,
}

impl fmt::Display for ClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.positional.iter().join(" "))?;
        if let Some(rest) = &self.rest {
            if !self.positional.is_empty() {
                write!(f, " ")?;
            }
            write!(f, ". {}", rest)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub enum BadClosureParameters {
    TooManyDots(usize),
    DotNotPenultimate,
}

impl fmt::Display for BadClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyDots(n) => write!(f, "expected at most one '.', found {}", n),
            Self::DotNotPenultimate => write!(f, "'.' must be followed by exactly one name"),
        }
    }
}

impl ClosureParameters {
    pub fn new(mut symbols: Vec<Symbol>) -> Result<Self, BadClosureParameters> {
        let is_dot = |s: &Symbol| &**s == ".";
        let dot_count = symbols.iter().filter(|s| is_dot(*s)).count();

        match dot_count {
            0 => Ok(ClosureParameters {
                positional: symbols,
                rest: None,
            }),
            1 => {
                let len = symbols.len();
                if len < 2 || !is_dot(&symbols[len - 2]) {
                    return Err(BadClosureParameters::DotNotPenultimate);
                }
                let rest = symbols.pop();
                symbols.pop();
                Ok(ClosureParameters {
                    positional: symbols,
                    rest,
                })
            }
            _ => Err(BadClosureParameters::TooManyDots(dot_count)),
        }
    }

    pub fn arity(&self) -> Arity {
        match self.rest {
            None => Arity::exactly(self.positional.len()),
            Some(_) => Arity::at_least(self.positional.len()),
        }
    }
}

pub struct Closure {
    pub parameters: ClosureParameters,
    pub body: Vec<Value>,
    pub scope: Rc<Scope>,
}

impl fmt::Debug for Closure {
    // Not derived because we want to skip the scope: the scope may well contain this Closure!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure{{parameters: {:?}, body: {:?}}}",
            self.parameters, self.body
        )
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(Int),
    Float(Float),
    Symbol(Symbol),
    String(LispString),
    Cons(Rc<ConsCell>),
    Quoted(Rc<Value>),
    Primitive(&'static PrimitiveFn),
    Macro(&'static PrimitiveMacro),
    Closure(Rc<Closure>),
}

pub const NIL: Value = Value::Nil;
pub const TRUE: Value = Value::Bool(true);
pub const FALSE: Value = Value::Bool(false);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeMismatch {
    NotANumber,
    NotAList,
    NotAPair,
    NotAString,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let expected = match self {
            Self::NotANumber => "a number",
            Self::NotAList => "a list",
            Self::NotAPair => "a cons cell",
            Self::NotAString => "a string",
        };
        write!(f, "expected {}", expected)
    }
}

impl Value {
    pub fn boolean(truth: bool) -> Self {
        if truth {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn symbol(name: &str) -> Self {
        Self::Symbol(Symbol::new(name))
    }

    pub fn string<S: Into<Rc<str>>>(text: S) -> Self {
        Self::String(LispString::new(text))
    }

    /// Quoting something already quoted is a no-op.
    pub fn quote(value: Value) -> Self {
        match value {
            Value::Quoted(_) => value,
            _ => Value::Quoted(Rc::new(value)),
        }
    }

    pub fn cons(first: Value, rest: Value) -> Self {
        lists::cons(first, rest)
    }

    /// A list cell, refusing a `rest` which is not a list.
    pub fn try_list(first: Value, rest: Value) -> Result<Self, TypeMismatch> {
        ConsCell::new(first, rest, Shape::List).map(|cell| Value::Cons(Rc::new(cell)))
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        lists::from_iter(items, Shape::List)
    }

    pub fn sexpr<I: IntoIterator<Item = Value>>(items: I) -> Self {
        lists::from_iter(items, Shape::SExpression)
    }

    /// Everything is true except `NIL` and `#f`.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_list(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Cons(cell) => cell.is_list(),
            _ => false,
        }
    }

    pub fn is_sexpr(&self) -> bool {
        matches!(self, Value::Cons(cell) if cell.shape() == Shape::SExpression)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::Primitive(_) | Value::Closure(_))
    }

    pub(crate) fn as_str(&self) -> Result<&str, TypeMismatch> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(TypeMismatch::NotAString),
        }
    }

    pub(crate) fn as_cell(&self) -> Result<&Rc<ConsCell>, TypeMismatch> {
        match self {
            Value::Cons(cell) => Ok(cell),
            _ => Err(TypeMismatch::NotAPair),
        }
    }

    /// `car` of `NIL` is `NIL`.
    pub fn car(&self) -> Result<Value, TypeMismatch> {
        match self {
            Value::Nil => Ok(NIL),
            _ => self.as_cell().map(|cell| cell.first()),
        }
    }

    /// `cdr` of `NIL` is `NIL`.
    pub fn cdr(&self) -> Result<Value, TypeMismatch> {
        match self {
            Value::Nil => Ok(NIL),
            _ => self.as_cell().map(|cell| cell.rest()),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Value>, TypeMismatch> {
        match self.is_list() {
            true => Ok(self.items().collect()),
            false => Err(TypeMismatch::NotAList),
        }
    }

    /// Reinterprets code as data. Only the outermost list is rebuilt.
    pub fn into_data(self) -> Self {
        match self.is_sexpr() {
            true => Value::list(self.items()),
            false => self,
        }
    }

    /// Reinterprets data as code. Only the outermost list is rebuilt.
    pub fn into_code(self) -> Self {
        let is_data = matches!(&self, Value::Cons(cell) if cell.shape() == Shape::List);
        match is_data {
            true => Value::sexpr(self.items()),
            false => self,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(x), Bool(y)) => x == y,
            (Integer(x), Integer(y)) => x == y,
            (Float(x), Float(y)) => x == y,
            (Integer(x), Float(y)) | (Float(y), Integer(x)) => *x as f64 == *y,
            (Symbol(x), Symbol(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Quoted(x), Quoted(y)) => x == y,
            (Cons(x), Cons(y)) => equal_cells(x, y),
            (Primitive(x), Primitive(y)) => std::ptr::eq(*x, *y),
            (Macro(x), Macro(y)) => std::ptr::eq(*x, *y),
            (Closure(x), Closure(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

// Lists of either shape compare element-wise; a list and its s-expression
// twin are equal.
fn equal_cells(x: &Rc<ConsCell>, y: &Rc<ConsCell>) -> bool {
    if Rc::ptr_eq(x, y) {
        return true;
    }
    if x.is_list() && y.is_list() {
        let (xs, ys) = (Value::Cons(x.clone()), Value::Cons(y.clone()));
        return xs.length() == ys.length() && xs.items().zip(ys.items()).all(|(a, b)| a == b);
    }
    x.first() == y.first() && x.rest() == y.rest()
}

impl From<bool> for Value {
    fn from(truth: bool) -> Self {
        Value::boolean(truth)
    }
}

impl From<Int> for Value {
    fn from(x: Int) -> Self {
        Value::Integer(x)
    }
}

impl From<Float> for Value {
    fn from(x: Float) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::string(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::string(text)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<Option<Value>> for Value {
    fn from(value: Option<Value>) -> Self {
        value.unwrap_or(NIL)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        NIL
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::list(items)
    }
}
