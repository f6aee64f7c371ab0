use crate::lists::{ConsCell, Pair, Sequence, Shape};
use crate::strings::string_repr;
use crate::types::{Closure, Float, Value};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrintMode {
    /// Output that reads back as the same value.
    ReadableRepresentation,
    /// Strings at the top level are written out raw, as `print` does.
    Directly,
}

pub fn pr_str(value: &Value, mode: PrintMode) -> String {
    match (value, mode) {
        (Value::String(s), PrintMode::Directly) => s.to_string(),
        _ => value.to_string(),
    }
}

// Pending output. Nested values are queued here rather than formatted
// recursively, so arbitrarily deep structures print in constant stack.
enum Piece {
    Text(&'static str),
    Item(Value),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pieces(vec![Piece::Item(self.clone())], f)
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = Vec::new();
        start_closure(self, &mut pending, f)?;
        write_pieces(pending, f)
    }
}

fn write_pieces(mut pending: Vec<Piece>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    while let Some(piece) = pending.pop() {
        match piece {
            Piece::Text(text) => f.write_str(text)?,
            Piece::Item(value) => write_one(&value, &mut pending, f)?,
        }
    }
    Ok(())
}

fn write_one(
    value: &Value,
    pending: &mut Vec<Piece>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match value {
        Value::Nil => write!(f, "NIL"),
        Value::Bool(true) => write!(f, "#t"),
        Value::Bool(false) => write!(f, "#f"),
        Value::Integer(x) => write!(f, "{}", x),
        Value::Float(x) => write_float(*x, f),
        Value::Symbol(s) => write!(f, "{}", s),
        Value::String(s) => write!(f, "{}", string_repr(s)),
        Value::Cons(cell) => start_cell(cell, pending, f),
        Value::Quoted(inner) => {
            pending.push(Piece::Item(Value::clone(inner)));
            write!(f, "'")
        }
        Value::Primitive(func) => write!(f, "#<function {}>", func.name),
        Value::Macro(form) => write!(f, "#<macro {}>", form.name),
        Value::Closure(closure) => start_closure(closure, pending, f),
    }
}

// Plain positional digits with a decimal point, never an exponent, so the
// reader sees the same float again.
fn write_float(x: Float, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let digits = x.to_string();
    match x.is_finite() && !digits.contains('.') {
        true => write!(f, "{}.0", digits),
        false => write!(f, "{}", digits),
    }
}

fn start_cell(
    cell: &Rc<ConsCell>,
    pending: &mut Vec<Piece>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match cell.shape() {
        Shape::Pair => {
            pending.push(Piece::Text(")"));
            pending.push(Piece::Item(cell.rest()));
            pending.push(Piece::Text(" "));
            pending.push(Piece::Item(cell.first()));
            write!(f, "(cons ")
        }
        Shape::List => {
            queue_items(Value::Cons(cell.clone()).items().collect(), false, pending);
            write!(f, "(list ")
        }
        Shape::SExpression => {
            queue_items(Value::Cons(cell.clone()).items().collect(), false, pending);
            write!(f, "(")
        }
    }
}

fn start_closure(
    closure: &Closure,
    pending: &mut Vec<Piece>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    queue_items(closure.body.clone(), true, pending);
    write!(f, "(lambda ({})", closure.parameters)
}

/// Queues `items` separated by spaces and then a closing paren. With
/// `leading`, the first item is preceded by a space too.
fn queue_items(items: Vec<Value>, leading: bool, pending: &mut Vec<Piece>) {
    pending.push(Piece::Text(")"));
    for (i, item) in items.into_iter().enumerate().rev() {
        pending.push(Piece::Item(item));
        if leading || i > 0 {
            pending.push(Piece::Text(" "));
        }
    }
}
