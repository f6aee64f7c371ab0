use crate::types::{TypeMismatch, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// How a chain of cells reads back: as a bare pair, as data, or as code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `rest` may be anything. Printed `(cons a b)`.
    Pair,
    /// `rest` is a list or `NIL`. Printed `(list a b c)`.
    List,
    /// A list the evaluator treats as an application. Printed `(a b c)`.
    SExpression,
}

impl Shape {
    pub fn is_list(self) -> bool {
        self != Shape::Pair
    }
}

pub trait Pair {
    fn first(&self) -> Value;
    fn rest(&self) -> Value;
}

pub struct ConsCell {
    first: RefCell<Value>,
    rest: RefCell<Value>,
    shape: Shape,
}

impl ConsCell {
    /// List shaped cells refuse a `rest` which is not itself a list.
    pub fn new(first: Value, rest: Value, shape: Shape) -> Result<Self, TypeMismatch> {
        if shape.is_list() && !rest.is_list() {
            return Err(TypeMismatch::NotAList);
        }
        Ok(Self::new_unchecked(first, rest, shape))
    }

    fn new_unchecked(first: Value, rest: Value, shape: Shape) -> Self {
        Self {
            first: RefCell::new(first),
            rest: RefCell::new(rest),
            shape,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_list(&self) -> bool {
        self.shape.is_list()
    }

    pub fn set_first(&self, value: Value) {
        self.first.replace(value);
    }

    pub fn set_rest(&self, value: Value) -> Result<(), TypeMismatch> {
        if self.is_list() && !value.is_list() {
            return Err(TypeMismatch::NotAList);
        }
        self.rest.replace(value);
        Ok(())
    }
}

impl Pair for ConsCell {
    fn first(&self) -> Value {
        self.first.borrow().clone()
    }

    fn rest(&self) -> Value {
        self.rest.borrow().clone()
    }
}

impl fmt::Debug for ConsCell {
    // The rest is left out: printing a long list through Debug would recurse once per cell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsCell{{shape: {:?}, first: {:?}, ..}}", self.shape, self.first.borrow())
    }
}

impl Drop for ConsCell {
    // Nested cells are unlinked onto a worklist so dropping a long or deeply
    // nested structure doesn't recurse once per cell. Shared cells are left
    // to their other owners.
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach(self, &mut pending);
        while let Some(cell) = pending.pop() {
            if let Ok(mut cell) = Rc::try_unwrap(cell) {
                detach(&mut cell, &mut pending);
            }
        }
    }
}

fn detach(cell: &mut ConsCell, pending: &mut Vec<Rc<ConsCell>>) {
    if let Value::Cons(inner) = std::mem::replace(cell.first.get_mut(), Value::Nil) {
        pending.push(inner);
    }
    if let Value::Cons(inner) = std::mem::replace(cell.rest.get_mut(), Value::Nil) {
        pending.push(inner);
    }
}

/// Makes a cell whose shape follows `rest`: consing onto a list gives a
/// list, onto an s-expression gives an s-expression, anything else a pair.
pub fn cons(first: Value, rest: Value) -> Value {
    let shape = match &rest {
        Value::Nil => Shape::List,
        Value::Cons(cell) => match cell.shape {
            Shape::Pair => Shape::Pair,
            shape => shape,
        },
        _ => Shape::Pair,
    };
    Value::Cons(Rc::new(ConsCell::new_unchecked(first, rest, shape)))
}

/// Builds a chain of `shape` cells holding `items`, or `NIL` when there are none.
pub fn from_iter<I>(items: I, shape: Shape) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let items: Vec<Value> = items.into_iter().collect();
    items.into_iter().rev().fold(Value::Nil, |rest, first| {
        Value::Cons(Rc::new(ConsCell::new_unchecked(first, rest, shape)))
    })
}

pub struct Cells {
    next: Value,
}

impl Iterator for Cells {
    type Item = Rc<ConsCell>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.next, Value::Nil) {
            Value::Cons(cell) => {
                self.next = cell.rest();
                Some(cell)
            }
            _ => None,
        }
    }
}

pub struct Items(Cells);

impl Iterator for Items {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|cell| cell.first())
    }
}

/// Read access to a chain of cells. Anything which isn't a cell is an empty
/// sequence; a bare pair yields its `first` and then stops.
pub trait Sequence {
    fn cells(&self) -> Cells;

    fn items(&self) -> Items {
        Items(self.cells())
    }

    fn length(&self) -> usize {
        self.cells().count()
    }

    fn nth(&self, index: usize) -> Option<Value> {
        self.items().nth(index)
    }

    fn contains(&self, needle: &Value) -> bool {
        self.items().any(|item| item == *needle)
    }

    fn reversed(&self) -> std::iter::Rev<std::vec::IntoIter<Value>> {
        self.items().collect::<Vec<_>>().into_iter().rev()
    }
}

impl Sequence for Value {
    fn cells(&self) -> Cells {
        Cells { next: self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fibs() -> Vec<Value> {
        [1, 1, 2, 3, 5, 8].iter().map(|&n| Value::Integer(n)).collect()
    }

    #[test]
    fn list_from_nothing_is_nil() {
        assert!(from_iter(Vec::new(), Shape::List).is_nil());
        assert!(from_iter(Vec::new(), Shape::SExpression).is_nil());
    }

    #[test]
    fn length_indexing_and_membership_agree_with_source() {
        let source = fibs();
        let list = Value::list(source.clone());
        assert_eq!(list.length(), source.len());
        for (index, item) in source.iter().enumerate() {
            assert_eq!(list.nth(index).as_ref(), Some(item));
        }
        assert_eq!(list.nth(source.len()), None);
        assert!(list.contains(&Value::Integer(3)));
        assert!(list.contains(&Value::Integer(8)));
        assert!(!list.contains(&Value::Integer(9)));
        assert!(!list.contains(&Value::Nil));
    }

    #[test]
    fn reversed_is_exact_reverse_of_forward() {
        let list = Value::list(fibs());
        let mut forward: Vec<Value> = list.items().collect();
        forward.reverse();
        assert_eq!(list.reversed().collect::<Vec<_>>(), forward);
    }

    #[test]
    fn cells_walk_every_tail() {
        let list = Value::list(fibs());
        let tails: Vec<String> = list.cells().map(|cell| cell.rest().to_string()).collect();
        assert_eq!(
            tails,
            vec![
                "(list 1 2 3 5 8)",
                "(list 2 3 5 8)",
                "(list 3 5 8)",
                "(list 5 8)",
                "(list 8)",
                "NIL"
            ]
        );
    }

    #[test]
    fn list_cells_require_a_list_tail() {
        let err = ConsCell::new(Value::Integer(1), Value::Integer(2), Shape::List);
        assert!(matches!(err, Err(TypeMismatch::NotAList)));
        let cell = ConsCell::new(Value::Integer(1), Value::Nil, Shape::List).unwrap();
        assert!(cell.set_rest(Value::Integer(3)).is_err());
        assert!(cell.set_rest(Value::list(vec![Value::Integer(2)])).is_ok());
        let pair = ConsCell::new(Value::Integer(1), Value::Nil, Shape::Pair).unwrap();
        assert!(pair.set_rest(Value::Integer(3)).is_ok());
    }

    #[test]
    fn cons_shape_follows_the_tail() {
        assert_eq!(cons(Value::Integer(5), Value::Nil).to_string(), "(list 5)");
        assert_eq!(cons(Value::Integer(5), Value::Integer(4)).to_string(), "(cons 5 4)");
        let code = Value::sexpr(vec![Value::Integer(4)]);
        assert_eq!(cons(Value::Integer(5), code).to_string(), "(5 4)");
        let data = Value::list(vec![Value::Integer(4)]);
        assert_eq!(cons(Value::Integer(5), data).to_string(), "(list 5 4)");
    }

    #[test]
    fn cells_are_mutable_in_place_and_tails_are_shared() {
        let tail = Value::list(vec![Value::Integer(2), Value::Integer(3)]);
        let a = cons(Value::Integer(1), tail.clone());
        let b = cons(Value::Integer(9), tail.clone());
        tail.as_cell().unwrap().set_first(Value::Integer(7));
        assert_eq!(a.to_string(), "(list 1 7 3)");
        assert_eq!(b.to_string(), "(list 9 7 3)");
    }

    #[test]
    fn dropping_a_long_list_does_not_recurse() {
        let list = Value::list((0..200_000).map(Value::Integer));
        assert_eq!(list.length(), 200_000);
        drop(list);
    }

    #[test]
    fn dropping_deeply_nested_lists_does_not_recurse() {
        let mut nested = Value::Nil;
        for i in 0..200_000 {
            nested = Value::list(vec![Value::Integer(i), nested]);
        }
        let shared = nested.nth(1).unwrap();
        drop(nested);
        assert_eq!(shared.car().unwrap(), Value::Integer(199_998));
        drop(shared);
    }
}
