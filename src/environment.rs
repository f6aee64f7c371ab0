use crate::types::{Symbol, Value, FALSE, NIL, TRUE};
use crate::{builtins, special_forms};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A mutable slot. Every scope which can see a name shares the same slot, so
/// `set!` through one scope is visible through all of them.
#[derive(Debug)]
pub struct Variable {
    value: RefCell<Value>,
}

impl Variable {
    pub fn new(value: Value) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value),
        })
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        self.value.replace(value);
    }
}

pub type Bindings = HashMap<Symbol, Rc<Variable>>;

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownSymbol(pub String);

impl fmt::Display for UnknownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undefined variable '{}'", self.0)
    }
}

/// Names visible at one point of evaluation: a frozen parent mapping plus
/// the names introduced locally.
pub struct Scope {
    local: RefCell<Bindings>,
    parent: Rc<Bindings>,
    flattened: RefCell<Option<Rc<Bindings>>>,
}

impl Scope {
    pub fn new(parent: Rc<Bindings>) -> Rc<Self> {
        Rc::new(Self {
            local: RefCell::new(Bindings::new()),
            parent,
            flattened: RefCell::new(None),
        })
    }

    /// A fresh child scope whose parent is a snapshot of everything visible here.
    pub fn spawn_from(scope: &Scope) -> Rc<Self> {
        Self::new(scope.flatten())
    }

    /// Binds `name` to a fresh variable, shadowing any binding of the same
    /// name here or in the parent.
    pub fn put<T>(&self, name: T, value: Value)
    where
        T: Into<Symbol>,
    {
        let name = name.into();
        log::trace!("bind {} = {}", name, value);
        self.local.borrow_mut().insert(name, Variable::new(value));
        self.flattened.replace(None);
    }

    pub fn lookup(&self, name: &str) -> Result<Rc<Variable>, UnknownSymbol> {
        if let Some(variable) = self.local.borrow().get(name) {
            return Ok(variable.clone());
        }
        self.parent
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownSymbol(name.to_string()))
    }

    pub fn fetch(&self, name: &str) -> Result<Value, UnknownSymbol> {
        self.lookup(name).map(|variable| variable.get())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.local.borrow().contains_key(name) || self.parent.contains_key(name)
    }

    /// The parent and local bindings merged, locals winning. The result is
    /// cached until the next `put`.
    pub fn flatten(&self) -> Rc<Bindings> {
        if let Some(cached) = &*self.flattened.borrow() {
            return cached.clone();
        }
        let local = self.local.borrow();
        let flattened = if local.is_empty() {
            self.parent.clone()
        } else {
            let mut merged = Bindings::clone(&self.parent);
            merged.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
            Rc::new(merged)
        };
        self.flattened.replace(Some(flattened.clone()));
        flattened
    }
}

impl fmt::Debug for Scope {
    // Values may hold closures over this very scope, so only names are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scope{{local: [{}], parent: {} names}}",
            self.local.borrow().keys().map(|name| name.to_string()).sorted().join(" "),
            self.parent.len()
        )
    }
}

/// Every builtin function and macro, plus the constant names.
pub fn builtin_bindings() -> Bindings {
    let mut bindings = Bindings::new();
    for (&name, &func) in builtins::CORE.iter() {
        bindings.insert(Symbol::new(name), Variable::new(Value::Primitive(func)));
    }
    for (&name, &form) in special_forms::SPECIAL_FORMS.iter() {
        bindings.insert(Symbol::new(name), Variable::new(Value::Macro(form)));
    }
    for (name, value) in [("NIL", NIL), ("nil", NIL), ("#t", TRUE), ("#f", FALSE)].iter() {
        bindings.insert(Symbol::new(name), Variable::new(value.clone()));
    }
    bindings
}

/// An empty scope whose parent holds the builtins.
pub fn global() -> Rc<Scope> {
    Scope::new(Rc::new(builtin_bindings()))
}
