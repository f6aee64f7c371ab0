use crate::environment::{Scope, UnknownSymbol};
use crate::lists::{Pair, Sequence, Shape};
use crate::types::{self, Closure, PrimitiveFn, PrimitiveMacro, TypeMismatch, Value};
use crate::{reader, special_forms};
use itertools::Itertools;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// How many nested (non-tail) evaluations are allowed unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 512;

pub type Result<T = Value> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    UnknownSymbol(UnknownSymbol),
    NotCallable(String),
    BadArgCount(types::BadArgCount),
    WrongType {
        name: String,
        mismatch: TypeMismatch,
    },
    TypeMismatch(TypeMismatch),
    DivideByZero(&'static str),
    IntegerOverflow(&'static str),
    MathDomain(&'static str),
    BadConversion {
        name: &'static str,
        value: String,
    },
    BadArgument {
        name: &'static str,
        reason: String,
    },
    Format(String),
    Define(special_forms::DefineError),
    Lambda(special_forms::LambdaError),
    Let(special_forms::LetError),
    Cond(special_forms::CondError),
    NotASymbol(&'static str, String),
    RecursionDepth(usize),
    Read(reader::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownSymbol(e) => write!(f, "{}", e),
            Error::NotCallable(s) => write!(f, "{} is not callable", s),
            Error::BadArgCount(e) => write!(f, "{}", e),
            Error::WrongType { name, mismatch } => write!(f, "{}: {}", name, mismatch),
            Error::TypeMismatch(e) => write!(f, "type mismatch: {}", e),
            Error::DivideByZero(name) => write!(f, "{}: division by zero", name),
            Error::IntegerOverflow(name) => write!(f, "{}: integer overflow", name),
            Error::MathDomain(name) => write!(f, "{}: math domain error", name),
            Error::BadConversion { name, value } => write!(f, "{}: cannot convert {}", name, value),
            Error::BadArgument { name, reason } => write!(f, "{}: {}", name, reason),
            Error::Format(reason) => write!(f, "format: {}", reason),
            Error::Define(e) => write!(f, "define: {}", e),
            Error::Lambda(e) => write!(f, "lambda: {}", e),
            Error::Let(e) => write!(f, "let: {}", e),
            Error::Cond(e) => write!(f, "cond: {}", e),
            Error::NotASymbol(name, s) => write!(f, "{}: {} is not a symbol", name, s),
            Error::RecursionDepth(limit) => write!(f, "maximum recursion depth ({}) exceeded", limit),
            Error::Read(e) => write!(f, "read error: {}", e),
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl From<TypeMismatch> for Error {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Error {
    // Type errors raised inside a builtin are reported against its name.
    fn within(self, name: &str) -> Self {
        match self {
            Error::TypeMismatch(mismatch) => Error::WrongType {
                name: name.to_string(),
                mismatch,
            },
            e => e,
        }
    }
}

/// What applying a callable produced. Closures and most special forms hand
/// their last expression back rather than evaluating it themselves, so that
/// the caller's loop can carry on without growing the stack.
#[derive(Debug)]
pub enum ApplyOutcome {
    Finished(Value),
    EvaluateFurther(Value, Rc<Scope>),
}

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
    static MAX_DEPTH: Cell<usize> = Cell::new(DEFAULT_MAX_DEPTH);
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<Self> {
        let limit = MAX_DEPTH.with(Cell::get);
        DEPTH.with(|depth| {
            if depth.get() >= limit {
                return Err(Error::RecursionDepth(limit));
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Runs `f` with the nesting ceiling set to `limit`, restoring the previous
/// ceiling afterwards.
pub fn with_depth_limit<T>(limit: usize, f: impl FnOnce() -> T) -> T {
    struct Restore(usize);
    impl Drop for Restore {
        fn drop(&mut self) {
            MAX_DEPTH.with(|max| max.set(self.0));
        }
    }
    let _restore = Restore(MAX_DEPTH.with(|max| max.replace(limit)));
    f()
}

pub fn evaluate(expr: &Value, env: &Rc<Scope>) -> Result {
    let _depth = DepthGuard::enter()?;
    let mut expr = expr.clone();
    let mut env = env.clone();
    loop {
        log::trace!("evaluate {}", expr);
        let cell = match &expr {
            Value::Symbol(name) => return env.fetch(name).map_err(Error::UnknownSymbol),
            Value::Quoted(inner) => return Ok(Value::clone(inner)),
            Value::Cons(cell) if cell.shape() == Shape::SExpression => cell.clone(),
            _ => return Ok(expr.clone()),
        };
        let operator = evaluate(&cell.first(), &env)?;
        let operands = cell.rest();
        let outcome = match &operator {
            Value::Macro(form) => call_macro(form, &operands, &env)?,
            _ => {
                let args = evaluate_operands(&operands, &env)?;
                apply(&operator, &args)?
            }
        };
        match outcome {
            ApplyOutcome::Finished(value) => return Ok(value),
            ApplyOutcome::EvaluateFurther(next_expr, next_env) => {
                expr = next_expr;
                env = next_env;
            }
        }
    }
}

/// Evaluates each operand left to right.
pub fn evaluate_operands(operands: &Value, env: &Rc<Scope>) -> Result<Vec<Value>> {
    let mut evaluated = Vec::new();
    for operand in operands.items() {
        evaluated.push(evaluate(&operand, env)?);
    }
    Ok(evaluated)
}

/// One step of applying a function to evaluated arguments.
pub(crate) fn apply(callable: &Value, args: &[Value]) -> Result<ApplyOutcome> {
    match callable {
        Value::Primitive(func) => call_primitive(func, args).map(ApplyOutcome::Finished),
        Value::Closure(func) => {
            let env = make_closure_env(func, args)?;
            evaluate_body(&func.body, env)
        }
        other => Err(Error::NotCallable(other.to_string())),
    }
}

/// Evaluates all but the last expression for effect and hands the last
/// back. An empty body is `NIL`.
pub(crate) fn evaluate_body(body: &[Value], env: Rc<Scope>) -> Result<ApplyOutcome> {
    match body.split_last() {
        None => Ok(ApplyOutcome::Finished(Value::Nil)),
        Some((last, init)) => {
            for expr in init {
                evaluate(expr, &env)?;
            }
            Ok(ApplyOutcome::EvaluateFurther(last.clone(), env))
        }
    }
}

pub(crate) fn pretty_print_args(args: &[Value]) -> String {
    match args.len() {
        0 => "no args".into(),
        1 => args[0].to_string(),
        _ => format!("\n\t{}", args.iter().join("\n\t")),
    }
}

pub fn call_primitive(func: &PrimitiveFn, args: &[Value]) -> Result {
    func.arity
        .validate_for(args.len(), func.name)
        .map_err(Error::BadArgCount)?;
    log::trace!("Call {} with {}", func.name, pretty_print_args(args));
    let result = (func.fn_ptr)(args)
        .map(Value::into_data)
        .map_err(|e| e.within(func.name));
    match &result {
        Ok(val) => log::trace!("Call to {} resulted in {}", func.name, val),
        Err(e) => log::trace!("Call to {} failed: {}", func.name, e),
    }
    result
}

fn call_macro(form: &PrimitiveMacro, operands: &Value, env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let args = operands.to_vec()?;
    form.arity
        .validate_for(args.len(), form.name)
        .map_err(Error::BadArgCount)?;
    log::trace!("Expand {} with {}", form.name, pretty_print_args(&args));
    (form.fn_ptr)(&args, env).map_err(|e| e.within(form.name))
}

fn make_closure_env(func: &Closure, args: &[Value]) -> Result<Rc<Scope>> {
    log::trace!("Call {} with {}", func, pretty_print_args(args));
    func.parameters
        .arity()
        .validate_for(args.len(), &format!("(lambda ({}) ...)", func.parameters))
        .map_err(Error::BadArgCount)?;
    let env = Scope::spawn_from(&func.scope);

    let (positional, rest) = args.split_at(func.parameters.positional.len());
    for (key, value) in func.parameters.positional.iter().zip(positional) {
        env.put(key.clone(), value.clone());
    }
    if let Some(rest_key) = &func.parameters.rest {
        env.put(rest_key.clone(), Value::list(rest.iter().cloned()));
    }
    Ok(env)
}
