use crate::environment::Scope;
use crate::evaluator::{evaluate, evaluate_body, ApplyOutcome, Error, Result};
use crate::types::{
    Arity, BadClosureParameters, Closure, ClosureParameters, PrimitiveMacro, Symbol, Value,
};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ApplyOutcome::{EvaluateFurther, Finished};

#[derive(Debug)]
pub enum DefineError {
    WrongArgCount(usize),
    NameNotASymbol(String),
}

impl fmt::Display for DefineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineError::WrongArgCount(n) => {
                write!(f, "expected a name and one value, but received {} arguments", n)
            }
            DefineError::NameNotASymbol(s) => write!(f, "cannot define {}", s),
        }
    }
}

/// `(define name expr)` binds the value of `expr`; `(define (name params...) body...)`
/// binds a closure. Both bind in the current scope and yield `NIL`.
pub fn apply_define(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    match &args[0] {
        Value::Symbol(name) => {
            if args.len() != 2 {
                return Err(Error::Define(DefineError::WrongArgCount(args.len())));
            }
            let value = evaluate(&args[1], env)?;
            log::debug!("define {} as {}", name, value);
            env.put(name.clone(), value);
        }
        signature if signature.is_sexpr() => {
            let name = signature.car()?;
            let name = match &name {
                Value::Symbol(name) => name,
                other => return Err(Error::Define(DefineError::NameNotASymbol(other.to_string()))),
            };
            let closure = make_closure(&signature.cdr()?, &args[1..], env)?;
            log::debug!("define {} as {}", name, closure);
            env.put(name.clone(), closure);
        }
        other => return Err(Error::Define(DefineError::NameNotASymbol(other.to_string()))),
    }
    Ok(Finished(Value::Nil))
}

#[derive(Debug)]
pub enum LambdaError {
    ParametersNotAList(String),
    ParameterNotASymbol(String),
    BadRest(BadClosureParameters),
}

impl fmt::Display for LambdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LambdaError::ParametersNotAList(s) => write!(f, "parameters {} are not a list", s),
            LambdaError::ParameterNotASymbol(s) => write!(f, "parameter {} is not a symbol", s),
            LambdaError::BadRest(e) => write!(f, "{}", e),
        }
    }
}

fn make_closure(parameters: &Value, body: &[Value], env: &Rc<Scope>) -> Result {
    let parameters = parameters
        .to_vec()
        .map_err(|_| Error::Lambda(LambdaError::ParametersNotAList(parameters.to_string())))?;
    let symbols = parameters
        .iter()
        .map(|p| match p {
            Value::Symbol(s) => Ok(s.clone()),
            other => Err(Error::Lambda(LambdaError::ParameterNotASymbol(other.to_string()))),
        })
        .collect::<Result<Vec<Symbol>>>()?;
    let parameters =
        ClosureParameters::new(symbols).map_err(|e| Error::Lambda(LambdaError::BadRest(e)))?;
    let closure = Closure {
        parameters,
        body: body.to_vec(),
        scope: env.clone(),
    };
    Ok(Value::Closure(Rc::new(closure)))
}

pub fn apply_lambda(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let closure = make_closure(&args[0], &args[1..], env)?;
    log::debug!("created {}", closure);
    Ok(Finished(closure))
}

#[derive(Debug)]
pub enum LetError {
    BindingsNotAList(String),
    BadBinding(String),
}

impl fmt::Display for LetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetError::BindingsNotAList(s) => write!(f, "bindings {} are not a list", s),
            LetError::BadBinding(s) => write!(f, "binding {} is not of the form (name expr)", s),
        }
    }
}

/// Values are evaluated in the outer scope, so bindings can't see each other.
pub fn apply_let(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let bindings = args[0]
        .to_vec()
        .map_err(|_| Error::Let(LetError::BindingsNotAList(args[0].to_string())))?;
    let mut evaluated = Vec::with_capacity(bindings.len());
    for binding in &bindings {
        let bad_binding = || Error::Let(LetError::BadBinding(binding.to_string()));
        let pair = binding.to_vec().map_err(|_| bad_binding())?;
        match pair.as_slice() {
            [Value::Symbol(name), expr] => evaluated.push((name.clone(), evaluate(expr, env)?)),
            _ => return Err(bad_binding()),
        }
    }
    let inner = Scope::spawn_from(env);
    for (name, value) in evaluated {
        inner.put(name, value);
    }
    evaluate_body(&args[1..], inner)
}

pub fn apply_if(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let next = match evaluate(&args[0], env)?.truthy() {
        true => args[1].clone(),
        false => args.get(2).cloned().unwrap_or(Value::Nil),
    };
    Ok(EvaluateFurther(next, env.clone()))
}

#[derive(Debug)]
pub enum CondError {
    ClauseNotAList(String),
    EmptyClause,
}

impl fmt::Display for CondError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondError::ClauseNotAList(s) => write!(f, "clause {} is not a list", s),
            CondError::EmptyClause => write!(f, "empty clause"),
        }
    }
}

/// The first clause whose predicate is truthy supplies the result. A clause
/// with no consequent yields the predicate's value.
pub fn apply_cond(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    for clause in args {
        let parts = clause
            .to_vec()
            .map_err(|_| Error::Cond(CondError::ClauseNotAList(clause.to_string())))?;
        let (predicate, consequent) = parts
            .split_first()
            .ok_or(Error::Cond(CondError::EmptyClause))?;
        let test = evaluate(predicate, env)?;
        if test.truthy() {
            return match consequent.is_empty() {
                true => Ok(Finished(test)),
                false => evaluate_body(consequent, env.clone()),
            };
        }
    }
    Ok(Finished(Value::Nil))
}

pub fn apply_and(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let (last, init) = match args.split_last() {
        None => return Ok(Finished(Value::boolean(true))),
        Some(split) => split,
    };
    for arg in init {
        let value = evaluate(arg, env)?;
        if !value.truthy() {
            return Ok(Finished(value));
        }
    }
    Ok(EvaluateFurther(last.clone(), env.clone()))
}

pub fn apply_or(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let (last, init) = match args.split_last() {
        None => return Ok(Finished(Value::boolean(false))),
        Some(split) => split,
    };
    for arg in init {
        let value = evaluate(arg, env)?;
        if value.truthy() {
            return Ok(Finished(value));
        }
    }
    Ok(EvaluateFurther(last.clone(), env.clone()))
}

/// Overwrites an existing variable. The variable is shared, so every scope
/// which can see it sees the new value.
pub fn apply_set(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let name = match &args[0] {
        Value::Symbol(name) => name,
        other => return Err(Error::NotASymbol("set!", other.to_string())),
    };
    let value = evaluate(&args[1], env)?;
    let variable = env.lookup(name).map_err(Error::UnknownSymbol)?;
    log::debug!("set! {} to {}", name, value);
    variable.set(value);
    Ok(Finished(Value::Nil))
}

pub fn apply_eval(args: &[Value], env: &Rc<Scope>) -> Result<ApplyOutcome> {
    let value = evaluate(&args[0], env)?;
    log::info!("eval {}", value);
    Ok(EvaluateFurther(value.into_code(), env.clone()))
}

static DEFINE: PrimitiveMacro = PrimitiveMacro {
    name: "define",
    fn_ptr: apply_define,
    arity: Arity::at_least(1),
};

static LAMBDA: PrimitiveMacro = PrimitiveMacro {
    name: "lambda",
    fn_ptr: apply_lambda,
    arity: Arity::at_least(1),
};

static LET: PrimitiveMacro = PrimitiveMacro {
    name: "let",
    fn_ptr: apply_let,
    arity: Arity::at_least(1),
};

static IF: PrimitiveMacro = PrimitiveMacro {
    name: "if",
    fn_ptr: apply_if,
    arity: Arity::Between(2..=3),
};

static COND: PrimitiveMacro = PrimitiveMacro {
    name: "cond",
    fn_ptr: apply_cond,
    arity: Arity::at_least(0),
};

static AND: PrimitiveMacro = PrimitiveMacro {
    name: "and",
    fn_ptr: apply_and,
    arity: Arity::at_least(0),
};

static OR: PrimitiveMacro = PrimitiveMacro {
    name: "or",
    fn_ptr: apply_or,
    arity: Arity::at_least(0),
};

static SET: PrimitiveMacro = PrimitiveMacro {
    name: "set!",
    fn_ptr: apply_set,
    arity: Arity::exactly(2),
};

static EVAL: PrimitiveMacro = PrimitiveMacro {
    name: "eval",
    fn_ptr: apply_eval,
    arity: Arity::exactly(1),
};

pub type Namespace = HashMap<&'static str, &'static PrimitiveMacro>;

lazy_static! {
    pub static ref SPECIAL_FORMS: Namespace = {
        let mut map = Namespace::new();
        for form in &[&DEFINE, &LAMBDA, &LET, &IF, &COND, &AND, &OR, &SET, &EVAL] {
            map.insert(form.name, *form);
        }
        map
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment;
    use crate::reader::read_str;
    use crate::evaluator;

    fn run(source: &str, env: &Rc<Scope>) -> Result {
        let mut last = Value::Nil;
        for form in crate::reader::parse(crate::tokens::tokenize(source)) {
            last = evaluator::evaluate(&form.unwrap(), env)?;
        }
        Ok(last)
    }

    #[test]
    fn define_both_forms() {
        let env = environment::global();
        assert_eq!(run("(define x 4)", &env).unwrap(), Value::Nil);
        assert_eq!(run("(define (sq n) (* n n))", &env).unwrap(), Value::Nil);
        assert_eq!(run("(sq x)", &env).unwrap(), Value::Integer(16));
        assert_eq!(env.fetch("sq").unwrap().to_string(), "(lambda (n) (* n n))");
    }

    #[test]
    fn define_rejects_non_names() {
        let env = environment::global();
        assert!(matches!(run("(define 3 4)", &env), Err(Error::Define(_))));
        assert!(matches!(run("(define x 1 2)", &env), Err(Error::Define(_))));
        assert!(matches!(run("(define (3 a) a)", &env), Err(Error::Define(_))));
    }

    #[test]
    fn lambda_printed_form() {
        let env = environment::global();
        let f = run("(lambda (a b . c) (print a) c)", &env).unwrap();
        assert_eq!(f.to_string(), "(lambda (a b . c) (print a) c)");
        let empty = run("(lambda ())", &env).unwrap();
        assert_eq!(empty.to_string(), "(lambda ())");
    }

    #[test]
    fn lambda_rejects_bad_parameters() {
        let env = environment::global();
        assert!(matches!(run("(lambda (a 1) a)", &env), Err(Error::Lambda(_))));
        assert!(matches!(run("(lambda x x)", &env), Err(Error::Lambda(_))));
        assert!(matches!(run("(lambda (a . b c) a)", &env), Err(Error::Lambda(_))));
    }

    #[test]
    fn let_values_come_from_outer_scope() {
        let env = environment::global();
        run("(define x 1)", &env).unwrap();
        let result = run("(let ((x 10) (y x)) (list x y))", &env).unwrap();
        assert_eq!(result.to_string(), "(list 10 1)");
        assert_eq!(env.fetch("x").unwrap(), Value::Integer(1));
        assert!(matches!(run("(let (x) x)", &env), Err(Error::Let(_))));
    }

    #[test]
    fn if_without_alternative() {
        let env = environment::global();
        assert_eq!(run("(if #f 1)", &env).unwrap(), Value::Nil);
        assert_eq!(run("(if 0 1 2)", &env).unwrap(), Value::Integer(1));
        assert_eq!(run("(if NIL 1 2)", &env).unwrap(), Value::Integer(2));
    }

    #[test]
    fn cond_picks_first_truthy_clause() {
        let env = environment::global();
        let source = "(cond ((< 2 1) 'a) ((< 1 2) (print) 'b) (#t 'c))";
        assert_eq!(run(source, &env).unwrap(), Value::symbol("b"));
        assert_eq!(run("(cond (#f 1))", &env).unwrap(), Value::Nil);
        assert_eq!(run("(cond (7))", &env).unwrap(), Value::Integer(7));
        assert!(matches!(run("(cond ())", &env), Err(Error::Cond(_))));
    }

    #[test]
    fn and_or_short_circuit() {
        let env = environment::global();
        assert_eq!(run("(and)", &env).unwrap(), Value::boolean(true));
        assert_eq!(run("(or)", &env).unwrap(), Value::boolean(false));
        assert_eq!(run("(and 1 #f undefined)", &env).unwrap(), Value::boolean(false));
        assert_eq!(run("(or NIL 2 undefined)", &env).unwrap(), Value::Integer(2));
        assert_eq!(run("(and 1 2 3)", &env).unwrap(), Value::Integer(3));
        assert_eq!(run("(or #f NIL)", &env).unwrap(), Value::Nil);
    }

    #[test]
    fn set_requires_existing_variable() {
        let env = environment::global();
        assert!(matches!(run("(set! nope 1)", &env), Err(Error::UnknownSymbol(_))));
        assert!(matches!(run("(set! 1 1)", &env), Err(Error::NotASymbol("set!", _))));
        run("(define x 1)", &env).unwrap();
        assert_eq!(run("(set! x 2)", &env).unwrap(), Value::Nil);
        assert_eq!(env.fetch("x").unwrap(), Value::Integer(2));
    }

    #[test]
    fn eval_promotes_data_to_code() {
        let env = environment::global();
        assert_eq!(run("(eval (list + 1 2))", &env).unwrap(), Value::Integer(3));
        assert_eq!(run("(eval '(* 2 3))", &env).unwrap(), Value::Integer(6));
        assert_eq!(run("(eval 5)", &env).unwrap(), Value::Integer(5));
        run("(define y 9)", &env).unwrap();
        assert_eq!(run("(eval 'y)", &env).unwrap(), Value::Integer(9));
    }

    #[test]
    fn forms_are_registered_as_macros() {
        let form = read_str("if").unwrap();
        let env = environment::global();
        let value = evaluator::evaluate(&form, &env).unwrap();
        assert_eq!(value.to_string(), "#<macro if>");
        assert_eq!(SPECIAL_FORMS.len(), 9);
    }
}
