use crate::evaluator::{self, Error};
use crate::printer::{pr_str, PrintMode};
use crate::reader;
use crate::types::{Arity, Float, Int, PrimitiveFn, TypeMismatch, Value};
use itertools::Itertools;
use linefeed::{Interface, ReadResult};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::convert::TryFrom;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(Int),
    Float(Float),
}

impl Number {
    fn of(value: &Value) -> Result<Self, TypeMismatch> {
        match value {
            Value::Integer(x) => Ok(Number::Int(*x)),
            Value::Float(x) => Ok(Number::Float(*x)),
            _ => Err(TypeMismatch::NotANumber),
        }
    }

    fn to_float(self) -> Float {
        match self {
            Number::Int(x) => x as Float,
            Number::Float(x) => x,
        }
    }

    fn compare(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            (x, y) => x.to_float().partial_cmp(&y.to_float()),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(x) => Value::Integer(x),
            Number::Float(x) => Value::Float(x),
        }
    }
}

fn grab_numbers(args: &[Value]) -> evaluator::Result<Vec<Number>> {
    let type_check: Result<Vec<_>, _> = args.iter().map(Number::of).collect();
    type_check.map_err(Error::TypeMismatch)
}

// Integers stay integers unless they overflow, which is an error; anything
// involving a float is done in floats.
fn arithmetic(
    name: &'static str,
    x: Number,
    y: Number,
    int_op: fn(Int, Int) -> Option<Int>,
    float_op: fn(Float, Float) -> Float,
) -> evaluator::Result<Number> {
    match (x, y) {
        (Number::Int(a), Number::Int(b)) => int_op(a, b)
            .map(Number::Int)
            .ok_or(Error::IntegerOverflow(name)),
        _ => Ok(Number::Float(float_op(x.to_float(), y.to_float()))),
    }
}

static SUM: PrimitiveFn = PrimitiveFn {
    name: "+",
    fn_ptr: sum_,
    arity: Arity::at_least(0),
};

fn sum_(args: &[Value]) -> evaluator::Result {
    grab_numbers(args)?
        .into_iter()
        .try_fold(Number::Int(0), |acc, x| {
            arithmetic("+", acc, x, Int::checked_add, |a, b| a + b)
        })
        .map(Value::from)
}

static SUB: PrimitiveFn = PrimitiveFn {
    name: "-",
    fn_ptr: sub_,
    arity: Arity::at_least(0),
};

fn subtract(x: Number, y: Number) -> evaluator::Result<Number> {
    arithmetic("-", x, y, Int::checked_sub, |a, b| a - b)
}

fn sub_(args: &[Value]) -> evaluator::Result {
    let numbers = grab_numbers(args)?;
    match numbers.split_first() {
        None => Ok(Value::Integer(0)),
        Some((&Number::Float(x), [])) => Ok(Value::Float(-x)),
        Some((&only, [])) => subtract(Number::Int(0), only).map(Value::from),
        Some((&first, rest)) => rest
            .iter()
            .try_fold(first, |acc, &x| subtract(acc, x))
            .map(Value::from),
    }
}

static MUL: PrimitiveFn = PrimitiveFn {
    name: "*",
    fn_ptr: mul_,
    arity: Arity::at_least(0),
};

fn mul_(args: &[Value]) -> evaluator::Result {
    grab_numbers(args)?
        .into_iter()
        .try_fold(Number::Int(1), |acc, x| {
            arithmetic("*", acc, x, Int::checked_mul, |a, b| a * b)
        })
        .map(Value::from)
}

static DIV: PrimitiveFn = PrimitiveFn {
    name: "/",
    fn_ptr: div_,
    arity: Arity::at_least(1),
};

fn divide(x: Number, y: Number) -> evaluator::Result<Number> {
    match y.to_float() {
        d if d == 0.0 => Err(Error::DivideByZero("/")),
        d => Ok(Number::Float(x.to_float() / d)),
    }
}

// Always a float.
fn div_(args: &[Value]) -> evaluator::Result {
    let numbers = grab_numbers(args)?;
    match numbers.split_first() {
        Some((&only, [])) => divide(Number::Int(1), only).map(Value::from),
        Some((&first, rest)) => rest
            .iter()
            .try_fold(first, |acc, &x| divide(acc, x))
            .map(Value::from),
        None => unreachable!("arity is validated before the call"),
    }
}

static FLOORDIV: PrimitiveFn = PrimitiveFn {
    name: "floordiv",
    fn_ptr: floordiv_,
    arity: Arity::at_least(1),
};

fn floor_divide(x: Number, y: Number) -> evaluator::Result<Number> {
    match (x, y) {
        (_, Number::Int(0)) => Err(Error::DivideByZero("floordiv")),
        (Number::Int(a), Number::Int(b)) => {
            let quotient = a
                .checked_div(b)
                .ok_or(Error::IntegerOverflow("floordiv"))?;
            match a % b != 0 && (a < 0) != (b < 0) {
                true => Ok(Number::Int(quotient - 1)),
                false => Ok(Number::Int(quotient)),
            }
        }
        _ => match y.to_float() {
            d if d == 0.0 => Err(Error::DivideByZero("floordiv")),
            d => Ok(Number::Float((x.to_float() / d).floor())),
        },
    }
}

fn floordiv_(args: &[Value]) -> evaluator::Result {
    let numbers = grab_numbers(args)?;
    match numbers.split_first() {
        Some((&only, [])) => floor_divide(Number::Int(1), only).map(Value::from),
        Some((&first, rest)) => rest
            .iter()
            .try_fold(first, |acc, &x| floor_divide(acc, x))
            .map(Value::from),
        None => unreachable!("arity is validated before the call"),
    }
}

static REMAINDER: PrimitiveFn = PrimitiveFn {
    name: "remainder",
    fn_ptr: remainder_,
    arity: Arity::exactly(2),
};

// The result takes the sign of the divisor.
fn remainder_(args: &[Value]) -> evaluator::Result {
    match grab_numbers(args)?.as_slice() {
        [_, Number::Int(0)] => Err(Error::DivideByZero("remainder")),
        [Number::Int(a), Number::Int(b)] => {
            let r = a.checked_rem(*b).ok_or(Error::IntegerOverflow("remainder"))?;
            match r != 0 && (r < 0) != (*b < 0) {
                true => Ok(Value::Integer(r + b)),
                false => Ok(Value::Integer(r)),
            }
        }
        [x, y] => {
            let (a, b) = (x.to_float(), y.to_float());
            if b == 0.0 {
                return Err(Error::DivideByZero("remainder"));
            }
            let r = a % b;
            match r != 0.0 && (r < 0.0) != (b < 0.0) {
                true => Ok(Value::Float(r + b)),
                false => Ok(Value::Float(r)),
            }
        }
        _ => unreachable!("arity is validated before the call"),
    }
}

static EXPT: PrimitiveFn = PrimitiveFn {
    name: "expt",
    fn_ptr: expt_,
    arity: Arity::exactly(2),
};

fn expt_(args: &[Value]) -> evaluator::Result {
    match grab_numbers(args)?.as_slice() {
        [Number::Int(base), Number::Int(exponent)] if *exponent >= 0 => u32::try_from(*exponent)
            .ok()
            .and_then(|e| base.checked_pow(e))
            .map(Value::Integer)
            .ok_or(Error::IntegerOverflow("expt")),
        [base, exponent] => Ok(Value::Float(base.to_float().powf(exponent.to_float()))),
        _ => unreachable!("arity is validated before the call"),
    }
}

static ABS: PrimitiveFn = PrimitiveFn {
    name: "abs",
    fn_ptr: abs_,
    arity: Arity::exactly(1),
};

fn abs_(args: &[Value]) -> evaluator::Result {
    match Number::of(&args[0])? {
        Number::Int(x) => x
            .checked_abs()
            .map(Value::Integer)
            .ok_or(Error::IntegerOverflow("abs")),
        Number::Float(x) => Ok(Value::Float(x.abs())),
    }
}

fn round_with(name: &'static str, x: Number, round: fn(Float) -> Float) -> evaluator::Result {
    match x {
        Number::Int(x) => Ok(Value::Integer(x)),
        Number::Float(x) => {
            let rounded = round(x);
            match rounded.is_finite() && rounded.abs() < Int::MAX as Float {
                true => Ok(Value::Integer(rounded as Int)),
                false => Err(Error::BadConversion {
                    name,
                    value: Value::Float(x).to_string(),
                }),
            }
        }
    }
}

static FLOOR: PrimitiveFn = PrimitiveFn {
    name: "floor",
    fn_ptr: |args| round_with("floor", Number::of(&args[0])?, Float::floor),
    arity: Arity::exactly(1),
};

static CEIL: PrimitiveFn = PrimitiveFn {
    name: "ceil",
    fn_ptr: |args| round_with("ceil", Number::of(&args[0])?, Float::ceil),
    arity: Arity::exactly(1),
};

static SQRT: PrimitiveFn = PrimitiveFn {
    name: "sqrt",
    fn_ptr: sqrt_,
    arity: Arity::exactly(1),
};

fn sqrt_(args: &[Value]) -> evaluator::Result {
    match Number::of(&args[0])?.to_float() {
        x if x < 0.0 => Err(Error::MathDomain("sqrt")),
        x => Ok(Value::Float(x.sqrt())),
    }
}

// Two numbers or two strings.
fn comparison_(args: &[Value], test: fn(Ordering) -> bool) -> evaluator::Result {
    let ordering = match (&args[0], &args[1]) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (x, y) => Number::of(x)?.compare(Number::of(y)?),
    };
    Ok(Value::boolean(ordering.map_or(false, test)))
}

macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            static $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |args: &[Value]| comparison_(args, Ordering:: [<is_ $NAME:lower>]),
                arity: Arity::exactly(2),
            };
        }
    };
}

comparison_primitive!(<, LT);
comparison_primitive!(<=, LE);
comparison_primitive!(>, GT);
comparison_primitive!(>=, GE);

static EQUAL: PrimitiveFn = PrimitiveFn {
    name: "=",
    fn_ptr: equal,
    arity: Arity::exactly(2),
};

fn equal(args: &[Value]) -> evaluator::Result {
    Ok(Value::boolean(args[0] == args[1]))
}

static NOT: PrimitiveFn = PrimitiveFn {
    name: "not",
    fn_ptr: |args| Ok(Value::boolean(!args[0].truthy())),
    arity: Arity::exactly(1),
};

static CONS: PrimitiveFn = PrimitiveFn {
    name: "cons",
    fn_ptr: |args| Ok(Value::cons(args[0].clone(), args[1].clone())),
    arity: Arity::exactly(2),
};

static CAR: PrimitiveFn = PrimitiveFn {
    name: "car",
    fn_ptr: |args| Ok(args[0].car()?),
    arity: Arity::exactly(1),
};

static CDR: PrimitiveFn = PrimitiveFn {
    name: "cdr",
    fn_ptr: |args| Ok(args[0].cdr()?),
    arity: Arity::exactly(1),
};

static LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: |args| Ok(Value::list(args.iter().cloned())),
    arity: Arity::at_least(0),
};

fn bad_conversion(name: &'static str, value: &Value) -> Error {
    Error::BadConversion {
        name,
        value: value.to_string(),
    }
}

static INT: PrimitiveFn = PrimitiveFn {
    name: "int",
    fn_ptr: int_,
    arity: Arity::exactly(1),
};

// Floats truncate towards zero; strings are parsed.
fn int_(args: &[Value]) -> evaluator::Result {
    match &args[0] {
        Value::Integer(x) => Ok(Value::Integer(*x)),
        Value::Float(x) if x.is_finite() && x.abs() < Int::MAX as Float => {
            Ok(Value::Integer(x.trunc() as Int))
        }
        Value::Bool(b) => Ok(Value::Integer(*b as Int)),
        Value::String(s) => s
            .trim()
            .parse::<Int>()
            .map(Value::Integer)
            .map_err(|_| bad_conversion("int", &args[0])),
        other => Err(bad_conversion("int", other)),
    }
}

static FLOAT: PrimitiveFn = PrimitiveFn {
    name: "float",
    fn_ptr: float_,
    arity: Arity::exactly(1),
};

fn float_(args: &[Value]) -> evaluator::Result {
    match &args[0] {
        Value::Integer(x) => Ok(Value::Float(*x as Float)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(b) => Ok(Value::Float(*b as Int as Float)),
        Value::String(s) => s
            .trim()
            .parse::<Float>()
            .map(Value::Float)
            .map_err(|_| bad_conversion("float", &args[0])),
        other => Err(bad_conversion("float", other)),
    }
}

static SYMBOL: PrimitiveFn = PrimitiveFn {
    name: "symbol",
    fn_ptr: |args| Ok(Value::symbol(&pr_str(&args[0], PrintMode::Directly))),
    arity: Arity::exactly(1),
};

static STRING: PrimitiveFn = PrimitiveFn {
    name: "string",
    fn_ptr: |args| {
        Ok(Value::string(
            args.first()
                .map(|arg| pr_str(arg, PrintMode::Directly))
                .unwrap_or_default(),
        ))
    },
    arity: Arity::Between(0..=1),
};

macro_rules! predicate_primitive {
    ($SYMBOL:literal, $NAME:ident, $TEST:expr) => {
        static $NAME: PrimitiveFn = PrimitiveFn {
            name: $SYMBOL,
            fn_ptr: |args: &[Value]| Ok(Value::boolean($TEST(&args[0]))),
            arity: Arity::exactly(1),
        };
    };
}

predicate_primitive!("nil?", NIL_TEST, Value::is_nil);
predicate_primitive!("pair?", PAIR_TEST, |v: &Value| matches!(v, Value::Cons(_)));
predicate_primitive!("list?", LIST_TEST, Value::is_list);
predicate_primitive!("number?", NUMBER_TEST, Value::is_number);
predicate_primitive!("symbol?", SYMBOL_TEST, |v: &Value| matches!(v, Value::Symbol(_)));
predicate_primitive!("string?", STRING_TEST, |v: &Value| matches!(v, Value::String(_)));
predicate_primitive!("boolean?", BOOLEAN_TEST, |v: &Value| matches!(v, Value::Bool(_)));
predicate_primitive!("procedure?", PROCEDURE_TEST, Value::is_procedure);

static PRINT: PrimitiveFn = PrimitiveFn {
    name: "print",
    fn_ptr: print_,
    arity: Arity::at_least(0),
};

fn print_(args: &[Value]) -> evaluator::Result {
    let text = args
        .iter()
        .map(|arg| pr_str(arg, PrintMode::Directly))
        .join(" ");
    println!("{}", text);
    Ok(Value::Nil)
}

static INPUT: PrimitiveFn = PrimitiveFn {
    name: "input",
    fn_ptr: input_,
    arity: Arity::Between(0..=1),
};

// End of input gives NIL.
fn input_(args: &[Value]) -> evaluator::Result {
    let prompt = args
        .first()
        .map(|arg| pr_str(arg, PrintMode::Directly))
        .unwrap_or_default();
    let interface = Interface::new("slyther-input")?;
    interface.set_prompt(&prompt)?;
    match interface.read_line()? {
        ReadResult::Input(line) => Ok(Value::string(line)),
        ReadResult::Eof | ReadResult::Signal(_) => Ok(Value::Nil),
    }
}

static FORMAT: PrimitiveFn = PrimitiveFn {
    name: "format",
    fn_ptr: format_,
    arity: Arity::at_least(1),
};

// `{}` takes the next argument, `{n}` the nth; `{{` and `}}` are literal braces.
fn format_(args: &[Value]) -> evaluator::Result {
    let template = args[0].as_str()?;
    let values = &args[1..];
    let mut output = String::with_capacity(template.len());
    let mut next_auto = 0;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(Error::Format("unclosed '{' in template".into())),
                    }
                }
                let index = match field.as_str() {
                    "" => {
                        next_auto += 1;
                        next_auto - 1
                    }
                    _ => field
                        .parse::<usize>()
                        .map_err(|_| Error::Format(format!("bad field {{{}}}", field)))?,
                };
                let value = values.get(index).ok_or_else(|| {
                    Error::Format(format!("no argument for field {}", index))
                })?;
                output.push_str(&pr_str(value, PrintMode::Directly));
            }
            '}' => return Err(Error::Format("single '}' in template".into())),
            c => output.push(c),
        }
    }
    Ok(Value::string(output))
}

static SPLIT: PrimitiveFn = PrimitiveFn {
    name: "split",
    fn_ptr: split_,
    arity: Arity::Between(1..=2),
};

fn split_(args: &[Value]) -> evaluator::Result {
    let text = args[0].as_str()?;
    let pieces: Vec<Value> = match args.get(1) {
        None => text.split_whitespace().map(Value::from).collect(),
        Some(separator) => match separator.as_str()? {
            "" => {
                return Err(Error::BadArgument {
                    name: "split",
                    reason: "empty separator".into(),
                })
            }
            separator => text.split(separator).map(Value::from).collect(),
        },
    };
    Ok(Value::list(pieces))
}

static PARSE: PrimitiveFn = PrimitiveFn {
    name: "parse",
    fn_ptr: |args| reader::read_str(args[0].as_str()?).map_err(Error::Read),
    arity: Arity::exactly(1),
};

pub type Namespace = HashMap<&'static str, &'static PrimitiveFn>;

lazy_static! {
    pub static ref CORE: Namespace = {
        let mut map = Namespace::new();
        for func in &[
            &SUM, &SUB, &MUL, &DIV, &FLOORDIV, &REMAINDER, &EXPT, &ABS, &FLOOR, &CEIL, &SQRT,
            &LT, &LE, &GT, &GE, &EQUAL, &NOT,
            &CONS, &CAR, &CDR, &LIST,
            &INT, &FLOAT, &SYMBOL, &STRING,
            &NIL_TEST, &PAIR_TEST, &LIST_TEST, &NUMBER_TEST, &SYMBOL_TEST, &STRING_TEST,
            &BOOLEAN_TEST, &PROCEDURE_TEST,
            &PRINT, &INPUT, &FORMAT, &SPLIT, &PARSE,
        ] {
            map.insert(func.name, *func);
        }
        map
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::call_primitive;

    fn call(name: &str, args: Vec<Value>) -> evaluator::Result {
        call_primitive(CORE[name], &args)
    }

    fn int(x: Int) -> Value {
        Value::Integer(x)
    }

    fn float(x: Float) -> Value {
        Value::Float(x)
    }

    #[test]
    fn arithmetic_identities() {
        assert_eq!(call("+", vec![]).unwrap(), int(0));
        assert_eq!(call("*", vec![]).unwrap(), int(1));
        assert_eq!(call("-", vec![]).unwrap(), int(0));
        assert_eq!(call("-", vec![int(4)]).unwrap(), int(-4));
        assert_eq!(call("-", vec![int(10), int(3), int(2)]).unwrap(), int(5));
        assert_eq!(call("+", vec![int(1), float(0.5)]).unwrap(), float(1.5));
    }

    #[test]
    fn integer_overflow_is_an_error() {
        assert!(matches!(
            call("*", vec![int(Int::MAX), int(2)]),
            Err(Error::IntegerOverflow("*"))
        ));
        assert!(matches!(
            call("expt", vec![int(2), int(64)]),
            Err(Error::IntegerOverflow("expt"))
        ));
    }

    #[test]
    fn true_division_gives_floats() {
        assert_eq!(call("/", vec![int(6), int(3)]).unwrap(), float(2.0));
        assert!(matches!(call("/", vec![int(6), int(3)]).unwrap(), Value::Float(_)));
        assert_eq!(call("/", vec![int(4)]).unwrap(), float(0.25));
        assert!(matches!(
            call("/", vec![int(1), int(0)]),
            Err(Error::DivideByZero("/"))
        ));
    }

    #[test]
    fn floor_division_and_remainder_follow_the_divisor() {
        assert_eq!(call("floordiv", vec![int(7), int(2)]).unwrap(), int(3));
        assert_eq!(call("floordiv", vec![int(-7), int(2)]).unwrap(), int(-4));
        assert_eq!(call("floordiv", vec![float(7.5), int(2)]).unwrap(), float(3.0));
        assert_eq!(call("remainder", vec![int(-7), int(2)]).unwrap(), int(1));
        assert_eq!(call("remainder", vec![int(7), int(-2)]).unwrap(), int(-1));
        assert_eq!(call("remainder", vec![float(5.5), int(2)]).unwrap(), float(1.5));
        assert!(matches!(
            call("remainder", vec![int(1), int(0)]),
            Err(Error::DivideByZero("remainder"))
        ));
    }

    #[test]
    fn rounding_and_roots() {
        assert_eq!(call("floor", vec![float(-1.5)]).unwrap(), int(-2));
        assert_eq!(call("ceil", vec![float(1.2)]).unwrap(), int(2));
        assert_eq!(call("abs", vec![int(-3)]).unwrap(), int(3));
        assert_eq!(call("sqrt", vec![int(16)]).unwrap(), float(4.0));
        assert!(matches!(call("sqrt", vec![int(-1)]), Err(Error::MathDomain("sqrt"))));
        assert_eq!(call("expt", vec![int(2), int(10)]).unwrap(), int(1024));
        assert_eq!(call("expt", vec![int(2), int(-1)]).unwrap(), float(0.5));
    }

    #[test]
    fn comparisons() {
        assert_eq!(call("<", vec![int(1), int(2)]).unwrap(), Value::boolean(true));
        assert_eq!(call(">=", vec![int(1), float(1.0)]).unwrap(), Value::boolean(true));
        assert_eq!(call(">", vec![int(1), int(2)]).unwrap(), Value::boolean(false));
        assert_eq!(
            call("<=", vec![Value::string("abc"), Value::string("abd")]).unwrap(),
            Value::boolean(true)
        );
        match call("<", vec![int(1), Value::string("a")]) {
            Err(Error::WrongType { name, mismatch }) => {
                assert_eq!(name, "<");
                assert_eq!(mismatch, TypeMismatch::NotANumber);
            }
            other => panic!("expected wrong type, got {:?}", other),
        }
    }

    #[test]
    fn equality_and_negation() {
        let a = Value::list(vec![int(1), int(2)]);
        let b = Value::list(vec![int(1), int(2)]);
        assert_eq!(call("=", vec![a, b]).unwrap(), Value::boolean(true));
        assert_eq!(call("=", vec![int(1), float(1.0)]).unwrap(), Value::boolean(true));
        assert_eq!(
            call("=", vec![Value::symbol("a"), Value::string("a")]).unwrap(),
            Value::boolean(false)
        );
        assert_eq!(call("not", vec![Value::Nil]).unwrap(), Value::boolean(true));
        assert_eq!(call("not", vec![int(0)]).unwrap(), Value::boolean(false));
    }

    #[test]
    fn list_primitives() {
        assert_eq!(call("list", vec![]).unwrap(), Value::Nil);
        assert_eq!(call("cons", vec![int(5), Value::Nil]).unwrap().to_string(), "(list 5)");
        assert_eq!(call("cons", vec![int(5), int(4)]).unwrap().to_string(), "(cons 5 4)");
        assert_eq!(call("car", vec![Value::Nil]).unwrap(), Value::Nil);
        assert_eq!(call("cdr", vec![Value::Nil]).unwrap(), Value::Nil);
        let list = call("list", vec![int(1), int(2)]).unwrap();
        assert_eq!(call("car", vec![list.clone()]).unwrap(), int(1));
        assert_eq!(call("cdr", vec![list]).unwrap().to_string(), "(list 2)");
    }

    #[test]
    fn conversions() {
        assert_eq!(call("int", vec![float(-2.7)]).unwrap(), int(-2));
        assert_eq!(call("int", vec![Value::string(" 42 ")]).unwrap(), int(42));
        assert!(matches!(
            call("int", vec![Value::string("4x")]),
            Err(Error::BadConversion { name: "int", .. })
        ));
        assert_eq!(call("float", vec![int(3)]).unwrap(), float(3.0));
        assert_eq!(call("symbol", vec![Value::string("abc")]).unwrap(), Value::symbol("abc"));
        assert_eq!(call("string", vec![Value::symbol("abc")]).unwrap(), Value::string("abc"));
        assert_eq!(call("string", vec![int(12)]).unwrap(), Value::string("12"));
        assert_eq!(call("string", vec![]).unwrap(), Value::string(""));
    }

    #[test]
    fn predicates() {
        let truth = |name: &str, value: Value| call(name, vec![value]).unwrap().truthy();
        assert!(truth("nil?", Value::Nil));
        assert!(!truth("nil?", int(0)));
        assert!(truth("pair?", Value::cons(int(1), int(2))));
        assert!(!truth("pair?", Value::Nil));
        assert!(truth("list?", Value::Nil));
        assert!(!truth("list?", Value::cons(int(1), int(2))));
        assert!(truth("number?", float(1.0)));
        assert!(truth("symbol?", Value::symbol("x")));
        assert!(truth("string?", Value::string("x")));
        assert!(truth("boolean?", Value::boolean(false)));
        assert!(truth("procedure?", Value::Primitive(CORE["car"])));
        assert!(!truth("procedure?", Value::symbol("car")));
    }

    #[test]
    fn format_fields() {
        let format = |template: &str, args: Vec<Value>| {
            let mut all = vec![Value::string(template)];
            all.extend(args);
            call("format", all)
        };
        assert_eq!(
            format("{} and {}", vec![int(1), Value::string("two")]).unwrap(),
            Value::string("1 and two")
        );
        assert_eq!(
            format("{1}{0}{{}}", vec![int(1), int(2)]).unwrap(),
            Value::string("21{}")
        );
        assert!(matches!(format("{}", vec![]), Err(Error::Format(_))));
        assert!(matches!(format("{", vec![]), Err(Error::Format(_))));
        assert!(matches!(format("}", vec![]), Err(Error::Format(_))));
    }

    #[test]
    fn split_strings() {
        let split = |args: Vec<Value>| call("split", args).unwrap().to_string();
        assert_eq!(
            split(vec![Value::string("  a b\tc ")]),
            r#"(list "a" "b" "c")"#
        );
        assert_eq!(
            split(vec![Value::string("a,,b"), Value::string(",")]),
            r#"(list "a" "" "b")"#
        );
        assert!(matches!(
            call("split", vec![Value::string("a"), Value::string("")]),
            Err(Error::BadArgument { name: "split", .. })
        ));
    }

    #[test]
    fn parse_returns_data() {
        let parsed = call("parse", vec![Value::string("(+ 1 2) ignored")]).unwrap();
        assert_eq!(parsed.to_string(), "(list + 1 2)");
        assert_eq!(call("parse", vec![Value::string("")]).unwrap(), Value::Nil);
        assert!(matches!(
            call("parse", vec![Value::string("(")]),
            Err(Error::Read(reader::Error::NotClosed))
        ));
    }
}
