//! The small standard library every script scope sees: `Math`, `console`,
//! `range`, plus the array and string methods scripts commonly reach for.

use crate::error::ScriptError;

use super::scope::Scope;
use super::value::{format_number, NativeFn, Value, MAX_ARRAY_LENGTH};
use super::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    MathFloor,
    MathCeil,
    MathRound,
    MathAbs,
    MathMin,
    MathMax,
    MathSqrt,
    MathSign,
    MathRandom,
    ConsoleLog,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Push,
    Pop,
    Includes,
    IndexOf,
    ToLowerCase,
    ToUpperCase,
}

impl Method {
    fn lookup(name: &str) -> Option<Method> {
        Some(match name {
            "push" => Method::Push,
            "pop" => Method::Pop,
            "includes" => Method::Includes,
            "indexOf" => Method::IndexOf,
            "toLowerCase" => Method::ToLowerCase,
            "toUpperCase" => Method::ToUpperCase,
            _ => return None,
        })
    }

    /// Bind a method by name to an array or string receiver.
    pub fn bind(receiver: &Value, name: &str) -> Option<Value> {
        let method = Method::lookup(name)?;
        let applies = match receiver {
            Value::Array(_) => !matches!(method, Method::ToLowerCase | Method::ToUpperCase),
            Value::String(_) => !matches!(method, Method::Push | Method::Pop),
            _ => false,
        };
        applies.then(|| {
            Value::native(NativeFn::Method {
                method,
                receiver: receiver.clone(),
            })
        })
    }
}

fn native(builtin: Builtin) -> Value {
    Value::native(NativeFn::Builtin(builtin))
}

/// Declare the standard library in `scope`.
pub fn install(scope: &Scope) {
    let math = Value::object([
        ("PI".to_string(), Value::Number(std::f64::consts::PI)),
        ("floor".to_string(), native(Builtin::MathFloor)),
        ("ceil".to_string(), native(Builtin::MathCeil)),
        ("round".to_string(), native(Builtin::MathRound)),
        ("abs".to_string(), native(Builtin::MathAbs)),
        ("min".to_string(), native(Builtin::MathMin)),
        ("max".to_string(), native(Builtin::MathMax)),
        ("sqrt".to_string(), native(Builtin::MathSqrt)),
        ("sign".to_string(), native(Builtin::MathSign)),
        ("random".to_string(), native(Builtin::MathRandom)),
    ]);
    scope.declare_const("Math", math);

    let console = Value::object([("log".to_string(), native(Builtin::ConsoleLog))]);
    scope.declare_const("console", console);

    scope.declare_const("range", native(Builtin::Range));
}

fn arg_number(args: &[Value], i: usize) -> f64 {
    args.get(i).map_or(f64::NAN, Value::to_number)
}

pub(super) fn call(builtin: Builtin, args: &[Value], host: &mut dyn Host) -> Result<Value, ScriptError> {
    let result = match builtin {
        Builtin::MathFloor => arg_number(args, 0).floor(),
        Builtin::MathCeil => arg_number(args, 0).ceil(),
        // Math.round rounds .5 towards +Infinity
        Builtin::MathRound => (arg_number(args, 0) + 0.5).floor(),
        Builtin::MathAbs => arg_number(args, 0).abs(),
        Builtin::MathMin => args
            .iter()
            .map(Value::to_number)
            .fold(f64::INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.min(n) }),
        Builtin::MathMax => args
            .iter()
            .map(Value::to_number)
            .fold(f64::NEG_INFINITY, |acc, n| if n.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(n) }),
        Builtin::MathSqrt => arg_number(args, 0).sqrt(),
        Builtin::MathSign => {
            let n = arg_number(args, 0);
            if n.is_nan() || n == 0.0 { n } else { n.signum() }
        }
        Builtin::MathRandom => host.random(),
        Builtin::ConsoleLog => {
            let line = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
            tracing::info!(target: "gridplay::script", "{line}");
            return Ok(Value::Undefined);
        }
        Builtin::Range => {
            let n = arg_number(args, 0);
            if n.fract() != 0.0 || !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&n) {
                return Err(ScriptError::range(format!("Invalid range length {}", format_number(n))));
            }
            let items = (0..n as usize).map(|i| Value::Number(i as f64)).collect();
            return Ok(Value::array(items));
        }
    };
    Ok(Value::Number(result))
}

pub(super) fn call_method(method: Method, receiver: &Value, args: &[Value]) -> Result<Value, ScriptError> {
    let first = args.first().cloned().unwrap_or(Value::Undefined);
    match (method, receiver) {
        (Method::Push, Value::Array(items)) => {
            let mut items = items.borrow_mut();
            items.extend(args.iter().cloned());
            Ok(Value::Number(items.len() as f64))
        }
        (Method::Pop, Value::Array(items)) => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
        // includes uses SameValueZero, so NaN finds NaN
        (Method::Includes, Value::Array(items)) => Ok(Value::Bool(items.borrow().iter().any(|v| {
            v.strict_equals(&first)
                || matches!((v, &first), (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan())
        }))),
        (Method::IndexOf, Value::Array(items)) => Ok(Value::Number(
            items
                .borrow()
                .iter()
                .position(|v| v.strict_equals(&first))
                .map_or(-1.0, |i| i as f64),
        )),
        (Method::Includes, Value::String(s)) => Ok(Value::Bool(s.contains(&*first.to_string()))),
        (Method::IndexOf, Value::String(s)) => {
            let needle = first.to_string();
            Ok(Value::Number(match s.find(&needle) {
                Some(byte) => s[..byte].encode_utf16().count() as f64,
                None => -1.0,
            }))
        }
        (Method::ToLowerCase, Value::String(s)) => Ok(Value::string(s.to_lowercase())),
        (Method::ToUpperCase, Value::String(s)) => Ok(Value::string(s.to_uppercase())),
        _ => Err(ScriptError::type_error("method called on incompatible receiver")),
    }
}
