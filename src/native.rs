//! Built-in functions, registered in the globals frame at interpreter
//! construction.  A native signals misuse by returning a message that the
//! evaluator wraps into the dedicated native-error kind.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::value::Value;

pub type NativeResult = Result<Value, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> NativeResult,
}

/// The complete set of built-ins.
pub const NATIVES: &[NativeFn] = &[
    NativeFn {
        name: "clock",
        arity: 0,
        func: clock,
    },
    NativeFn {
        name: "sleep",
        arity: 1,
        func: sleep,
    },
    NativeFn {
        name: "string",
        arity: 1,
        func: stringify,
    },
    NativeFn {
        name: "instance_of",
        arity: 2,
        func: instance_of,
    },
];

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> NativeResult {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("clock failed: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

/// Blocks the interpreter thread for the given number of seconds.
fn sleep(args: &[Value]) -> NativeResult {
    match args[0] {
        Value::Number(seconds) if seconds >= 0.0 => {
            thread::sleep(Duration::from_secs_f64(seconds));
            Ok(Value::Nil)
        }

        _ => Err("Argument to 'sleep' should be a non-negative number.".to_string()),
    }
}

/// String form of any value; a string argument comes back unchanged.
fn stringify(args: &[Value]) -> NativeResult {
    Ok(Value::String(args[0].to_string()))
}

fn instance_of(args: &[Value]) -> NativeResult {
    match (&args[0], &args[1]) {
        (Value::Instance(instance), Value::Class(class)) => {
            Ok(Value::Bool(instance.borrow().instance_of(class)))
        }

        _ => Err("Arguments to 'instance_of' must be an instance and a class.".to_string()),
    }
}
