//! The runtime value domain.
//!
//! [`Value`] covers every value a program can produce: numbers (floats
//! only), strings, booleans, null, lists, built-in primitives and
//! user-defined closures. Helper conversions make values easy to build in
//! tests, and equality/display are customized to match the language rather
//! than Rust defaults.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::builtins::Builtin;
use crate::parser::SyntaxTree;

/// A user-defined closure.
///
/// The capture is a flattened snapshot of the defining environment view
/// (the active local scope if one existed, else the globals) taken at
/// creation time - deliberately not a chain of live enclosing scopes.
/// `self_name` remembers the name an enclosing `define` was binding, so the
/// body can call itself before that binding is registered.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: SyntaxTree,
    pub captured: HashMap<String, Value>,
    pub self_name: Option<String>,
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    /// The absent value: unbound parameters, `define` results, `(if #f x)`
    Null,
    List(Vec<Value>),
    /// A built-in primitive; functions are first-class, so a bare `+`
    /// evaluates to this
    Builtin(Builtin),
    Lambda(Rc<Lambda>),
}

impl Value {
    /// Truthiness for `if`: `#f`, null, zero, NaN and the empty string are
    /// falsy, everything else (lists and callables included) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Builtin(_) | Value::Lambda(_) => true,
        }
    }

    /// Loose equality for `=`: same variants compare structurally; numbers,
    /// strings and booleans additionally compare by numeric coercion
    /// (strings via a trimmed float parse, the empty string as 0, `#t` as 1
    /// and `#f` as 0).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => match (self.coerce_number(), other.coerce_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    fn coerce_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => {
                // An empty or whitespace-only string coerces to zero.
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// Require a number, for the arithmetic primitives.
    pub(crate) fn as_number(&self, context: &str) -> Result<f64, crate::Error> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(crate::Error::TypeError(format!(
                "{context}, got {other}"
            ))),
        }
    }

    /// The plain-text form used by `write`: strings are unquoted, null is
    /// empty, everything else renders as it displays.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_text).collect();
                format!("({})", parts.join(" "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Builtin(op) => write!(f, "#<builtin:{op}>"),
            Value::Lambda(_) => write!(f, "#<lambda>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            // Closures are only equal to themselves
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// From impls for ergonomic value construction, mostly used by tests.

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Helper for building Values from Rust literals.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}
