//! The closed set of built-in operations.
//!
//! Built-ins come in two kinds: eager [`OpKind::Function`]s receive their
//! arguments already evaluated, lazy [`OpKind::SpecialForm`]s receive the
//! raw argument subtrees and control evaluation themselves (binding forms
//! and conditionals). Modelling the set as an enum keeps dispatch exhaustive
//! at compile time; the special forms live in the evaluator module next to
//! the scope machinery they manipulate.

use std::fmt;

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Interpreter, eval_define, eval_if, eval_lambda, eval_set};
use crate::parser::SyntaxTree;

/// Implementation of a built-in operation.
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Regular function: takes evaluated arguments.
    Function(fn(&mut Interpreter, &[Value]) -> Result<Value, Error>),
    /// Special form: takes unevaluated argument trees and the current
    /// evaluation depth.
    SpecialForm(fn(&mut Interpreter, &[SyntaxTree], usize) -> Result<Value, Error>),
}

/// A built-in primitive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    Write,
    Lambda,
    Define,
    Set,
    If,
    Block,
}

impl Builtin {
    /// Resolve a name to a built-in, covering the aliases: `\` and the
    /// lambda glyph for `lambda`, `$` for `define`.
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "+" => Some(Builtin::Add),
            "-" => Some(Builtin::Sub),
            "*" => Some(Builtin::Mul),
            "/" => Some(Builtin::Div),
            "=" => Some(Builtin::Equal),
            "write" => Some(Builtin::Write),
            "lambda" | "\\" | "λ" => Some(Builtin::Lambda),
            "define" | "$" => Some(Builtin::Define),
            "set" => Some(Builtin::Set),
            "if" => Some(Builtin::If),
            "block" => Some(Builtin::Block),
            _ => None,
        }
    }

    /// The canonical name of this operation.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Equal => "=",
            Builtin::Write => "write",
            Builtin::Lambda => "lambda",
            Builtin::Define => "define",
            Builtin::Set => "set",
            Builtin::If => "if",
            Builtin::Block => "block",
        }
    }

    /// The implementation and evaluation strategy of this operation.
    pub fn kind(self) -> OpKind {
        match self {
            Builtin::Add => OpKind::Function(builtin_add),
            Builtin::Sub => OpKind::Function(builtin_sub),
            Builtin::Mul => OpKind::Function(builtin_mul),
            Builtin::Div => OpKind::Function(builtin_div),
            Builtin::Equal => OpKind::Function(builtin_equal),
            Builtin::Write => OpKind::Function(builtin_write),
            Builtin::Block => OpKind::Function(builtin_block),
            Builtin::Lambda => OpKind::SpecialForm(eval_lambda),
            Builtin::Define => OpKind::SpecialForm(eval_define),
            Builtin::Set => OpKind::SpecialForm(eval_set),
            Builtin::If => OpKind::SpecialForm(eval_if),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn builtin_add(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut sum = 0.0;
    for arg in args {
        sum += arg.as_number("'+' expects numeric arguments")?;
    }
    Ok(Value::Number(sum))
}

fn builtin_sub(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let Some((first, rest)) = args.split_first() else {
        return Err(Error::TypeError(
            "'-' expects at least one numeric argument".to_owned(),
        ));
    };
    let first = first.as_number("'-' expects numeric arguments")?;
    if rest.is_empty() {
        return Ok(Value::Number(-first));
    }
    let mut result = first;
    for arg in rest {
        result -= arg.as_number("'-' expects numeric arguments")?;
    }
    Ok(Value::Number(result))
}

fn builtin_mul(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut product = 1.0;
    for arg in args {
        product *= arg.as_number("'*' expects numeric arguments")?;
    }
    Ok(Value::Number(product))
}

/// Left-fold division starting from an accumulator of 1, over *all*
/// arguments: `(/ 10 2)` is `1/10/2`, i.e. 0.05, not 5. This mirrors the
/// reference semantics exactly, quirk included.
fn builtin_div(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let mut quotient = 1.0;
    for arg in args {
        quotient /= arg.as_number("'/' expects numeric arguments")?;
    }
    Ok(Value::Number(quotient))
}

/// True with no arguments, otherwise true iff every argument loosely equals
/// the first.
fn builtin_equal(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let result = match args.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|arg| arg.loose_eq(first)),
    };
    Ok(Value::Bool(result))
}

/// Concatenate the plain-text forms of the arguments and emit one line to
/// the interpreter's output sink.
fn builtin_write(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let text: String = args.iter().map(Value::to_text).collect();
    interp.emit(&text)?;
    Ok(Value::Null)
}

/// The arguments are already evaluated in order; return the last, or null
/// for an empty block.
fn builtin_block(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    Ok(args.last().cloned().unwrap_or(Value::Null))
}
