//! tisp - a small S-expression language interpreter
//!
//! This crate implements the full front-to-back pipeline for a Lisp-like
//! language: a line-buffered tokenizer, a recursive S-expression parser, and
//! a tree-walking evaluator with built-in primitives, conditionals and
//! user-defined closures.
//!
//! ```scheme
//! (define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))
//! (fact 5)                ; 120
//! (write "2 + 3 = " (+ 2 3))
//! ```
//!
//! The pipeline is: [`source::LineSource`] -> [`lexer::Tokenizer`] ->
//! [`parser::read`] -> [`evaluator::Interpreter::execute`] -> [`ast::Value`].
//! Everything is synchronous and single-threaded; parser recursion mirrors
//! parenthesis nesting and evaluator recursion mirrors expression depth.
//!
//! ```
//! use tisp::evaluator::Interpreter;
//! use tisp::lexer::Tokenizer;
//! use tisp::parser;
//! use tisp::source::TextSource;
//!
//! let mut tokens = Tokenizer::new(TextSource::new("(+ 1 2)"));
//! let tree = parser::read(&mut tokens).unwrap();
//! let mut interp = Interpreter::new();
//! assert_eq!(interp.execute(&tree).unwrap().to_string(), "3");
//! ```
//!
//! ## Modules
//!
//! - `source`: line-oriented input (whole file split up front)
//! - `lexer`: tokens and the caching tokenizer
//! - `parser`: token stream to syntax tree
//! - `ast`: the runtime value domain
//! - `builtins`: the closed set of built-in operations
//! - `evaluator`: scopes, special forms and the tree walker

use std::fmt;

/// Maximum evaluation depth. Runaway recursion (a self-call with no base
/// case) fails with an evaluation error at this depth instead of overflowing
/// the host stack.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Error types for the interpreter.
///
/// Every failure is terminal for the current program run; there is no
/// catch/retry layer. Variants carry the offending line (0-based) where one
/// is available.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Lexical errors: unterminated string, invalid boolean, unparseable token
    ScanError { message: String, line: usize },
    /// Structural errors: unbalanced parentheses, premature end of stream
    ParseError { message: String, line: Option<usize> },
    /// Evaluation errors: empty statement, non-callable head, bad special forms
    EvalError { message: String, line: Option<usize> },
    /// Wrong argument type for a built-in operation
    TypeError(String),
    /// An identifier or symbol with no binding and no built-in meaning
    UnboundVariable { name: String, line: usize },
}

impl Error {
    pub(crate) fn scan(line: usize, message: impl Into<String>) -> Self {
        Error::ScanError {
            message: message.into(),
            line,
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::ParseError {
            message: message.into(),
            line: None,
        }
    }

    pub(crate) fn parse_at(line: usize, message: impl Into<String>) -> Self {
        Error::ParseError {
            message: message.into(),
            line: Some(line),
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        Error::EvalError {
            message: message.into(),
            line: None,
        }
    }

    pub(crate) fn eval_at(line: Option<usize>, message: impl Into<String>) -> Self {
        Error::EvalError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ScanError { message, line } => {
                write!(f, "ScanError: {message} (line {line})")
            }
            Error::ParseError { message, line } => {
                write!(f, "ParseError: {message}")?;
                if let Some(line) = line {
                    write!(f, " (line {line})")?;
                }
                Ok(())
            }
            Error::EvalError { message, line } => {
                write!(f, "EvaluationError: {message}")?;
                if let Some(line) = line {
                    write!(f, " (line {line})")?;
                }
                Ok(())
            }
            Error::TypeError(message) => write!(f, "Type error: {message}"),
            Error::UnboundVariable { name, line } => {
                write!(f, "Unknown symbol or identifier '{name}' (line {line})")
            }
        }
    }
}

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod source;
