//! The tree-walking evaluator.
//!
//! An [`Interpreter`] owns the two-tier variable environment (one global
//! scope, at most one active local scope), the in-progress `define` marker
//! and the output sink used by `write`. Each instance is fully independent,
//! so tests can run many interpreters side by side.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ast::{Lambda, Value};
use crate::builtins::{Builtin, OpKind};
use crate::lexer::TokenKind;
use crate::parser::SyntaxTree;
use crate::{Error, MAX_EVAL_DEPTH};

pub struct Interpreter {
    globals: HashMap<String, Value>,
    /// At most one local scope is ever active; closure calls swap it out and
    /// restore the previous one on exit, so recursion nests through the call
    /// stack rather than through a scope chain.
    local: Option<HashMap<String, Value>>,
    /// Name currently being bound by an in-progress `define`. Enables
    /// self-reference in lambda bodies and forbids nested defines.
    defining: Option<String>,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// An interpreter writing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter with an injected output sink for `write`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let mut globals = HashMap::new();
        globals.insert("PI".to_owned(), Value::Number(std::f64::consts::PI));
        globals.insert("E".to_owned(), Value::Number(std::f64::consts::E));
        Interpreter {
            globals,
            local: None,
            defining: None,
            out,
        }
    }

    /// Evaluate one top-level syntax tree to a value.
    pub fn execute(&mut self, tree: &SyntaxTree) -> Result<Value, Error> {
        self.eval(tree, 0)
    }

    pub(crate) fn eval(&mut self, tree: &SyntaxTree, depth: usize) -> Result<Value, Error> {
        if depth >= MAX_EVAL_DEPTH {
            return Err(Error::eval(format!(
                "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            )));
        }

        match tree {
            SyntaxTree::List(items) => {
                let Some((head, tail)) = items.split_first() else {
                    return Err(Error::eval("unexpected empty statement"));
                };
                let target = self.eval(head, depth + 1)?;
                match target {
                    Value::Builtin(op) => match op.kind() {
                        OpKind::SpecialForm(form) => form(self, tail, depth),
                        OpKind::Function(func) => {
                            let args = self.eval_args(tail, depth)?;
                            func(self, &args)
                        }
                    },
                    Value::Lambda(lambda) => {
                        let args = self.eval_args(tail, depth)?;
                        self.call(&lambda, args, depth)
                    }
                    other => Err(Error::eval_at(
                        head.line(),
                        format!("expected function, got {other}"),
                    )),
                }
            }
            SyntaxTree::Atom(token) => match &token.kind {
                TokenKind::Number(n) => Ok(Value::Number(*n)),
                TokenKind::String(s) => Ok(Value::String(s.clone())),
                TokenKind::Boolean(b) => Ok(Value::Bool(*b)),
                TokenKind::Identifier(name) | TokenKind::Symbol(name) => {
                    self.lookup(name, token.line)
                }
                // The parser never emits structural tokens as leaves.
                TokenKind::LeftParen | TokenKind::RightParen => Err(Error::eval_at(
                    Some(token.line),
                    "parenthesis token cannot be evaluated",
                )),
            },
        }
    }

    /// Resolve a name: built-ins first (they are first-class values and can
    /// never be shadowed), then the active local scope with fall-through to
    /// the globals.
    fn lookup(&self, name: &str, line: usize) -> Result<Value, Error> {
        if let Some(op) = Builtin::from_name(name) {
            return Ok(Value::Builtin(op));
        }
        if let Some(local) = &self.local
            && let Some(value) = local.get(name)
        {
            return Ok(value.clone());
        }
        match self.globals.get(name) {
            Some(value) => Ok(value.clone()),
            None => Err(Error::UnboundVariable {
                name: name.to_owned(),
                line,
            }),
        }
    }

    fn eval_args(&mut self, args: &[SyntaxTree], depth: usize) -> Result<Vec<Value>, Error> {
        args.iter().map(|arg| self.eval(arg, depth + 1)).collect()
    }

    /// Invoke a closure: push a fresh local scope built from the capture,
    /// bind the self-name and the parameters, evaluate the body, and restore
    /// the previous scope on every exit path.
    fn call(&mut self, lambda: &Rc<Lambda>, args: Vec<Value>, depth: usize) -> Result<Value, Error> {
        let mut scope = lambda.captured.clone();
        if let Some(name) = &lambda.self_name {
            scope.insert(name.clone(), Value::Lambda(Rc::clone(lambda)));
        }
        // Positional binding; missing arguments bind null, extras are dropped.
        let mut args = args.into_iter();
        for param in &lambda.params {
            scope.insert(param.clone(), args.next().unwrap_or(Value::Null));
        }

        let saved = self.local.take();
        self.local = Some(scope);
        let result = self.eval(&lambda.body, depth + 1);
        self.local = saved;
        result
    }

    /// The scope `define` and closure captures operate on: the active local
    /// scope if one exists, else the globals.
    fn active_scope_mut(&mut self) -> &mut HashMap<String, Value> {
        self.local.as_mut().unwrap_or(&mut self.globals)
    }

    fn active_scope(&self) -> &HashMap<String, Value> {
        self.local.as_ref().unwrap_or(&self.globals)
    }

    /// Emit one line to the output sink.
    pub(crate) fn emit(&mut self, text: &str) -> Result<(), Error> {
        writeln!(self.out, "{text}").map_err(|e| Error::eval(format!("write failed: {e}")))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate the `lambda` special form: a parameter list of identifiers and a
/// single body tree. The closure captures the active scope view as a
/// snapshot, plus the name of any `define` in progress for self-reference.
pub(crate) fn eval_lambda(
    interp: &mut Interpreter,
    args: &[SyntaxTree],
    _depth: usize,
) -> Result<Value, Error> {
    match args {
        [SyntaxTree::List(param_list), body] => {
            let mut params = Vec::new();
            for param in param_list {
                match param {
                    SyntaxTree::Atom(token) => match &token.kind {
                        TokenKind::Identifier(name) => params.push(name.clone()),
                        _ => {
                            return Err(Error::eval_at(
                                Some(token.line),
                                "lambda parameters must be identifiers",
                            ));
                        }
                    },
                    SyntaxTree::List(_) => {
                        return Err(Error::eval_at(
                            param.line(),
                            "lambda parameters must be identifiers",
                        ));
                    }
                }
            }

            Ok(Value::Lambda(Rc::new(Lambda {
                params,
                body: body.clone(),
                captured: interp.active_scope().clone(),
                self_name: interp.defining.clone(),
            })))
        }
        [first, _] => Err(Error::eval_at(
            first.line(),
            "lambda parameters must be a list",
        )),
        _ => Err(Error::eval(
            "lambda expects a parameter list and a single body expression",
        )),
    }
}

/// `define`: bind a new name, rejecting redefinition.
pub(crate) fn eval_define(
    interp: &mut Interpreter,
    args: &[SyntaxTree],
    depth: usize,
) -> Result<Value, Error> {
    define_binding(interp, args, false, depth)
}

/// `set`: identical to `define`, but redefinition is permitted by default.
pub(crate) fn eval_set(
    interp: &mut Interpreter,
    args: &[SyntaxTree],
    depth: usize,
) -> Result<Value, Error> {
    define_binding(interp, args, true, depth)
}

fn define_binding(
    interp: &mut Interpreter,
    args: &[SyntaxTree],
    default_allow: bool,
    depth: usize,
) -> Result<Value, Error> {
    let (target, value_expr, allow_redefinition) = match args {
        [target, value] => (target, value, default_allow),
        [target, value, flag] => match flag {
            SyntaxTree::Atom(token) => match token.kind {
                TokenKind::Boolean(b) => (target, value, b),
                _ => {
                    return Err(Error::eval_at(
                        Some(token.line),
                        "redefinition flag must be a boolean literal",
                    ));
                }
            },
            SyntaxTree::List(_) => {
                return Err(Error::eval_at(
                    flag.line(),
                    "redefinition flag must be a boolean literal",
                ));
            }
        },
        _ => return Err(Error::eval("define expects a name and a value")),
    };

    let SyntaxTree::Atom(token) = target else {
        return Err(Error::eval_at(
            target.line(),
            "define target must be an identifier",
        ));
    };
    let name = match &token.kind {
        TokenKind::Identifier(name) | TokenKind::Symbol(name) => name.clone(),
        other => {
            return Err(Error::eval_at(
                Some(token.line),
                format!("define target must be an identifier, found {other:?}"),
            ));
        }
    };

    if Builtin::from_name(&name).is_some() {
        return Err(Error::eval_at(
            Some(token.line),
            format!("{name} is a reserved name"),
        ));
    }
    if interp.active_scope().contains_key(&name) && !allow_redefinition {
        return Err(Error::eval_at(
            Some(token.line),
            format!("{name} is already defined, use 'set' if redefinition is intentional"),
        ));
    }
    if let Some(current) = &interp.defining {
        return Err(Error::eval_at(
            Some(token.line),
            format!("nested defines are not permitted, already defining {current}"),
        ));
    }

    interp.defining = Some(name.clone());
    let value = interp.eval(value_expr, depth + 1);
    // Cleared on every exit path so a failed define never wedges the marker.
    interp.defining = None;
    let value = value?;

    interp.active_scope_mut().insert(name, value);
    Ok(Value::Null)
}

/// `if`: evaluate the condition; truthy takes the then-branch, otherwise the
/// else-branch if present, else null.
pub(crate) fn eval_if(
    interp: &mut Interpreter,
    args: &[SyntaxTree],
    depth: usize,
) -> Result<Value, Error> {
    let (condition, then_branch, else_branch) = match args {
        [condition, then_branch] => (condition, then_branch, None),
        [condition, then_branch, else_branch] => (condition, then_branch, Some(else_branch)),
        _ => {
            return Err(Error::eval(
                "if expects a condition, a then-branch, and an optional else-branch",
            ));
        }
    };

    if interp.eval(condition, depth + 1)?.is_truthy() {
        interp.eval(then_branch, depth + 1)
    } else {
        match else_branch {
            Some(branch) => interp.eval(branch, depth + 1),
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use crate::lexer::Tokenizer;
    use crate::parser;
    use crate::source::TextSource;
    use std::cell::RefCell;

    /// An output sink the test can read back after the interpreter is done.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_interpreter() -> (Interpreter, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let interp = Interpreter::with_output(Box::new(buffer.clone()));
        (interp, buffer)
    }

    /// Evaluate every top-level form of a program, returning the last value.
    fn run_program(interp: &mut Interpreter, input: &str) -> Result<Value, Error> {
        let mut tokenizer = Tokenizer::new(TextSource::new(input));
        let mut last = Value::Null;
        while tokenizer.peek()?.is_some() {
            let tree = parser::read(&mut tokenizer)?;
            last = interp.execute(&tree)?;
        }
        Ok(last)
    }

    /// Test result variants for the data-driven evaluator tests.
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Value),
        SpecificError(&'static str),
    }
    use TestResult::*;

    fn success<T: Into<Value>>(value: T) -> TestResult {
        EvalResult(val(value))
    }

    /// Each environment is a fresh interpreter whose test cases share state.
    fn run_tests_in_environment(test_environments: Vec<Vec<(&str, TestResult)>>) {
        for (env_idx, test_cases) in test_environments.iter().enumerate() {
            let (mut interp, _buffer) = test_interpreter();

            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
                match (run_program(&mut interp, input), expected) {
                    (Ok(actual), EvalResult(expected_val)) => {
                        assert_eq!(&actual, expected_val, "{test_id}: value mismatch");
                    }
                    (Err(err), SpecificError(expected_text)) => {
                        let message = format!("{err}");
                        assert!(
                            message.contains(expected_text),
                            "{test_id}: error should contain '{expected_text}', got: {message}"
                        );
                    }
                    (Ok(actual), SpecificError(expected_text)) => {
                        panic!(
                            "{test_id}: expected error containing '{expected_text}', got {actual:?}"
                        );
                    }
                    (Err(err), EvalResult(expected_val)) => {
                        panic!("{test_id}: expected {expected_val:?}, got error {err}");
                    }
                }
            }
        }
    }

    /// Independent single-expression tests, each in a fresh interpreter.
    fn run_comprehensive_tests(test_cases: Vec<(&'static str, TestResult)>) {
        run_tests_in_environment(test_cases.into_iter().map(|case| vec![case]).collect());
    }

    #[test]
    fn test_literals_and_arithmetic() {
        let test_cases = vec![
            // Self-evaluating forms
            ("42", success(42)),
            ("-2.5", success(-2.5)),
            ("#t", success(true)),
            ("#f", success(false)),
            ("\"hello\"", success("hello")),
            ("\"\"", success("")),
            // Addition folds from 0
            ("(+)", success(0)),
            ("(+ 1 2 3)", success(6)),
            ("(+ 0.5 0.25)", success(0.75)),
            // Subtraction: unary negate, else left-fold from the first
            ("(- 10)", success(-10)),
            ("(- 10 3 2)", success(5)),
            ("(-)", SpecificError("at least one numeric argument")),
            // Multiplication folds from 1
            ("(*)", success(1)),
            ("(* 2 3 4)", success(24)),
            // Division folds from an accumulator of 1 over all arguments
            ("(/)", success(1)),
            ("(/ 2)", success(0.5)),
            ("(/ 10 2)", success(1.0 / 10.0 / 2.0)),
            // Nesting
            ("(+ (* 2 3) (- 8 2))", success(12)),
            // Type errors
            ("(+ 1 \"x\")", SpecificError("'+' expects numeric arguments")),
            ("(* #t 2)", SpecificError("'*' expects numeric arguments")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_equality_and_conditionals() {
        let test_cases = vec![
            // `=` is true with no args, else all args loosely equal the first
            ("(=)", success(true)),
            ("(= 1)", success(true)),
            ("(= 1 1 1)", success(true)),
            ("(= 1 2)", success(false)),
            ("(= 1 \"1\" #t)", success(true)),
            ("(= \"a\" \"a\")", success(true)),
            ("(= \"a\" \"b\")", success(false)),
            // The empty string coerces to zero, as the reference runtime's
            // loose comparison does
            ("(= \"\" 0)", success(true)),
            ("(= 0 \"  \" #f)", success(true)),
            ("(= \"\" 1)", success(false)),
            // `if` with truthiness
            ("(if #t 1 2)", success(1)),
            ("(if #f 1 2)", success(2)),
            ("(if #f 1)", EvalResult(Value::Null)),
            ("(if 0 1 2)", success(2)),
            ("(if \"\" 1 2)", success(2)),
            ("(if \"x\" 1 2)", success(1)),
            ("(if (= 1 1) \"yes\" \"no\")", success("yes")),
            // Only the taken branch is evaluated
            ("(if #t 1 (undefined-name))", success(1)),
            ("(if #f (undefined-name) 2)", success(2)),
            // Shape errors
            ("(if #t)", SpecificError("if expects a condition")),
            ("(if #t 1 2 3)", SpecificError("if expects a condition")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_block_and_write() {
        let test_cases = vec![
            ("(block 1 2 3)", success(3)),
            ("(block)", EvalResult(Value::Null)),
            ("(block (+ 1 1))", success(2)),
        ];
        run_comprehensive_tests(test_cases);

        let (mut interp, buffer) = test_interpreter();
        let result = run_program(
            &mut interp,
            "(write \"2 + 3 = \" (+ 2 3))\n(write #t)\n(write)",
        )
        .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(buffer.contents(), "2 + 3 = 5\n#t\n\n");
    }

    #[test]
    fn test_define_and_set() {
        run_tests_in_environment(vec![
            vec![
                ("(define x 5)", EvalResult(Value::Null)),
                ("(+ x 1)", success(6)),
                ("(define x 6)", SpecificError("already defined")),
                ("(set x 6)", EvalResult(Value::Null)),
                ("x", success(6)),
                // Explicit redefinition flag on define itself
                ("(define x 7 #t)", EvalResult(Value::Null)),
                ("x", success(7)),
                // set may also create a fresh binding
                ("(set y 1)", EvalResult(Value::Null)),
                ("y", success(1)),
            ],
            vec![
                // `$` is define
                ("($ z 3)", EvalResult(Value::Null)),
                ("z", success(3)),
                // Symbols are valid define targets
                ("(define % 5)", EvalResult(Value::Null)),
                ("(% )", SpecificError("expected function")),
                ("%", success(5)),
            ],
            vec![
                // A failed define clears the in-progress marker
                ("(define a (define b 1))", SpecificError("nested defines")),
                ("(define c 1)", EvalResult(Value::Null)),
                ("c", success(1)),
            ],
            vec![
                // Pre-seeded globals from the reference runtime
                ("PI", success(std::f64::consts::PI)),
                ("E", success(std::f64::consts::E)),
                ("(define PI 3)", SpecificError("already defined")),
                ("(set PI 3)", EvalResult(Value::Null)),
                ("PI", success(3)),
            ],
        ]);
    }

    #[test]
    fn test_define_errors() {
        let test_cases = vec![
            ("(define + 1)", SpecificError("+ is a reserved name")),
            ("(define set 1)", SpecificError("reserved name")),
            ("(define \"x\" 1)", SpecificError("must be an identifier")),
            ("(define 1 2)", SpecificError("must be an identifier")),
            ("(define (x) 1)", SpecificError("must be an identifier")),
            ("(define x)", SpecificError("define expects a name and a value")),
            ("(define x 1 2)", SpecificError("boolean literal")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_lambdas_and_closures() {
        run_tests_in_environment(vec![
            vec![
                // Direct invocation, aliases included
                ("((lambda (n) (* n 2)) 21)", success(42)),
                ("((\\ (n) (+ n 1)) 1)", success(2)),
                ("((λ () 7))", success(7)),
                // Missing arguments bind null, extras are ignored
                ("((lambda (a b) b) 1)", EvalResult(Value::Null)),
                ("((lambda (a) a) 1 2)", success(1)),
                // Parameters shadow globals inside the call only
                ("(define x 1)", EvalResult(Value::Null)),
                ("((lambda (x) (+ x 1)) 10)", success(11)),
                ("x", success(1)),
            ],
            vec![
                // Captured snapshot: the inner lambda sees the outer call's
                // locals at creation time
                ("(define make (lambda (n) (lambda () n)))", EvalResult(Value::Null)),
                ("(define five (make 5))", EvalResult(Value::Null)),
                ("(five)", success(5)),
            ],
            vec![
                // Self-reference through the defining marker
                (
                    "(define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))",
                    EvalResult(Value::Null),
                ),
                ("(fact 5)", success(120)),
                ("(fact 0)", success(1)),
            ],
            vec![
                // A local miss falls through to globals, even for names
                // defined after the closure was created
                ("(define f (lambda () late))", EvalResult(Value::Null)),
                ("(define late 2)", EvalResult(Value::Null)),
                ("(f)", success(2)),
            ],
            vec![
                // Functions are first-class: builtins flow through `if`
                ("((if #t + *) 2 3)", success(5)),
                ("((if #f + *) 2 3)", success(6)),
                // ... and lambdas pass as arguments
                ("(define twice (lambda (f x) (f (f x))))", EvalResult(Value::Null)),
                ("(twice (lambda (n) (* n 3)) 2)", success(18)),
            ],
        ]);
    }

    #[test]
    fn test_lambda_shape_errors() {
        let test_cases = vec![
            ("(lambda x 1)", SpecificError("parameters must be a list")),
            ("(lambda (1) x)", SpecificError("parameters must be identifiers")),
            ("(lambda ((a)) x)", SpecificError("parameters must be identifiers")),
            ("(lambda (+) x)", SpecificError("parameters must be identifiers")),
            ("(lambda (a))", SpecificError("parameter list and a single body")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_evaluation_errors() {
        let test_cases = vec![
            ("()", SpecificError("unexpected empty statement")),
            ("(1 2)", SpecificError("expected function")),
            ("(\"no\" 1)", SpecificError("expected function")),
            ("nowhere", SpecificError("Unknown symbol or identifier 'nowhere'")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_runaway_recursion_is_an_error() {
        let (mut interp, _buffer) = test_interpreter();
        let err = run_program(
            &mut interp,
            "(define loop (lambda (n) (loop n)))\n(loop 1)",
        )
        .unwrap_err();
        let message = format!("{err}");
        assert!(
            message.contains("depth limit"),
            "expected a depth limit error, got: {message}"
        );
    }

    #[test]
    fn test_interpreters_are_independent() {
        let (mut first, _) = test_interpreter();
        let (mut second, _) = test_interpreter();

        run_program(&mut first, "(define x 1)").unwrap();
        let err = run_program(&mut second, "x").unwrap_err();
        assert!(matches!(err, Error::UnboundVariable { .. }));
    }

    #[test]
    fn test_error_lines() {
        let (mut interp, _buffer) = test_interpreter();
        let err = run_program(&mut interp, "(block\n  (1 2))").unwrap_err();
        assert_eq!(
            err,
            Error::EvalError {
                message: "expected function, got 1".to_owned(),
                line: Some(1),
            }
        );

        let err = run_program(&mut interp, "\n\nmissing").unwrap_err();
        assert_eq!(
            err,
            Error::UnboundVariable {
                name: "missing".to_owned(),
                line: 2,
            }
        );
    }
}
