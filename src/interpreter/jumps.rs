//! Non-local control transfer: `return`, `break`, `continue`, `raise` and `try`
//!
//! `break`/`continue`/`return` only set [`ControlFlow`]; the enclosing loop or
//! frame consumes the signal. Exceptions travel as `Err(RuntimeError)` and are
//! matched against `except` clauses by exception class.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::format::is_exception_class;
use crate::memory::heap::{HeapObject, Instance, Namespace};
use crate::memory::stack::FrameKind;
use crate::memory::value::{Address, Value};
use crate::parser::ast::{ExceptHandler, Expr, Stmt};

impl<'a> Interpreter<'a> {
    pub(crate) fn execute_return(&mut self, expr: Option<&Expr>) -> Result<(), RuntimeError> {
        let in_function = self
            .stack
            .current_frame()
            .is_some_and(|frame| frame.kind == FrameKind::Function);
        if !in_function {
            return Err(RuntimeError::InvalidControlFlow {
                message: "'return' outside function".to_string(),
                location: self.current_location,
            });
        }
        self.return_value = match expr {
            Some(expr) => self.evaluate_expr(expr)?,
            None => Value::None,
        };
        self.control_flow = ControlFlow::Return;
        Ok(())
    }

    /// `raise [expr]`; always produces the error to propagate
    pub(crate) fn execute_raise(&mut self, expr: Option<&Expr>) -> RuntimeError {
        let Some(expr) = expr else {
            return match self.handled.last() {
                Some(active) => active.clone(),
                None => RuntimeError::InvalidControlFlow {
                    message: "No active exception to reraise".to_string(),
                    location: self.current_location,
                },
            };
        };
        match self.evaluate_expr(expr) {
            Ok(value) => self.raise_value(value).unwrap_or_else(|err| err),
            Err(err) => err,
        }
    }

    /// Turn a raised value into the error that carries it
    fn raise_value(&mut self, value: Value) -> Result<RuntimeError, RuntimeError> {
        let is_class = value.address().is_some_and(|a| is_exception_class(&self.heap, a));
        let instance = if is_class {
            let class = value.address().unwrap_or_default();
            self.instantiate(class, Vec::new(), Vec::new())?
        } else {
            value
        };

        let class = instance
            .address()
            .and_then(|a| self.heap.instance(a))
            .map(|object| object.class)
            .filter(|&class| is_exception_class(&self.heap, class));
        let Some(class) = class else {
            return Ok(self.type_error("exceptions must derive from BaseException"));
        };

        let message = self.exception_message(&instance)?;
        Ok(RuntimeError::Raised {
            class,
            class_name: self.heap.class_name(class),
            instance,
            message,
            location: self.current_location,
        })
    }

    /// Class an error is an instance of
    pub(crate) fn error_class(&self, err: &RuntimeError) -> Option<Address> {
        match err {
            RuntimeError::Raised { class, .. } => Some(*class),
            other => self.exception_classes.get(other.kind_name()).copied(),
        }
    }

    /// Exception object bound by `except ... as name`
    fn exception_instance(&mut self, err: &RuntimeError) -> Value {
        if let RuntimeError::Raised { instance, .. } = err {
            return instance.clone();
        }
        let args = match err {
            RuntimeError::KeyNotFound { value, .. } => vec![value.clone()],
            other => vec![Value::str(&other.to_string())],
        };
        match self.error_class(err) {
            Some(class) => self.heap.alloc_value(HeapObject::Instance(Instance {
                class,
                attrs: Namespace::new(),
                args,
            })),
            None => Value::None,
        }
    }

    /// Whether `err` is caught by an `except` clause naming `spec`
    fn exception_matches(&self, err: &RuntimeError, spec: &Value) -> Result<bool, RuntimeError> {
        if let Value::Tuple(classes) = spec {
            for class in classes.iter() {
                if self.exception_matches(err, class)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        let handler_class = spec.address().filter(|&a| is_exception_class(&self.heap, a));
        let Some(handler_class) = handler_class else {
            return Err(self.type_error(
                "catching classes that do not inherit from BaseException is not allowed",
            ));
        };
        Ok(self
            .error_class(err)
            .is_some_and(|class| self.heap.is_subclass(class, handler_class)))
    }

    pub(crate) fn execute_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> Result<(), RuntimeError> {
        let outcome = match self.execute_block(body) {
            Ok(()) if self.control_flow == ControlFlow::Normal => self.execute_block(orelse),
            Ok(()) => Ok(()),
            Err(err) => self.handle_exception(err, handlers),
        };

        if finalbody.is_empty() {
            return outcome;
        }

        let pending_flow = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);
        let pending_value = std::mem::take(&mut self.return_value);
        self.execute_block(finalbody)?;
        if self.control_flow != ControlFlow::Normal {
            // A jump out of `finally` discards the pending exception or return
            return Ok(());
        }
        self.control_flow = pending_flow;
        self.return_value = pending_value;
        outcome
    }

    fn handle_exception(
        &mut self,
        err: RuntimeError,
        handlers: &[ExceptHandler],
    ) -> Result<(), RuntimeError> {
        for handler in handlers {
            self.current_location = handler.location;
            self.mark_line(handler.location.line, false);

            let matched = match &handler.class {
                None => true,
                Some(expr) => {
                    let spec = self.evaluate_expr(expr)?;
                    self.exception_matches(&err, &spec)?
                }
            };
            if !matched {
                continue;
            }

            if let Some(name) = &handler.binding {
                let instance = self.exception_instance(&err);
                self.assign_name(name, instance)?;
            }
            self.handled.push(err);
            let result = self.execute_block(&handler.body);
            self.handled.pop();
            if let Some(name) = &handler.binding {
                // The handler may already have deleted it
                let _ = self.delete_name(name);
            }
            return result;
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn run(source: &str) -> (Interpreter<'static>, Result<(), RuntimeError>) {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("program parses");
        let mut interp = Interpreter::new();
        let result = interp.run(&program);
        (interp, result)
    }

    #[test]
    fn test_except_matches_subclasses() {
        let (interp, result) = run("try:\n    [][1]\nexcept LookupError as e:\n    msg = str(e)\n");
        assert!(result.is_ok());
        assert!(matches!(
            interp.global("msg"),
            Some(Value::Str(s)) if &*s == "list index out of range"
        ));
        assert!(interp.global("e").is_none());
    }

    #[test]
    fn test_user_exception_class_and_reraise() {
        let source = "class Boom(Exception):\n    pass\ntry:\n    try:\n        raise Boom('bad')\n    except Boom:\n        raise\nexcept Exception as e:\n    caught = e.args[0]\n";
        let (interp, result) = run(source);
        assert!(result.is_ok());
        assert!(matches!(interp.global("caught"), Some(Value::Str(s)) if &*s == "bad"));
    }

    #[test]
    fn test_uncaught_error_keeps_message() {
        let (_, result) = run("d = {}\nd['missing']\n");
        let err = result.expect_err("KeyError escapes");
        assert_eq!(err.kind_name(), "KeyError");
        assert_eq!(err.to_string(), "'missing'");
    }

    #[test]
    fn test_finally_runs_and_return_overrides() {
        let source = "log = []\ndef f():\n    try:\n        return 1\n    finally:\n        log.append('done')\nr = f()\n";
        let (interp, result) = run(source);
        assert!(result.is_ok());
        assert!(matches!(interp.global("r"), Some(Value::Int(1))));

        let source = "def g():\n    try:\n        1 / 0\n    finally:\n        return 2\nr = g()\n";
        let (interp, result) = run(source);
        assert!(result.is_ok());
        assert!(matches!(interp.global("r"), Some(Value::Int(2))));
    }

    #[test]
    fn test_raise_non_exception() {
        let (_, result) = run("raise 5\n");
        let err = result.expect_err("fails");
        assert_eq!(err.to_string(), "exceptions must derive from BaseException");
        let (_, result) = run("raise\n");
        assert_eq!(result.expect_err("fails").to_string(), "No active exception to reraise");
    }
}
