//! Statement execution implementation
//!
//! This module handles the execution of all statement types, including:
//!
//! - Expression statements, assignments and augmented assignments
//! - `del`, `global`, `nonlocal`, `assert` and imports
//! - Control flow (if/elif/else, while, for, try)
//! - Function and class definitions
//!
//! # Implementation
//!
//! All statement execution methods are implemented as `pub(crate)` methods
//! on the [`Interpreter`] struct, allowing them to access and modify the
//! interpreter's state (stack, heap, output, etc.).
//!
//! # Line events
//!
//! Every statement reports its first line before it runs. Statements sharing
//! a line with the previously reported one stay silent.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Class, HeapObject, Namespace, Scope};
use crate::memory::stack::{FrameKind, StackFrame};
use crate::memory::value::{Address, Value};
use crate::parser::ast::*;
use std::rc::Rc;

impl<'a> Interpreter<'a> {
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        self.current_location = stmt.location;
        match &stmt.kind {
            StmtKind::If { test, .. } => self.mark_condition_line(stmt.line(), test),
            _ => self.mark_line(stmt.line(), false),
        }

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.evaluate_expr(expr)?;
                Ok(())
            }
            StmtKind::Assign { targets, value } => {
                let value = self.evaluate_expr(value)?;
                for target in targets {
                    self.assign_target(target, value.clone())?;
                }
                Ok(())
            }
            StmtKind::AugAssign { target, op, value } => {
                self.execute_aug_assign(target, *op, value)
            }
            StmtKind::Pass => Ok(()),
            StmtKind::Break => {
                self.control_flow = ControlFlow::Break;
                Ok(())
            }
            StmtKind::Continue => {
                self.control_flow = ControlFlow::Continue;
                Ok(())
            }
            StmtKind::Return(expr) => self.execute_return(expr.as_ref()),
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(())
            }
            StmtKind::Global(names) => {
                if let Some(frame) = self.stack.current_frame_mut() {
                    if frame.kind != FrameKind::Module {
                        frame.globals.extend(names.iter().cloned());
                    }
                }
                Ok(())
            }
            StmtKind::Nonlocal(names) => {
                let Some(frame) = self.stack.current_frame_mut() else {
                    return Ok(());
                };
                if frame.kind == FrameKind::Module {
                    return Err(RuntimeError::InvalidControlFlow {
                        message: "nonlocal declaration not allowed at module level".to_string(),
                        location: stmt.location,
                    });
                }
                frame.nonlocals.extend(names.iter().cloned());
                Ok(())
            }
            StmtKind::Assert { test, message } => self.execute_assert(test, message.as_ref()),
            StmtKind::Raise(expr) => Err(self.execute_raise(expr.as_ref())),
            StmtKind::Import(aliases) => {
                for alias in aliases {
                    let module = self.import_module(&alias.name)?;
                    let bound = alias.alias.as_deref().unwrap_or(&alias.name);
                    self.assign_name(bound, Value::Ref(module))?;
                }
                Ok(())
            }
            StmtKind::ImportFrom { module, names } => {
                let module = Value::Ref(self.import_module(module)?);
                for alias in names {
                    let value = self.get_attribute(&module, &alias.name).map_err(|_| {
                        RuntimeError::ModuleNotFound {
                            name: alias.name.clone(),
                            location: stmt.location,
                        }
                    })?;
                    let bound = alias.alias.as_deref().unwrap_or(&alias.name);
                    self.assign_name(bound, value)?;
                }
                Ok(())
            }
            StmtKind::If { test, body, orelse } => {
                let condition = self.evaluate_expr(test)?;
                if self.truthy(&condition)? {
                    self.execute_block(body)
                } else {
                    self.execute_block(orelse)
                }
            }
            StmtKind::While { test, body, orelse } => {
                self.execute_while(test, body, orelse, stmt.location)
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => self.execute_for(target, iter, body, orelse, stmt.location),
            StmtKind::FunctionDef(def) => {
                let function = self.make_function(def)?;
                self.assign_name(&def.name, function)
            }
            StmtKind::ClassDef(def) => self.execute_class_def(def),
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.execute_try(body, handlers, orelse, finalbody),
        }
    }

    fn execute_aug_assign(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name) => {
                let current = self.lookup_name(name)?;
                let value = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, current, value)?;
                self.assign_name(name, result)
            }
            Expr::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                let current = self.get_attribute(&object, name)?;
                let value = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, current, value)?;
                self.set_attribute(&object, name, result)
            }
            Expr::Subscript { object, index } if !matches!(index.as_ref(), Expr::Slice { .. }) => {
                let object = self.evaluate_expr(object)?;
                let index = self.evaluate_expr(index)?;
                let current = self.get_item(&object, &index)?;
                let value = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, current, value)?;
                self.set_item(&object, &index, result)
            }
            _ => Err(RuntimeError::UnsupportedOperation {
                message: "illegal expression for augmented assignment".to_string(),
                location: self.current_location,
            }),
        }
    }

    fn execute_assert(&mut self, test: &Expr, message: Option<&Expr>) -> Result<(), RuntimeError> {
        let condition = self.evaluate_expr(test)?;
        if self.truthy(&condition)? {
            return Ok(());
        }
        let message = match message {
            Some(expr) => {
                let value = self.evaluate_expr(expr)?;
                self.str_of(&value)?
            }
            None => String::new(),
        };
        Err(RuntimeError::AssertionFailed {
            message,
            location: self.current_location,
        })
    }

    /// Run a class body in its own frame and build the class from what it bound
    fn execute_class_def(&mut self, def: &Rc<ClassDef>) -> Result<(), RuntimeError> {
        let mut bases = Vec::with_capacity(def.bases.len());
        for base in &def.bases {
            match self.evaluate_expr(base)? {
                Value::Builtin(Builtin::Object) => {}
                value => match value.address().filter(|&a| self.heap.class(a).is_some()) {
                    Some(class) => bases.push(class),
                    None => {
                        return Err(self.type_error(format!(
                            "class base must be a class, not '{}'",
                            self.heap.type_name(&value)
                        )))
                    }
                },
            }
        }

        let class = self.heap.alloc(HeapObject::Class(Class {
            name: def.name.clone(),
            bases: bases.clone(),
            mro: Vec::new(),
            attrs: Namespace::new(),
            builtin: false,
        }));
        let mro = self.heap.linearize(class, &bases);
        if let Some(HeapObject::Class(built)) = self.heap.get_mut(class) {
            built.mro = mro;
        }

        let closure = self.closure_for_definition();
        let attrs = self.run_class_body(class, closure, def)?;
        if let Some(HeapObject::Class(built)) = self.heap.get_mut(class) {
            built.attrs = attrs;
        }
        self.assign_name(&def.name, Value::Ref(class))
    }

    fn run_class_body(
        &mut self,
        class: Address,
        closure: Option<Address>,
        def: &ClassDef,
    ) -> Result<Namespace, RuntimeError> {
        let mut vars = Namespace::new();
        vars.set("__module__", Value::str("__main__"));
        vars.set("__qualname__", Value::str(&def.name));
        let locals = self.heap.alloc(HeapObject::Scope(Scope { vars, parent: closure }));

        let mut frame =
            StackFrame::new(def.name.clone(), FrameKind::Class, locals, def.location.line);
        frame.owner_class = Some(class);
        let result = self.run_frame(frame, &def.body);

        let attrs = self
            .heap
            .scope(locals)
            .map(|scope| scope.vars.clone())
            .unwrap_or_default();
        self.heap.free(locals);
        result.map(|_| attrs)
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

    fn int_global(interp: &Interpreter<'_>, name: &str) -> Option<i64> {
        interp.global(name).and_then(|v| v.as_int())
    }

    #[test]
    fn test_if_elif_else() {
        let source = "x = 5\nif x < 3:\n    y = 1\nelif x < 10:\n    y = 2\nelse:\n    y = 3\n";
        let (interp, result) = run(source);
        assert!(result.is_ok());
        assert_eq!(int_global(&interp, "y"), Some(2));
    }

    #[test]
    fn test_augmented_assignment_on_list_is_in_place() {
        let source = "a = [1]\nb = a\nb += [2]\nn = len(a)\nc = {'k': 1}\nc['k'] += 4\nv = c['k']\n";
        let (interp, result) = run(source);
        assert!(result.is_ok());
        assert_eq!(int_global(&interp, "n"), Some(2));
        assert_eq!(int_global(&interp, "v"), Some(5));
    }

    #[test]
    fn test_class_with_inheritance_and_super() {
        let source = "class Base:\n    def __init__(self, v):\n        self.v = v\n    def get(self):\n        return self.v\n\nclass Child(Base):\n    def __init__(self, v):\n        super().__init__(v * 2)\n\nr = Child(21).get()\n";
        let (interp, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(int_global(&interp, "r"), Some(42));
    }

    #[test]
    fn test_class_attributes_shared() {
        let source = "class Counter:\n    count = 0\n    def bump(self):\n        Counter.count += 1\nc = Counter()\nc.bump()\nc.bump()\nn = Counter.count\n";
        let (interp, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(int_global(&interp, "n"), Some(2));
    }

    #[test]
    fn test_while_else_and_break() {
        let source = "i = 0\nwhile i < 10:\n    i += 1\n    if i == 3:\n        break\nelse:\n    i = 100\n";
        let (interp, result) = run(source);
        assert!(result.is_ok());
        assert_eq!(int_global(&interp, "i"), Some(3));
    }

    #[test]
    fn test_assert_and_import() {
        let source = "import math\nfrom math import sqrt as root\nr = int(root(16)) + math.floor(2.5)\n";
        let (interp, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(int_global(&interp, "r"), Some(6));

        let (_, result) = run("assert 1 == 2, 'nope'\n");
        let err = result.expect_err("fails");
        assert_eq!(err.kind_name(), "AssertionError");
        assert_eq!(err.to_string(), "nope");

        let (_, result) = run("import os_like_module\n");
        assert_eq!(result.expect_err("fails").to_string(), "No module named 'os_like_module'");
    }
}
