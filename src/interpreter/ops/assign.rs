//! Assignment and deletion targets

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::Expr;

impl<'a> Interpreter<'a> {
    /// Bind `value` to an assignment target
    pub(crate) fn assign_target(
        &mut self,
        target: &Expr,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name) => self.assign_name(name, value),
            Expr::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                self.set_attribute(&object, name, value)
            }
            Expr::Subscript { object, index } => {
                let object = self.evaluate_expr(object)?;
                if let Expr::Slice { lower, upper, step } = index.as_ref() {
                    let bounds = self.slice_bounds(lower, upper, step)?;
                    return self.set_slice(&object, bounds, value);
                }
                let index = self.evaluate_expr(index)?;
                self.set_item(&object, &index, value)
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                let items = self.unpack(value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.assign_target(target, item)?;
                }
                Ok(())
            }
            _ => Err(RuntimeError::UnsupportedOperation {
                message: "cannot assign to expression".to_string(),
                location: self.current_location,
            }),
        }
    }

    /// Split an iterable into exactly `expected` values
    fn unpack(&mut self, value: Value, expected: usize) -> Result<Vec<Value>, RuntimeError> {
        let items = self.iterate(&value).map_err(|err| match err {
            RuntimeError::TypeError { .. } => self.type_error(format!(
                "cannot unpack non-iterable {} object",
                self.heap.type_name(&value)
            )),
            other => other,
        })?;
        if items.len() > expected {
            return Err(self.value_error(format!(
                "too many values to unpack (expected {})",
                expected
            )));
        }
        if items.len() < expected {
            return Err(self.value_error(format!(
                "not enough values to unpack (expected {}, got {})",
                expected,
                items.len()
            )));
        }
        Ok(items)
    }

    /// `del target`
    pub(crate) fn delete_target(&mut self, target: &Expr) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name) => self.delete_name(name),
            Expr::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                self.delete_attribute(&object, name)
            }
            Expr::Subscript { object, index } => {
                let object = self.evaluate_expr(object)?;
                if let Expr::Slice { lower, upper, step } = index.as_ref() {
                    let bounds = self.slice_bounds(lower, upper, step)?;
                    return self.del_slice(&object, bounds);
                }
                let index = self.evaluate_expr(index)?;
                self.del_item(&object, &index)
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(())
            }
            _ => Err(RuntimeError::UnsupportedOperation {
                message: "cannot delete expression".to_string(),
                location: self.current_location,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(names: &[&str]) -> Expr {
        Expr::Tuple(names.iter().map(|n| Expr::Name(n.to_string())).collect())
    }

    #[test]
    fn test_unpacking_binds_each_name() {
        let mut interp = Interpreter::new();
        let pair = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        interp.assign_target(&target(&["a", "b"]), pair).expect("unpacks");
        assert!(matches!(interp.global("b"), Some(Value::Int(2))));
    }

    #[test]
    fn test_unpacking_count_mismatch() {
        let mut interp = Interpreter::new();
        let pair = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        let err = interp.assign_target(&target(&["a", "b", "c"]), pair.clone()).expect_err("fails");
        assert_eq!(err.to_string(), "not enough values to unpack (expected 3, got 2)");

        let err = interp.assign_target(&target(&["a"]), pair).expect_err("fails");
        assert_eq!(err.to_string(), "too many values to unpack (expected 1)");

        let err = interp.assign_target(&target(&["a", "b"]), Value::Int(3)).expect_err("fails");
        assert_eq!(err.to_string(), "cannot unpack non-iterable int object");
    }
}
