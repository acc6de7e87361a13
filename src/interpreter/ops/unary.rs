//! Unary operator evaluation

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::UnOp;

impl<'a> Interpreter<'a> {
    pub(crate) fn unary_op(&mut self, op: UnOp, operand: Value) -> Result<Value, RuntimeError> {
        match op {
            UnOp::Not => Ok(Value::Bool(!self.truthy(&operand)?)),
            UnOp::Neg => match operand {
                Value::Float(x) => Ok(Value::Float(-x)),
                ref v if v.as_int().is_some() => {
                    let n = v.as_int().unwrap_or(0);
                    n.checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| RuntimeError::overflow(self.current_location))
                }
                other => self.unary_special(op, "__neg__", other),
            },
            UnOp::Pos => match operand {
                Value::Float(x) => Ok(Value::Float(x)),
                ref v if v.as_int().is_some() => Ok(Value::Int(v.as_int().unwrap_or(0))),
                other => self.unary_special(op, "__pos__", other),
            },
            UnOp::Invert => match operand.as_int() {
                Some(n) => Ok(Value::Int(!n)),
                None => self.unary_special(op, "__invert__", operand),
            },
        }
    }

    fn unary_special(
        &mut self,
        op: UnOp,
        method: &str,
        operand: Value,
    ) -> Result<Value, RuntimeError> {
        if let Some(result) = self.call_special(&operand, method, vec![])? {
            return Ok(result);
        }
        let symbol = match op {
            UnOp::Neg => "-",
            UnOp::Pos => "+",
            UnOp::Invert => "~",
            UnOp::Not => "not",
        };
        Err(self.type_error(format!(
            "bad operand type for unary {}: '{}'",
            symbol,
            self.heap.type_name(&operand)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.unary_op(UnOp::Neg, Value::Int(5)), Ok(Value::Int(-5))));
        assert!(matches!(interp.unary_op(UnOp::Neg, Value::Bool(true)), Ok(Value::Int(-1))));
        assert!(matches!(interp.unary_op(UnOp::Invert, Value::Int(0)), Ok(Value::Int(-1))));
        assert!(interp.unary_op(UnOp::Neg, Value::Int(i64::MIN)).is_err());
    }

    #[test]
    fn test_bad_operand() {
        let mut interp = Interpreter::new();
        let err = interp.unary_op(UnOp::Neg, Value::str("a")).expect_err("fails");
        assert_eq!(err.to_string(), "bad operand type for unary -: 'str'");
        assert!(matches!(interp.unary_op(UnOp::Not, Value::str("")), Ok(Value::Bool(true))));
    }
}
