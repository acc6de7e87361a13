//! Binary operator evaluation
//!
//! Arithmetic follows the scripting language's rules rather than Rust's:
//! `/` always produces a float, `//` and `%` round towards negative infinity,
//! and a negative integer exponent produces a float. Integer arithmetic is
//! 64-bit and reports overflow as `OverflowError` instead of wrapping.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::HeapObject;
use crate::memory::value::Value;
use crate::parser::ast::BinOp;

/// Dunder method implementing `op` and its reflected form
fn dunder_names(op: BinOp) -> (&'static str, &'static str) {
    match op {
        BinOp::Add => ("__add__", "__radd__"),
        BinOp::Sub => ("__sub__", "__rsub__"),
        BinOp::Mul => ("__mul__", "__rmul__"),
        BinOp::Div => ("__truediv__", "__rtruediv__"),
        BinOp::FloorDiv => ("__floordiv__", "__rfloordiv__"),
        BinOp::Mod => ("__mod__", "__rmod__"),
        BinOp::Pow => ("__pow__", "__rpow__"),
        BinOp::BitAnd => ("__and__", "__rand__"),
        BinOp::BitOr => ("__or__", "__ror__"),
        BinOp::BitXor => ("__xor__", "__rxor__"),
        BinOp::Shl => ("__lshift__", "__rlshift__"),
        BinOp::Shr => ("__rshift__", "__rrshift__"),
    }
}

/// Shape of a heap operand, extracted so no heap borrow is held across calls
enum Operand {
    List(Vec<Value>),
    Set,
    Dict,
    Instance,
    Other,
}

impl<'a> Interpreter<'a> {
    /// Evaluate `left op right`
    pub(crate) fn binary_op(
        &mut self,
        op: BinOp,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            return self.int_op(op, a, b);
        }
        if left.is_number() && right.is_number() {
            let (a, b) = (left.as_float().unwrap_or(0.0), right.as_float().unwrap_or(0.0));
            return self.float_op(op, a, b, &left, &right);
        }

        match (&left, &right, op) {
            (Value::Str(a), Value::Str(b), BinOp::Add) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                return Ok(Value::str(&joined));
            }
            (Value::Str(s), count, BinOp::Mul) | (count, Value::Str(s), BinOp::Mul)
                if count.as_int().is_some() =>
            {
                let n = usize::try_from(count.as_int().unwrap_or(0)).unwrap_or(0);
                return Ok(Value::str(&s.repeat(n)));
            }
            (Value::Str(template), args, BinOp::Mod) => {
                let template = template.to_string();
                return Ok(Value::str(&self.percent_format(&template, args)?));
            }
            (Value::Tuple(a), Value::Tuple(b), BinOp::Add) => {
                return Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()));
            }
            (Value::Tuple(items), count, BinOp::Mul) | (count, Value::Tuple(items), BinOp::Mul)
                if count.as_int().is_some() =>
            {
                let n = usize::try_from(count.as_int().unwrap_or(0)).unwrap_or(0);
                return Ok(Value::tuple(repeat_items(items, n)));
            }
            _ => {}
        }

        let left_shape = self.operand(&left);
        let right_shape = self.operand(&right);
        match (left_shape, right_shape, op) {
            (Operand::List(a), Operand::List(b), BinOp::Add) => {
                let mut joined = a;
                joined.extend(b);
                return Ok(self.new_list(joined));
            }
            (Operand::List(items), _, BinOp::Mul) if right.as_int().is_some() => {
                let n = usize::try_from(right.as_int().unwrap_or(0)).unwrap_or(0);
                let repeated = repeat_items(&items, n);
                return Ok(self.new_list(repeated));
            }
            (_, Operand::List(items), BinOp::Mul) if left.as_int().is_some() => {
                let n = usize::try_from(left.as_int().unwrap_or(0)).unwrap_or(0);
                let repeated = repeat_items(&items, n);
                return Ok(self.new_list(repeated));
            }
            (
                Operand::Set,
                Operand::Set,
                BinOp::BitOr | BinOp::BitAnd | BinOp::Sub | BinOp::BitXor,
            ) => {
                let method = match op {
                    BinOp::BitOr => "union",
                    BinOp::BitAnd => "intersection",
                    BinOp::Sub => "difference",
                    _ => "symmetric_difference",
                };
                return self.call_native_method(left, method, vec![right], vec![]);
            }
            (Operand::Dict, Operand::Dict, BinOp::BitOr) => {
                let merged = self.call_native_method(left, "copy", vec![], vec![])?;
                self.call_native_method(merged.clone(), "update", vec![right], vec![])?;
                return Ok(merged);
            }
            (Operand::Instance, _, _) | (_, Operand::Instance, _) => {
                let (method, reflected) = dunder_names(op);
                if let Some(result) = self.call_special(&left, method, vec![right.clone()])? {
                    return Ok(result);
                }
                if let Some(result) = self.call_special(&right, reflected, vec![left.clone()])? {
                    return Ok(result);
                }
            }
            _ => {}
        }

        Err(self.unsupported_operands(op, &left, &right))
    }

    /// `target op= value`: lists and sets update in place, everything else rebinds
    pub(crate) fn inplace_op(
        &mut self,
        op: BinOp,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        let (is_list, is_set) = match left.address().and_then(|a| self.heap.get(a)) {
            Some(HeapObject::List(_)) => (true, false),
            Some(HeapObject::Set(_)) => (false, true),
            _ => (false, false),
        };
        if is_list && op == BinOp::Add {
            self.call_native_method(left.clone(), "extend", vec![right], vec![])?;
            return Ok(left);
        }
        if is_set && matches!(op, BinOp::BitOr) && matches!(self.operand(&right), Operand::Set) {
            self.call_native_method(left.clone(), "update", vec![right], vec![])?;
            return Ok(left);
        }
        if self.heap.class_of(&left).is_some() {
            let method = match op {
                BinOp::Add => Some("__iadd__"),
                BinOp::Sub => Some("__isub__"),
                BinOp::Mul => Some("__imul__"),
                _ => None,
            };
            if let Some(method) = method {
                if let Some(result) = self.call_special(&left, method, vec![right.clone()])? {
                    return Ok(result);
                }
            }
        }
        self.binary_op(op, left, right)
    }

    fn operand(&self, value: &Value) -> Operand {
        match value.address().and_then(|a| self.heap.get(a)) {
            Some(HeapObject::List(items)) => Operand::List(items.clone()),
            Some(HeapObject::Set(_)) => Operand::Set,
            Some(HeapObject::Dict(_)) => Operand::Dict,
            Some(HeapObject::Instance(_)) => Operand::Instance,
            _ => Operand::Other,
        }
    }

    fn unsupported_operands(&self, op: BinOp, left: &Value, right: &Value) -> RuntimeError {
        let left_type = self.heap.type_name(left);
        let right_type = self.heap.type_name(right);
        let concatenates = matches!(left_type.as_str(), "str" | "list" | "tuple");
        if op == BinOp::Add && concatenates {
            return self.type_error(format!(
                "can only concatenate {} (not \"{}\") to {}",
                left_type, right_type, left_type
            ));
        }
        self.type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left_type,
            right_type
        ))
    }

    fn division_by_zero(&self, message: &str) -> RuntimeError {
        RuntimeError::DivisionByZero {
            message: message.to_string(),
            location: self.current_location,
        }
    }

    fn int_op(&self, op: BinOp, a: i64, b: i64) -> Result<Value, RuntimeError> {
        let overflow = || RuntimeError::overflow(self.current_location);
        let result = match op {
            BinOp::Add => a.checked_add(b).ok_or_else(overflow)?,
            BinOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
            BinOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
            BinOp::Div => {
                if b == 0 {
                    return Err(self.division_by_zero("division by zero"));
                }
                return Ok(Value::Float(a as f64 / b as f64));
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return Err(self.division_by_zero("integer division or modulo by zero"));
                }
                let q = a.checked_div(b).ok_or_else(overflow)?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            }
            BinOp::Mod => {
                if b == 0 {
                    return Err(self.division_by_zero("integer modulo by zero"));
                }
                let r = a.checked_rem(b).unwrap_or(0);
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            }
            BinOp::Pow => {
                if b < 0 {
                    if a == 0 {
                        return Err(
                            self.division_by_zero("0.0 cannot be raised to a negative power")
                        );
                    }
                    return Ok(Value::Float((a as f64).powf(b as f64)));
                }
                match a {
                    0 | 1 => {
                        if b == 0 {
                            1
                        } else {
                            a
                        }
                    }
                    -1 => {
                        if b % 2 == 0 {
                            1
                        } else {
                            -1
                        }
                    }
                    _ => {
                        let exp = u32::try_from(b).map_err(|_| overflow())?;
                        a.checked_pow(exp).ok_or_else(overflow)?
                    }
                }
            }
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            BinOp::Shl => {
                if b < 0 {
                    return Err(self.value_error("negative shift count"));
                }
                if a == 0 {
                    0
                } else if b >= 64 {
                    return Err(overflow());
                } else {
                    let shifted = a << b;
                    if shifted >> b != a {
                        return Err(overflow());
                    }
                    shifted
                }
            }
            BinOp::Shr => {
                if b < 0 {
                    return Err(self.value_error("negative shift count"));
                }
                if b >= 64 {
                    if a < 0 {
                        -1
                    } else {
                        0
                    }
                } else {
                    a >> b
                }
            }
        };
        Ok(Value::Int(result))
    }

    fn float_op(
        &self,
        op: BinOp,
        a: f64,
        b: f64,
        left: &Value,
        right: &Value,
    ) -> Result<Value, RuntimeError> {
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => {
                if b == 0.0 {
                    return Err(self.division_by_zero("float division by zero"));
                }
                a / b
            }
            BinOp::FloorDiv => {
                if b == 0.0 {
                    return Err(self.division_by_zero("float floor division by zero"));
                }
                (a / b).floor()
            }
            BinOp::Mod => {
                if b == 0.0 {
                    return Err(self.division_by_zero("float modulo"));
                }
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    r + b
                } else {
                    r
                }
            }
            BinOp::Pow => {
                if a == 0.0 && b < 0.0 {
                    return Err(self.division_by_zero("0.0 cannot be raised to a negative power"));
                }
                if a < 0.0 && b.fract() != 0.0 {
                    return Err(RuntimeError::UnsupportedOperation {
                        message: "complex numbers are not supported".to_string(),
                        location: self.current_location,
                    });
                }
                let value = a.powf(b);
                if value.is_infinite() && a.is_finite() && b.is_finite() {
                    return Err(RuntimeError::IntegerOverflow {
                        message: "(34, 'Numerical result out of range')".to_string(),
                        location: self.current_location,
                    });
                }
                value
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
                return Err(self.unsupported_operands(op, left, right));
            }
        };
        Ok(Value::Float(result))
    }
}

fn repeat_items(items: &[Value], n: usize) -> Vec<Value> {
    let mut repeated = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        repeated.extend(items.iter().cloned());
    }
    repeated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: BinOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
        let mut interp = Interpreter::new();
        interp.binary_op(op, left, right)
    }

    #[test]
    fn test_floor_division_and_modulo_round_down() {
        assert!(matches!(eval(BinOp::FloorDiv, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-4))));
        assert!(matches!(eval(BinOp::Mod, Value::Int(-7), Value::Int(2)), Ok(Value::Int(1))));
        assert!(matches!(eval(BinOp::Mod, Value::Int(7), Value::Int(-2)), Ok(Value::Int(-1))));
        assert!(matches!(
            eval(BinOp::Div, Value::Int(7), Value::Int(2)),
            Ok(Value::Float(x)) if x == 3.5
        ));
    }

    #[test]
    fn test_zero_division_messages() {
        let err = eval(BinOp::Div, Value::Int(1), Value::Int(0)).expect_err("fails");
        assert_eq!(err.to_string(), "division by zero");
        assert_eq!(err.kind_name(), "ZeroDivisionError");

        let err = eval(BinOp::Mod, Value::Int(1), Value::Int(0)).expect_err("fails");
        assert_eq!(err.to_string(), "integer modulo by zero");

        let err = eval(BinOp::Div, Value::Float(1.0), Value::Int(0)).expect_err("fails");
        assert_eq!(err.to_string(), "float division by zero");
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = eval(BinOp::Mul, Value::Int(i64::MAX), Value::Int(2)).expect_err("fails");
        assert_eq!(err.kind_name(), "OverflowError");
        assert!(matches!(eval(BinOp::Pow, Value::Int(2), Value::Int(10)), Ok(Value::Int(1024))));
        assert!(matches!(
            eval(BinOp::Pow, Value::Int(2), Value::Int(-1)),
            Ok(Value::Float(x)) if x == 0.5
        ));
    }

    #[test]
    fn test_sequence_operators() {
        assert!(matches!(
            eval(BinOp::Add, Value::str("ab"), Value::str("cd")),
            Ok(Value::Str(s)) if &*s == "abcd"
        ));
        assert!(matches!(
            eval(BinOp::Mul, Value::Int(3), Value::str("x")),
            Ok(Value::Str(s)) if &*s == "xxx"
        ));
        let err = eval(BinOp::Add, Value::str("a"), Value::Int(1)).expect_err("fails");
        assert_eq!(err.to_string(), "can only concatenate str (not \"int\") to str");
        let err = eval(BinOp::Sub, Value::Int(1), Value::str("a")).expect_err("fails");
        assert_eq!(err.to_string(), "unsupported operand type(s) for -: 'int' and 'str'");
    }
}
