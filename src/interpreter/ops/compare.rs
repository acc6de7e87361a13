//! Comparison operators: equality, ordering, identity and membership

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::HeapObject;
use crate::memory::value::{range_len, Value};
use crate::parser::ast::CmpOp;
use std::cmp::Ordering;
use std::rc::Rc;

/// Contents of a value relevant to comparison, copied out of the heap
enum Compared {
    Sequence(Vec<Value>),
    Mapping(Vec<(Value, Value)>),
    Set(Vec<Value>),
    Instance,
    Scalar,
}

impl<'a> Interpreter<'a> {
    /// Evaluate `left op right` for a single comparison operator
    pub(crate) fn compare(
        &mut self,
        op: CmpOp,
        left: &Value,
        right: &Value,
    ) -> Result<bool, RuntimeError> {
        match op {
            CmpOp::Eq => self.equals(left, right),
            CmpOp::Ne => {
                if let Some(result) = self.call_special(left, "__ne__", vec![right.clone()])? {
                    return self.truthy(&result);
                }
                Ok(!self.equals(left, right)?)
            }
            CmpOp::Is => Ok(self.identical(left, right)),
            CmpOp::IsNot => Ok(!self.identical(left, right)),
            CmpOp::In => self.contains(right, left),
            CmpOp::NotIn => Ok(!self.contains(right, left)?),
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => self.order(op, left, right),
        }
    }

    /// `left < right`
    pub(crate) fn less_than(&mut self, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
        self.order(CmpOp::Lt, left, right)
    }

    /// `left is right`
    pub(crate) fn identical(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (
                Value::Range { start, stop, step },
                Value::Range {
                    start: s2,
                    stop: e2,
                    step: t2,
                },
            ) => start == s2 && stop == e2 && step == t2,
            _ => false,
        }
    }

    fn compared(&self, value: &Value) -> Compared {
        match value {
            Value::Tuple(items) => Compared::Sequence(items.to_vec()),
            Value::Ref(addr) => match self.heap.get(*addr) {
                Some(HeapObject::List(items)) => Compared::Sequence(items.clone()),
                Some(HeapObject::Dict(table)) => {
                    Compared::Mapping(table.entries().cloned().collect())
                }
                Some(HeapObject::Set(table)) => Compared::Set(table.keys()),
                Some(HeapObject::Instance(_)) => Compared::Instance,
                _ => Compared::Scalar,
            },
            _ => Compared::Scalar,
        }
    }

    /// `left == right`, consulting `__eq__` on instances
    pub(crate) fn equals(&mut self, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            return Ok(a == b);
        }
        if left.is_number() && right.is_number() {
            return Ok(left.as_float() == right.as_float());
        }
        if let (Value::Ref(a), Value::Ref(b)) = (left, right) {
            if a == b && self.heap.instance(*a).is_none() {
                return Ok(true);
            }
        }

        match (self.compared(left), self.compared(right)) {
            (Compared::Instance, _) | (_, Compared::Instance) => {
                if let Some(result) = self.call_special(left, "__eq__", vec![right.clone()])? {
                    return self.truthy(&result);
                }
                if let Some(result) = self.call_special(right, "__eq__", vec![left.clone()])? {
                    return self.truthy(&result);
                }
                Ok(self.identical(left, right))
            }
            (Compared::Sequence(a), Compared::Sequence(b)) => {
                // A list never equals a tuple
                let same_kind = matches!(left, Value::Tuple(_)) == matches!(right, Value::Tuple(_));
                if !same_kind || a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.equals(x, y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Compared::Mapping(a), Compared::Mapping(_)) => {
                let Some(other) = right.address() else {
                    return Ok(false);
                };
                if Some(a.len()) != self.table_len(other) {
                    return Ok(false);
                }
                for (key, value) in &a {
                    let hash = self.hash_of(key)?;
                    let counterpart = match self.heap.get(other) {
                        Some(HeapObject::Dict(table)) => table.get(&hash).cloned(),
                        _ => None,
                    };
                    match counterpart {
                        Some(v) if self.equals(value, &v)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            (Compared::Set(a), Compared::Set(b)) => {
                Ok(a.len() == b.len() && self.set_contains_all(right, &a)?)
            }
            (Compared::Scalar, Compared::Scalar) => Ok(match (left, right) {
                (
                    Value::Range { start, stop, step },
                    Value::Range { start: s2, stop: e2, step: t2 },
                ) => {
                    let (n1, n2) = (range_len(*start, *stop, *step), range_len(*s2, *e2, *t2));
                    n1 == n2 && (n1 == 0 || (start == s2 && (n1 == 1 || step == t2)))
                }
                _ => self.identical(left, right),
            }),
            _ => Ok(false),
        }
    }

    fn table_len(&self, addr: usize) -> Option<usize> {
        match self.heap.get(addr) {
            Some(HeapObject::Dict(table) | HeapObject::Set(table)) => Some(table.len()),
            _ => None,
        }
    }

    fn set_contains_all(&self, set: &Value, items: &[Value]) -> Result<bool, RuntimeError> {
        let Some(HeapObject::Set(table)) = set.address().and_then(|a| self.heap.get(a)) else {
            return Ok(false);
        };
        for item in items {
            if !table.contains(&self.hash_of(item)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn order(&mut self, op: CmpOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
        let decide = |ordering: Ordering| match op {
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        };

        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            return Ok(decide(a.cmp(&b)));
        }
        if left.is_number() && right.is_number() {
            let (a, b) = (left.as_float().unwrap_or(0.0), right.as_float().unwrap_or(0.0));
            return Ok(match a.partial_cmp(&b) {
                Some(ordering) => decide(ordering),
                None => false,
            });
        }
        if let (Value::Str(a), Value::Str(b)) = (left, right) {
            return Ok(decide(a.cmp(b)));
        }

        let same_sequence_kind =
            matches!(left, Value::Tuple(_)) == matches!(right, Value::Tuple(_));
        match (self.compared(left), self.compared(right)) {
            (Compared::Sequence(a), Compared::Sequence(b)) if same_sequence_kind => {
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.equals(x, y)? {
                        return self.order(op, x, y);
                    }
                }
                Ok(decide(a.len().cmp(&b.len())))
            }
            (Compared::Set(a), Compared::Set(b)) => {
                let subset = self.set_contains_all(right, &a)?;
                let superset = self.set_contains_all(left, &b)?;
                Ok(match op {
                    CmpOp::Lt => subset && a.len() < b.len(),
                    CmpOp::Le => subset,
                    CmpOp::Gt => superset && a.len() > b.len(),
                    _ => superset,
                })
            }
            (Compared::Instance, _) | (_, Compared::Instance) => {
                let (method, reflected) = match op {
                    CmpOp::Lt => ("__lt__", "__gt__"),
                    CmpOp::Le => ("__le__", "__ge__"),
                    CmpOp::Gt => ("__gt__", "__lt__"),
                    _ => ("__ge__", "__le__"),
                };
                if let Some(result) = self.call_special(left, method, vec![right.clone()])? {
                    return self.truthy(&result);
                }
                if let Some(result) = self.call_special(right, reflected, vec![left.clone()])? {
                    return self.truthy(&result);
                }
                Err(self.not_orderable(op, left, right))
            }
            _ => Err(self.not_orderable(op, left, right)),
        }
    }

    fn not_orderable(&self, op: CmpOp, left: &Value, right: &Value) -> RuntimeError {
        self.type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            self.heap.type_name(left),
            self.heap.type_name(right)
        ))
    }

    /// `item in container`
    pub(crate) fn contains(
        &mut self,
        container: &Value,
        item: &Value,
    ) -> Result<bool, RuntimeError> {
        match container {
            Value::Str(haystack) => match item {
                Value::Str(needle) => Ok(haystack.contains(&**needle)),
                other => Err(self.type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    self.heap.type_name(other)
                ))),
            },
            Value::Range { start, stop, step } => Ok(match item.as_int() {
                Some(n) => {
                    let in_bounds = if *step > 0 {
                        n >= *start && n < *stop
                    } else {
                        n <= *start && n > *stop
                    };
                    in_bounds && (n - start) % step == 0
                }
                None => false,
            }),
            _ => match self.compared(container) {
                Compared::Sequence(items) => {
                    for candidate in &items {
                        if self.identical(candidate, item) || self.equals(candidate, item)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Compared::Mapping(_) | Compared::Set(_) => {
                    let hash = self.hash_of(item)?;
                    Ok(match container.address().and_then(|a| self.heap.get(a)) {
                        Some(HeapObject::Dict(table) | HeapObject::Set(table)) => {
                            table.contains(&hash)
                        }
                        _ => false,
                    })
                }
                Compared::Instance => match self.call_special(
                    container,
                    "__contains__",
                    vec![item.clone()],
                )? {
                    Some(result) => self.truthy(&result),
                    None => Err(self.type_error(format!(
                        "argument of type '{}' is not iterable",
                        self.heap.type_name(container)
                    ))),
                },
                Compared::Scalar => Err(self.type_error(format!(
                    "argument of type '{}' is not iterable",
                    self.heap.type_name(container)
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_across_types() {
        let mut interp = Interpreter::new();
        assert!(interp.equals(&Value::Int(1), &Value::Float(1.0)).unwrap_or(false));
        assert!(interp.equals(&Value::Bool(true), &Value::Int(1)).unwrap_or(false));
        assert!(!interp.equals(&Value::str("1"), &Value::Int(1)).unwrap_or(true));
    }

    #[test]
    fn test_list_equality_and_ordering() {
        let mut interp = Interpreter::new();
        let a = interp.new_list(vec![Value::Int(1), Value::Int(2)]);
        let b = interp.new_list(vec![Value::Int(1), Value::Int(3)]);
        let c = interp.new_list(vec![Value::Int(1), Value::Int(2)]);
        assert!(interp.equals(&a, &c).unwrap_or(false));
        assert!(!interp.identical(&a, &c));
        assert!(interp.less_than(&a, &b).unwrap_or(false));
        let pair = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        assert!(!interp.equals(&a, &pair).unwrap_or(true));
    }

    #[test]
    fn test_ordering_mismatched_types_fails() {
        let mut interp = Interpreter::new();
        let err = interp.less_than(&Value::Int(1), &Value::str("a")).expect_err("fails");
        assert_eq!(err.to_string(), "'<' not supported between instances of 'int' and 'str'");
    }

    #[test]
    fn test_membership() {
        let mut interp = Interpreter::new();
        let range = Value::Range { start: 0, stop: 10, step: 3 };
        assert!(interp.contains(&range, &Value::Int(9)).unwrap_or(false));
        assert!(!interp.contains(&range, &Value::Int(8)).unwrap_or(true));
        assert!(interp.contains(&Value::str("hello"), &Value::str("ell")).unwrap_or(false));
        let set = interp.new_set(vec![Value::Int(4)]).expect("hashable");
        assert!(interp.contains(&set, &Value::Float(4.0)).unwrap_or(false));
    }
}
