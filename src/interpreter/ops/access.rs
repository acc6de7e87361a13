//! Subscript access: indexing, slicing and item assignment

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::HeapObject;
use crate::memory::value::{range_len, Value};
use crate::parser::ast::Expr;

/// Evaluated `lower:upper:step`, with omitted parts left empty
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SliceBounds {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub step: Option<i64>,
}

impl SliceBounds {
    /// Positions selected from a sequence of `len` items
    fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as i64;
        let step = self.step.unwrap_or(1);
        let mut indices = Vec::new();
        if step > 0 {
            let clamp = |x: i64| if x < 0 { (x + len).max(0) } else { x.min(len) };
            let start = self.lower.map_or(0, clamp);
            let stop = self.upper.map_or(len, clamp);
            let mut i = start;
            while i < stop {
                indices.push(i as usize);
                i += step;
            }
        } else {
            let clamp = |x: i64| if x < 0 { (x + len).max(-1) } else { x.min(len - 1) };
            let start = self.lower.map_or(len - 1, clamp);
            let stop = self.upper.map_or(-1, clamp);
            let mut i = start;
            while i > stop {
                indices.push(i as usize);
                i += step;
            }
        }
        indices
    }
}

/// Sequence shape copied out of the heap
enum Indexed {
    List(Vec<Value>),
    Dict,
    Instance,
    Other,
}

impl<'a> Interpreter<'a> {
    /// Evaluate the parts of a slice expression
    pub(crate) fn slice_bounds(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> Result<SliceBounds, RuntimeError> {
        let mut part = |expr: &Option<Box<Expr>>| -> Result<Option<i64>, RuntimeError> {
            match expr {
                None => Ok(None),
                Some(expr) => match self.evaluate_expr(expr)? {
                    Value::None => Ok(None),
                    value => value.as_int().map(Some).ok_or_else(|| {
                        self.type_error(
                            "slice indices must be integers or None or have an __index__ method",
                        )
                    }),
                },
            }
        };
        let bounds = SliceBounds {
            lower: part(lower)?,
            upper: part(upper)?,
            step: part(step)?,
        };
        if bounds.step == Some(0) {
            return Err(self.value_error("slice step cannot be zero"));
        }
        Ok(bounds)
    }

    fn indexed(&self, value: &Value) -> Indexed {
        match value.address().and_then(|a| self.heap.get(a)) {
            Some(HeapObject::List(items)) => Indexed::List(items.clone()),
            Some(HeapObject::Dict(_)) => Indexed::Dict,
            Some(HeapObject::Instance(_)) => Indexed::Instance,
            _ => Indexed::Other,
        }
    }

    /// Resolve a possibly negative index against a sequence length
    fn position(&self, index: &Value, len: usize, kind: &str) -> Result<usize, RuntimeError> {
        let Some(n) = index.as_int() else {
            let message = if kind == "string" {
                format!("string indices must be integers, not '{}'", self.heap.type_name(index))
            } else {
                format!(
                    "{} indices must be integers or slices, not {}",
                    kind,
                    self.heap.type_name(index)
                )
            };
            return Err(self.type_error(message));
        };
        let resolved = if n < 0 { n + len as i64 } else { n };
        if resolved < 0 || resolved >= len as i64 {
            return Err(self.index_error(format!("{} index out of range", kind)));
        }
        Ok(resolved as usize)
    }

    /// `object[index]`
    pub(crate) fn get_item(
        &mut self,
        object: &Value,
        index: &Value,
    ) -> Result<Value, RuntimeError> {
        match object {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let at = self.position(index, chars.len(), "string")?;
                return Ok(Value::str(&chars[at].to_string()));
            }
            Value::Tuple(items) => {
                let at = self.position(index, items.len(), "tuple")?;
                return Ok(items[at].clone());
            }
            Value::Range { start, stop, step } => {
                let at = self.position(index, range_len(*start, *stop, *step), "range object")?;
                return Ok(Value::Int(start + at as i64 * step));
            }
            _ => {}
        }

        match self.indexed(object) {
            Indexed::List(items) => {
                let at = self.position(index, items.len(), "list")?;
                Ok(items[at].clone())
            }
            Indexed::Dict => {
                let hash = self.hash_of(index)?;
                let found = match object.address().and_then(|a| self.heap.get(a)) {
                    Some(HeapObject::Dict(table)) => table.get(&hash).cloned(),
                    _ => None,
                };
                match found {
                    Some(value) => Ok(value),
                    None => Err(self.key_error(index)),
                }
            }
            Indexed::Instance => {
                match self.call_special(object, "__getitem__", vec![index.clone()])? {
                    Some(value) => Ok(value),
                    None => Err(self.not_subscriptable(object)),
                }
            }
            Indexed::Other => Err(self.not_subscriptable(object)),
        }
    }

    fn not_subscriptable(&self, object: &Value) -> RuntimeError {
        self.type_error(format!("'{}' object is not subscriptable", self.heap.type_name(object)))
    }

    /// `object[lower:upper:step]`
    pub(crate) fn get_slice(
        &mut self,
        object: &Value,
        bounds: SliceBounds,
    ) -> Result<Value, RuntimeError> {
        match object {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let text: String =
                    bounds.indices(chars.len()).into_iter().map(|i| chars[i]).collect();
                Ok(Value::str(&text))
            }
            Value::Tuple(items) => Ok(Value::tuple(
                bounds.indices(items.len()).into_iter().map(|i| items[i].clone()).collect(),
            )),
            Value::Range { start, stop, step } => {
                let picked = bounds.indices(range_len(*start, *stop, *step));
                let items = picked
                    .into_iter()
                    .map(|i| Value::Int(start + i as i64 * step))
                    .collect();
                Ok(self.new_list(items))
            }
            _ => match self.indexed(object) {
                Indexed::List(items) => {
                    let picked = bounds
                        .indices(items.len())
                        .into_iter()
                        .map(|i| items[i].clone())
                        .collect();
                    Ok(self.new_list(picked))
                }
                _ => Err(self.not_subscriptable(object)),
            },
        }
    }

    /// `object[index] = value`
    pub(crate) fn set_item(
        &mut self,
        object: &Value,
        index: &Value,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match self.indexed(object) {
            Indexed::List(items) => {
                let at = self.position(index, items.len(), "list").map_err(|err| {
                    self.assignment_error(err, "list assignment index out of range")
                })?;
                let slot = object.address().and_then(|a| self.heap.get_mut(a));
                if let Some(HeapObject::List(items)) = slot {
                    items[at] = value;
                }
                Ok(())
            }
            Indexed::Dict => {
                let hash = self.hash_of(index)?;
                let slot = object.address().and_then(|a| self.heap.get_mut(a));
                if let Some(HeapObject::Dict(table)) = slot {
                    table.insert(hash, index.clone(), value);
                }
                Ok(())
            }
            Indexed::Instance => {
                match self.call_special(object, "__setitem__", vec![index.clone(), value])? {
                    Some(_) => Ok(()),
                    None => Err(self.no_item_assignment(object)),
                }
            }
            Indexed::Other => Err(self.no_item_assignment(object)),
        }
    }

    fn assignment_error(&self, err: RuntimeError, message: &str) -> RuntimeError {
        match err {
            RuntimeError::IndexOutOfRange { .. } => self.index_error(message),
            other => other,
        }
    }

    fn no_item_assignment(&self, object: &Value) -> RuntimeError {
        self.type_error(format!(
            "'{}' object does not support item assignment",
            self.heap.type_name(object)
        ))
    }

    /// `object[lower:upper:step] = value`
    pub(crate) fn set_slice(
        &mut self,
        object: &Value,
        bounds: SliceBounds,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let Indexed::List(items) = self.indexed(object) else {
            return Err(self.no_item_assignment(object));
        };
        let replacement = self
            .iterate(&value)
            .map_err(|_| self.type_error("can only assign an iterable"))?;
        let picked = bounds.indices(items.len());

        let updated = if bounds.step.unwrap_or(1) == 1 {
            let start = bounds.lower.map_or(0, |x| {
                let len = items.len() as i64;
                (if x < 0 { (x + len).max(0) } else { x.min(len) }) as usize
            });
            let end = picked.last().map_or(start, |last| last + 1);
            let mut updated = items[..start].to_vec();
            updated.extend(replacement);
            updated.extend_from_slice(&items[end.max(start)..]);
            updated
        } else {
            if picked.len() != replacement.len() {
                return Err(self.value_error(format!(
                    "attempt to assign sequence of size {} to extended slice of size {}",
                    replacement.len(),
                    picked.len()
                )));
            }
            let mut updated = items;
            for (at, item) in picked.into_iter().zip(replacement) {
                updated[at] = item;
            }
            updated
        };

        if let Some(HeapObject::List(items)) = object.address().and_then(|a| self.heap.get_mut(a)) {
            *items = updated;
        }
        Ok(())
    }

    /// `del object[index]`
    pub(crate) fn del_item(&mut self, object: &Value, index: &Value) -> Result<(), RuntimeError> {
        match self.indexed(object) {
            Indexed::List(items) => {
                let at = self.position(index, items.len(), "list").map_err(|err| {
                    self.assignment_error(err, "list assignment index out of range")
                })?;
                let slot = object.address().and_then(|a| self.heap.get_mut(a));
                if let Some(HeapObject::List(items)) = slot {
                    items.remove(at);
                }
                Ok(())
            }
            Indexed::Dict => {
                let hash = self.hash_of(index)?;
                let removed = match object.address().and_then(|a| self.heap.get_mut(a)) {
                    Some(HeapObject::Dict(table)) => table.remove(&hash),
                    _ => None,
                };
                match removed {
                    Some(_) => Ok(()),
                    None => Err(self.key_error(index)),
                }
            }
            Indexed::Instance => {
                match self.call_special(object, "__delitem__", vec![index.clone()])? {
                    Some(_) => Ok(()),
                    None => Err(self.no_item_deletion(object)),
                }
            }
            Indexed::Other => Err(self.no_item_deletion(object)),
        }
    }

    fn no_item_deletion(&self, object: &Value) -> RuntimeError {
        self.type_error(format!(
            "'{}' object doesn't support item deletion",
            self.heap.type_name(object)
        ))
    }

    /// `del object[lower:upper:step]`
    pub(crate) fn del_slice(
        &mut self,
        object: &Value,
        bounds: SliceBounds,
    ) -> Result<(), RuntimeError> {
        let Indexed::List(items) = self.indexed(object) else {
            return Err(self.no_item_deletion(object));
        };
        let picked = bounds.indices(items.len());
        let kept = items
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !picked.contains(i))
            .map(|(_, item)| item)
            .collect();
        if let Some(HeapObject::List(items)) = object.address().and_then(|a| self.heap.get_mut(a)) {
            *items = kept;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> SliceBounds {
        SliceBounds { lower, upper, step }
    }

    #[test]
    fn test_slice_indices() {
        assert_eq!(bounds(None, None, None).indices(4), vec![0, 1, 2, 3]);
        assert_eq!(bounds(Some(1), Some(-1), None).indices(4), vec![1, 2]);
        assert_eq!(bounds(None, None, Some(-1)).indices(3), vec![2, 1, 0]);
        assert_eq!(bounds(Some(-10), Some(10), Some(2)).indices(5), vec![0, 2, 4]);
        assert!(bounds(Some(3), Some(1), None).indices(5).is_empty());
    }

    #[test]
    fn test_negative_index_and_errors() {
        let mut interp = Interpreter::new();
        let list = interp.new_list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(matches!(interp.get_item(&list, &Value::Int(-1)), Ok(Value::Int(3))));

        let err = interp.get_item(&list, &Value::Int(3)).expect_err("fails");
        assert_eq!(err.to_string(), "list index out of range");
        assert_eq!(err.kind_name(), "IndexError");

        let err = interp.get_item(&Value::Int(3), &Value::Int(0)).expect_err("fails");
        assert_eq!(err.to_string(), "'int' object is not subscriptable");
    }

    #[test]
    fn test_dict_missing_key() {
        let mut interp = Interpreter::new();
        let dict = interp.new_dict(vec![]).expect("empty dict");
        let err = interp.get_item(&dict, &Value::str("k")).expect_err("fails");
        assert_eq!(err.kind_name(), "KeyError");
        assert_eq!(err.to_string(), "'k'");
    }

    #[test]
    fn test_slice_assignment_replaces_span() {
        let mut interp = Interpreter::new();
        let list = interp.new_list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let replacement = interp.new_list(vec![Value::Int(9), Value::Int(9), Value::Int(9)]);
        interp
            .set_slice(&list, bounds(Some(1), Some(2), None), replacement)
            .expect("assignable");
        assert_eq!(interp.len_of(&list).ok(), Some(5));
    }
}
