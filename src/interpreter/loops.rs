//! Loop statement execution (`while`, `for`) and iteration.
//!
//! Adds `impl Interpreter` methods for both loop forms. `break` and `continue`
//! are reported via `LoopBodyResult` so the loop driver can react without
//! inspecting `control_flow` directly.
//!
//! A loop header reports a `line` event every time control comes back to it,
//! including the final test or fetch that ends the loop. A `for` over `n`
//! items therefore reports its header `n + 1` times.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::HeapObject;
use crate::memory::value::{Address, Value};
use crate::parser::ast::{Expr, SourceLocation, Stmt};

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit and skip its `else`.
    Break,
    /// `return` was triggered; the loop unwinds and leaves the signal set.
    Exit,
}

/// Where the items of a `for` loop come from
enum LoopSource {
    /// Lazy integer range
    Range { next: i64, stop: i64, step: i64 },
    /// A list read by position on every fetch, so appends during the loop are seen
    List { addr: Address, position: usize },
    /// A snapshot of any other iterable
    Items { items: Vec<Value>, position: usize },
}

impl<'a> Interpreter<'a> {
    /// Executes all statements in `body` and translates the pending control flow.
    pub(crate) fn execute_loop_body(
        &mut self,
        body: &[Stmt],
    ) -> Result<LoopBodyResult, RuntimeError> {
        self.execute_block(body)?;
        Ok(match self.control_flow {
            ControlFlow::Normal => LoopBodyResult::Continue,
            ControlFlow::Continue => {
                self.control_flow = ControlFlow::Normal;
                LoopBodyResult::Continue
            }
            ControlFlow::Break => {
                self.control_flow = ControlFlow::Normal;
                LoopBodyResult::Break
            }
            ControlFlow::Return => LoopBodyResult::Exit,
        })
    }

    /// Return to a loop header after a pass through the body
    fn revisit_header(&mut self, location: SourceLocation) {
        self.current_location = location;
        self.mark_line(location.line, true);
    }

    /// Executes `while test: body else: orelse`.
    pub(crate) fn execute_while(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let mut first = true;
        loop {
            if !first {
                self.revisit_header(location);
            }
            first = false;

            let condition = self.evaluate_expr(test)?;
            if !self.truthy(&condition)? {
                return self.execute_block(orelse);
            }

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => return Ok(()),
                LoopBodyResult::Continue => {}
            }
        }
    }

    /// Executes `for target in iter: body else: orelse`.
    pub(crate) fn execute_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let iterable = self.evaluate_expr(iter)?;
        let mut source = self.loop_source(&iterable)?;

        let mut first = true;
        loop {
            if !first {
                self.revisit_header(location);
            }
            first = false;

            let Some(item) = self.next_item(&mut source) else {
                return self.execute_block(orelse);
            };
            self.assign_target(target, item)?;

            match self.execute_loop_body(body)? {
                LoopBodyResult::Exit | LoopBodyResult::Break => return Ok(()),
                LoopBodyResult::Continue => {}
            }
        }
    }

    fn loop_source(&mut self, iterable: &Value) -> Result<LoopSource, RuntimeError> {
        if let Value::Range { start, stop, step } = iterable {
            return Ok(LoopSource::Range {
                next: *start,
                stop: *stop,
                step: *step,
            });
        }
        if let Some(addr) = self.list_address(iterable) {
            return Ok(LoopSource::List { addr, position: 0 });
        }
        Ok(LoopSource::Items {
            items: self.iterate(iterable)?,
            position: 0,
        })
    }

    fn list_address(&self, value: &Value) -> Option<Address> {
        let addr = value.address()?;
        match self.heap.get(addr) {
            Some(HeapObject::List(_)) => Some(addr),
            _ => None,
        }
    }

    fn next_item(&self, source: &mut LoopSource) -> Option<Value> {
        match source {
            LoopSource::Range { next, stop, step } => {
                let in_range = if *step > 0 { *next < *stop } else { *next > *stop };
                if !in_range {
                    return None;
                }
                let item = *next;
                *next = next.saturating_add(*step);
                Some(Value::Int(item))
            }
            LoopSource::List { addr, position } => {
                let item = match self.heap.get(*addr) {
                    Some(HeapObject::List(items)) => items.get(*position).cloned(),
                    _ => None,
                }?;
                *position += 1;
                Some(item)
            }
            LoopSource::Items { items, position } => {
                let item = items.get(*position).cloned()?;
                *position += 1;
                Some(item)
            }
        }
    }

    /// Materialize the items of an iterable value
    pub(crate) fn iterate(&mut self, value: &Value) -> Result<Vec<Value>, RuntimeError> {
        match value {
            Value::Str(s) => {
                return Ok(s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect())
            }
            Value::Tuple(items) => return Ok(items.to_vec()),
            Value::Range { start, stop, step } => {
                let mut items = Vec::new();
                let mut source = LoopSource::Range {
                    next: *start,
                    stop: *stop,
                    step: *step,
                };
                while let Some(item) = self.next_item(&mut source) {
                    items.push(item);
                }
                return Ok(items);
            }
            _ => {}
        }

        let is_instance = match value.address().and_then(|a| self.heap.get(a)) {
            Some(HeapObject::List(items)) => return Ok(items.clone()),
            Some(HeapObject::Dict(table) | HeapObject::Set(table)) => return Ok(table.keys()),
            Some(HeapObject::Instance(_)) => true,
            _ => false,
        };
        if is_instance {
            if let Some(iterator) = self.call_special(value, "__iter__", vec![])? {
                if !self.identical(&iterator, value) {
                    return self.iterate(&iterator);
                }
                return self.drain_iterator(&iterator);
            }
        }
        Err(self.type_error(format!("'{}' object is not iterable", self.heap.type_name(value))))
    }

    /// Call `__next__` until it raises `StopIteration`
    fn drain_iterator(&mut self, iterator: &Value) -> Result<Vec<Value>, RuntimeError> {
        let mut items = Vec::new();
        loop {
            match self.call_special(iterator, "__next__", vec![]) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {
                    return Err(self.type_error(format!(
                        "iter() returned non-iterator of type '{}'",
                        self.heap.type_name(iterator)
                    )))
                }
                Err(err) if err.kind_name() == "StopIteration" => return Ok(items),
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterate_builtin_values() {
        let mut interp = Interpreter::new();
        let chars = interp.iterate(&Value::str("ab")).expect("iterable");
        assert_eq!(chars.len(), 2);

        let range = interp
            .iterate(&Value::Range { start: 5, stop: 0, step: -2 })
            .expect("iterable");
        let ints: Vec<i64> = range.iter().filter_map(Value::as_int).collect();
        assert_eq!(ints, vec![5, 3, 1]);

        let err = interp.iterate(&Value::Int(3)).expect_err("fails");
        assert_eq!(err.to_string(), "'int' object is not iterable");
    }
}
