//! Expression evaluation implementation
//!
//! This module handles evaluation of all expression types, including:
//!
//! - Literals, f-strings and container displays
//! - Names, attributes, subscripts and slices
//! - Calls, including `*args` unpacking and method calls on built-in values
//! - Unary, binary, comparison and boolean operators
//! - Conditional expressions, lambdas and comprehensions
//!
//! All evaluation methods are implemented as `pub(crate)` methods on the
//! [`Interpreter`] struct.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::HeapObject;
use crate::memory::value::{Address, Value};
use crate::parser::ast::*;

/// Evaluated call arguments
type CallArgs = (Vec<Value>, Vec<(String, Value)>);

impl<'a> Interpreter<'a> {
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::FString(parts) => self.evaluate_fstring(parts),
            Expr::Name(name) => self.lookup_name(name),

            Expr::Tuple(items) => Ok(Value::tuple(self.evaluate_all(items)?)),
            Expr::List(items) => {
                let items = self.evaluate_all(items)?;
                Ok(self.new_list(items))
            }
            Expr::Set(items) => {
                let items = self.evaluate_all(items)?;
                self.new_set(items)
            }
            Expr::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.evaluate_expr(key)?;
                    let value = self.evaluate_expr(value)?;
                    entries.push((key, value));
                }
                self.new_dict(entries)
            }

            Expr::ListComp { element, generators } => {
                let mut items = Vec::new();
                self.comprehension(generators, &mut |interp| {
                    items.push(interp.evaluate_expr(element)?);
                    Ok(())
                })?;
                Ok(self.new_list(items))
            }
            Expr::SetComp { element, generators } => {
                let mut items = Vec::new();
                self.comprehension(generators, &mut |interp| {
                    items.push(interp.evaluate_expr(element)?);
                    Ok(())
                })?;
                self.new_set(items)
            }
            Expr::DictComp { key, value, generators } => {
                let mut entries = Vec::new();
                self.comprehension(generators, &mut |interp| {
                    let k = interp.evaluate_expr(key)?;
                    let v = interp.evaluate_expr(value)?;
                    entries.push((k, v));
                    Ok(())
                })?;
                self.new_dict(entries)
            }

            Expr::Attribute { object, name } => {
                let object = self.evaluate_expr(object)?;
                self.get_attribute(&object, name)
            }
            Expr::Subscript { object, index } => {
                let object = self.evaluate_expr(object)?;
                if let Expr::Slice { lower, upper, step } = index.as_ref() {
                    let bounds = self.slice_bounds(lower, upper, step)?;
                    return self.get_slice(&object, bounds);
                }
                let index = self.evaluate_expr(index)?;
                self.get_item(&object, &index)
            }
            Expr::Slice { .. } => Err(RuntimeError::UnsupportedOperation {
                message: "slice objects are only supported inside subscripts".to_string(),
                location: self.current_location,
            }),

            Expr::Call { func, args } => self.evaluate_call(func, args),

            Expr::Unary { op, operand } => {
                let operand = self.evaluate_expr(operand)?;
                self.unary_op(*op, operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;
                self.binary_op(*op, left, right)
            }
            Expr::Compare { left, comparisons } => {
                let mut current = self.evaluate_expr(left)?;
                for (op, right) in comparisons {
                    let right = self.evaluate_expr(right)?;
                    if !self.compare(*op, &current, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    current = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::BoolOp { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                let decided = match op {
                    BoolOp::And => !self.truthy(&left)?,
                    BoolOp::Or => self.truthy(&left)?,
                };
                if decided {
                    Ok(left)
                } else {
                    self.evaluate_expr(right)
                }
            }
            Expr::IfExp { test, body, orelse } => {
                let test = self.evaluate_expr(test)?;
                if self.truthy(&test)? {
                    self.evaluate_expr(body)
                } else {
                    self.evaluate_expr(orelse)
                }
            }
            Expr::Lambda(def) => self.make_function(def),
        }
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|expr| self.evaluate_expr(expr)).collect()
    }

    fn evaluate_fstring(&mut self, parts: &[FStringPart]) -> Result<Value, RuntimeError> {
        let mut text = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(literal) => text.push_str(literal),
                FStringPart::Field { expr, conversion, spec } => {
                    let value = self.evaluate_expr(expr)?;
                    let spec = spec.as_deref().unwrap_or("");
                    text.push_str(&self.format_field(&value, *conversion, spec)?);
                }
            }
        }
        Ok(Value::str(&text))
    }

    fn evaluate_arguments(&mut self, args: &[Argument]) -> Result<CallArgs, RuntimeError> {
        let mut positional = Vec::with_capacity(args.len());
        let mut keywords = Vec::new();
        for arg in args {
            match arg {
                Argument::Positional(expr) => positional.push(self.evaluate_expr(expr)?),
                Argument::Keyword(name, expr) => {
                    let value = self.evaluate_expr(expr)?;
                    keywords.push((name.clone(), value));
                }
                Argument::Star(expr) => {
                    let value = self.evaluate_expr(expr)?;
                    let items = self.iterate(&value).map_err(|_| {
                        self.type_error(format!(
                            "Value after * must be an iterable, not {}",
                            self.heap.type_name(&value)
                        ))
                    })?;
                    positional.extend(items);
                }
            }
        }
        Ok((positional, keywords))
    }

    fn evaluate_call(&mut self, func: &Expr, args: &[Argument]) -> Result<Value, RuntimeError> {
        if let Expr::Attribute { object, name } = func {
            let receiver = self.evaluate_expr(object)?;
            let (positional, keywords) = self.evaluate_arguments(args)?;
            return self.call_method(receiver, name, positional, keywords);
        }
        let callee = self.evaluate_expr(func)?;
        let (positional, keywords) = self.evaluate_arguments(args)?;
        self.call_value(callee, positional, keywords)
    }

    /// `receiver.name(args)` without materializing a bound method when possible
    fn call_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        if self.has_native_method(&receiver, name) {
            return self.call_native_method(receiver, name, args, kwargs);
        }
        if let Some(function) = self.class_method_function(&receiver, name) {
            let mut bound = Vec::with_capacity(args.len() + 1);
            bound.push(receiver);
            bound.extend(args);
            return self.call_function(function, bound, kwargs);
        }
        let callee = self.get_attribute(&receiver, name)?;
        self.call_value(callee, args, kwargs)
    }

    /// A plain function found on an instance's class, not shadowed by an instance attribute
    fn class_method_function(&self, receiver: &Value, name: &str) -> Option<Address> {
        let instance = self.heap.instance(receiver.address()?)?;
        if instance.attrs.contains(name) {
            return None;
        }
        let (method, _) = self.heap.class_lookup(instance.class, name)?;
        let addr = method.address()?;
        match self.heap.get(addr) {
            Some(HeapObject::Function(_)) => Some(addr),
            _ => None,
        }
    }

    /// Run the `for`/`if` clauses of a comprehension, calling `emit` for each
    /// combination that passes every condition.
    ///
    /// Loop variables are bound in the running scope and restored afterwards so
    /// they do not leak.
    fn comprehension(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Interpreter<'a>) -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let mut names = Vec::new();
        for generator in generators {
            collect_target_names(&generator.target, &mut names);
        }
        let scope = self
            .stack
            .current_frame()
            .map(|frame| frame.locals)
            .unwrap_or(self.globals);
        let saved: Vec<(String, Option<Value>)> = names
            .into_iter()
            .map(|name| {
                let previous = self.heap.scope(scope).and_then(|s| s.vars.get(&name).cloned());
                (name, previous)
            })
            .collect();

        let result = self.comprehension_level(generators, emit);

        if let Some(target) = self.heap.scope_mut(scope) {
            for (name, previous) in saved {
                match previous {
                    Some(value) => target.vars.set(&name, value),
                    None => {
                        target.vars.remove(&name);
                    }
                }
            }
        }
        result
    }

    fn comprehension_level(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Interpreter<'a>) -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let Some((generator, rest)) = generators.split_first() else {
            return emit(self);
        };
        let iterable = self.evaluate_expr(&generator.iter)?;
        'items: for item in self.iterate(&iterable)? {
            self.assign_target(&generator.target, item)?;
            for condition in &generator.conditions {
                let passed = self.evaluate_expr(condition)?;
                if !self.truthy(&passed)? {
                    continue 'items;
                }
            }
            self.comprehension_level(rest, emit)?;
        }
        Ok(())
    }
}

fn collect_target_names(target: &Expr, names: &mut Vec<String>) {
    match target {
        Expr::Name(name) => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                collect_target_names(item, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn eval(source: &str) -> Result<Value, RuntimeError> {
        let expr = Parser::parse_standalone_expression(source).expect("parses");
        let mut interp = Interpreter::new();
        interp.evaluate_expr(&expr)
    }

    fn eval_repr(source: &str) -> String {
        let expr = Parser::parse_standalone_expression(source).expect("parses");
        let mut interp = Interpreter::new();
        let value = interp.evaluate_expr(&expr).expect("evaluates");
        interp.repr_of(&value).expect("repr")
    }

    #[test]
    fn test_comparison_chain() {
        assert!(matches!(eval("1 < 2 < 3"), Ok(Value::Bool(true))));
        assert!(matches!(eval("1 < 3 < 2"), Ok(Value::Bool(false))));
        assert!(matches!(eval("2 in [1, 2] and 3 not in (1, 2)"), Ok(Value::Bool(true))));
    }

    #[test]
    fn test_short_circuit_returns_operand() {
        assert!(matches!(eval("0 or 5"), Ok(Value::Int(5))));
        assert!(matches!(eval("0 and undefined_name"), Ok(Value::Int(0))));
        assert!(eval("1 and undefined_name").is_err());
    }

    #[test]
    fn test_displays_and_comprehensions() {
        assert_eq!(eval_repr("[x * x for x in range(4) if x % 2 == 0]"), "[0, 4]");
        assert_eq!(eval_repr("{k: len(k) for k in ['a', 'bb']}"), "{'a': 1, 'bb': 2}");
        assert_eq!(eval_repr("[(i, j) for i in range(2) for j in range(i)]"), "[(1, 0)]");
        assert_eq!(eval_repr("(1,)"), "(1,)");
    }

    #[test]
    fn test_fstring_and_methods() {
        assert_eq!(eval_repr("f'{3.14159:.2f}|{\"x\"!r}'"), "\"3.14|'x'\"");
        assert_eq!(eval_repr("'-'.join(['a', 'b'])"), "'a-b'");
        assert_eq!(eval_repr("'abc'[::-1]"), "'cba'");
    }

    #[test]
    fn test_star_arguments() {
        assert!(matches!(eval("max(*[3, 9, 4])"), Ok(Value::Int(9))));
    }
}
