//! Calls and attribute access
//!
//! Calling any callable value (user functions, bound methods, built-ins,
//! classes, instances with `__call__`), binding arguments to parameters,
//! creating instances and resolving attributes along the method resolution
//! order.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::format::is_exception_class;
use crate::memory::heap::{Function, HeapObject, Instance, Namespace, Scope};
use crate::memory::stack::{FrameKind, StackFrame};
use crate::memory::value::{Address, Value};
use crate::parser::ast::FunctionDef;
use std::rc::Rc;

/// What a callee turned out to be, extracted so the heap borrow ends before the call
enum Callee {
    Function(Address),
    Bound(Value, Address),
    Native(Value, String),
    Class(Address),
    CallableInstance,
}

impl<'a> Interpreter<'a> {
    /// Call any callable value
    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let addr = match callee {
            Value::Builtin(builtin) => return self.call_builtin(builtin, args, kwargs),
            Value::Ref(addr) => addr,
            other => {
                return Err(self.type_error(format!(
                    "'{}' object is not callable",
                    self.heap.type_name(&other)
                )))
            }
        };

        let target = match self.heap.get(addr) {
            Some(HeapObject::Function(_)) => Callee::Function(addr),
            Some(HeapObject::BoundMethod { receiver, function }) => {
                Callee::Bound(receiver.clone(), *function)
            }
            Some(HeapObject::NativeMethod { receiver, name }) => {
                Callee::Native(receiver.clone(), name.clone())
            }
            Some(HeapObject::Class(_)) => Callee::Class(addr),
            Some(HeapObject::Instance(_)) => Callee::CallableInstance,
            _ => {
                return Err(self.type_error(format!(
                    "'{}' object is not callable",
                    self.heap.type_name(&Value::Ref(addr))
                )))
            }
        };

        match target {
            Callee::Function(function) => self.call_function(function, args, kwargs),
            Callee::Bound(receiver, function) => {
                let mut bound = Vec::with_capacity(args.len() + 1);
                bound.push(receiver);
                bound.extend(args);
                self.call_function(function, bound, kwargs)
            }
            Callee::Native(receiver, name) => {
                self.call_native_method(receiver, &name, args, kwargs)
            }
            Callee::Class(class) => self.instantiate(class, args, kwargs),
            Callee::CallableInstance => {
                let instance = Value::Ref(addr);
                match self.call_special_with(&instance, "__call__", args, kwargs)? {
                    Some(result) => Ok(result),
                    None => Err(self.type_error(format!(
                        "'{}' object is not callable",
                        self.heap.type_name(&instance)
                    ))),
                }
            }
        }
    }

    /// Call a user function: bind arguments, then run its body in a new frame
    pub(crate) fn call_function(
        &mut self,
        function: Address,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        if self.inspecting {
            return Err(RuntimeError::UnsupportedOperation {
                message: "user code cannot run while a frame is inspected".to_string(),
                location: self.current_location,
            });
        }
        let Some(HeapObject::Function(Function {
            def,
            defaults,
            closure,
            owner,
        })) = self.heap.get(function).cloned()
        else {
            return Err(self.type_error("object is not a function"));
        };

        let receiver = args.first().cloned();
        let vars = self.bind_arguments(&def, &defaults, args, kwargs)?;
        let locals = self.heap.alloc(HeapObject::Scope(Scope { vars, parent: closure }));

        let mut frame =
            StackFrame::new(def.name.clone(), FrameKind::Function, locals, def.location.line);
        if owner.is_some() {
            frame.owner_class = owner;
            frame.receiver = receiver;
        }
        self.run_frame(frame, &def.body)
    }

    /// Match call arguments to parameters, producing the new frame's bindings
    fn bind_arguments(
        &mut self,
        def: &FunctionDef,
        defaults: &[Option<Value>],
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Namespace, RuntimeError> {
        let name = &def.name;
        let params = &def.params;
        let given = args.len();

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        let mut args = args.into_iter();
        for (slot, value) in slots.iter_mut().zip(args.by_ref()) {
            *slot = Some(value);
        }
        let extra: Vec<Value> = args.collect();
        if !extra.is_empty() && def.vararg.is_none() {
            let required = defaults.iter().filter(|d| d.is_none()).count();
            let takes = if required == params.len() {
                params.len().to_string()
            } else {
                format!("from {} to {}", required, params.len())
            };
            return Err(self.type_error(format!(
                "{}() takes {} positional argument{} but {} {} given",
                name,
                takes,
                if params.len() == 1 { "" } else { "s" },
                given,
                if given == 1 { "was" } else { "were" }
            )));
        }

        let mut extra_keywords = Vec::new();
        for (key, value) in kwargs {
            match params.iter().position(|p| p.name == key) {
                Some(i) if slots[i].is_some() => {
                    return Err(self.type_error(format!(
                        "{}() got multiple values for argument '{}'",
                        name, key
                    )))
                }
                Some(i) => slots[i] = Some(value),
                None if def.kwarg.is_some() => extra_keywords.push((Value::str(&key), value)),
                None => {
                    return Err(self.type_error(format!(
                        "{}() got an unexpected keyword argument '{}'",
                        name, key
                    )))
                }
            }
        }

        let mut vars = Namespace::new();
        let mut missing = Vec::new();
        for (i, param) in params.iter().enumerate() {
            match slots[i].take().or_else(|| defaults.get(i).cloned().flatten()) {
                Some(value) => vars.set(&param.name, value),
                None => missing.push(format!("'{}'", param.name)),
            }
        }
        if !missing.is_empty() {
            let list = match missing.len() {
                1 => missing[0].clone(),
                2 => format!("{} and {}", missing[0], missing[1]),
                n => format!("{}, and {}", missing[..n - 1].join(", "), missing[n - 1]),
            };
            return Err(self.type_error(format!(
                "{}() missing {} required positional argument{}: {}",
                name,
                missing.len(),
                if missing.len() == 1 { "" } else { "s" },
                list
            )));
        }

        if let Some(vararg) = &def.vararg {
            vars.set(vararg, Value::tuple(extra));
        }
        if let Some(kwarg) = &def.kwarg {
            let dict = self.new_dict(extra_keywords)?;
            vars.set(kwarg, dict);
        }
        Ok(vars)
    }

    /// Create the function object for a `def` or `lambda` in the running frame
    pub(crate) fn make_function(&mut self, def: &Rc<FunctionDef>) -> Result<Value, RuntimeError> {
        let mut defaults = Vec::with_capacity(def.params.len());
        for param in &def.params {
            defaults.push(match &param.default {
                Some(expr) => Some(self.evaluate_expr(expr)?),
                None => None,
            });
        }
        let owner = self
            .stack
            .current_frame()
            .filter(|frame| frame.kind == FrameKind::Class)
            .and_then(|frame| frame.owner_class);
        let closure = self.closure_for_definition();

        Ok(self.heap.alloc_value(HeapObject::Function(Function {
            def: Rc::clone(def),
            defaults,
            closure,
            owner,
        })))
    }

    /// Call a class: create the instance and run `__init__`
    pub(crate) fn instantiate(
        &mut self,
        class: Address,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let is_exception = is_exception_class(&self.heap, class);
        let instance = self.heap.alloc_value(HeapObject::Instance(Instance {
            class,
            attrs: Namespace::new(),
            args: if is_exception { args.clone() } else { Vec::new() },
        }));

        match self.heap.class_lookup(class, "__init__") {
            Some((init, _)) => {
                let mut bound = Vec::with_capacity(args.len() + 1);
                bound.push(instance.clone());
                bound.extend(args);
                let result = self.call_value(init, bound, kwargs)?;
                if !result.is_none() {
                    return Err(self.type_error(format!(
                        "__init__() should return None, not '{}'",
                        self.heap.type_name(&result)
                    )));
                }
            }
            None if !is_exception && (!args.is_empty() || !kwargs.is_empty()) => {
                return Err(self.type_error(format!(
                    "{}() takes no arguments",
                    self.heap.class_name(class)
                )));
            }
            None => {}
        }
        Ok(instance)
    }

    /// Call a dunder method defined by the value's class, if there is one
    pub(crate) fn call_special(
        &mut self,
        value: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, RuntimeError> {
        self.call_special_with(value, name, args, Vec::new())
    }

    fn call_special_with(
        &mut self,
        value: &Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Option<Value>, RuntimeError> {
        let Some(class) = self.heap.class_of(value) else {
            return Ok(None);
        };
        let Some((method, _)) = self.heap.class_lookup(class, name) else {
            return Ok(None);
        };
        let is_function = matches!(
            method.address().and_then(|a| self.heap.get(a)),
            Some(HeapObject::Function(_))
        );
        let result = if is_function {
            let mut bound = Vec::with_capacity(args.len() + 1);
            bound.push(value.clone());
            bound.extend(args);
            self.call_value(method, bound, kwargs)?
        } else {
            self.call_value(method, args, kwargs)?
        };
        Ok(Some(result))
    }

    /// `super()` / `super(Class, obj)`
    pub(crate) fn make_super(&mut self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let (class, receiver) = match args.as_slice() {
            [] => {
                let frame = self.stack.current_frame();
                match frame.and_then(|f| f.owner_class.zip(f.receiver.clone())) {
                    Some(pair) => pair,
                    None => {
                        return Err(RuntimeError::InvalidControlFlow {
                            message: "super(): no arguments".to_string(),
                            location: self.current_location,
                        })
                    }
                }
            }
            [Value::Ref(class), receiver] if self.heap.class(*class).is_some() => {
                (*class, receiver.clone())
            }
            [_, _] => return Err(self.type_error("super() argument 1 must be a type")),
            _ => {
                return Err(self.type_error(format!(
                    "super() takes at most 2 arguments ({} given)",
                    args.len()
                )))
            }
        };
        Ok(self.heap.alloc_value(HeapObject::Super { class, receiver }))
    }

    /// Bind a class attribute found for `receiver`: functions become bound methods
    fn bind_to(&mut self, attr: Value, receiver: &Value) -> Value {
        match attr.address().and_then(|a| self.heap.get(a)) {
            Some(HeapObject::Function(_)) => self.heap.alloc_value(HeapObject::BoundMethod {
                receiver: receiver.clone(),
                function: attr.address().unwrap_or_default(),
            }),
            _ => attr,
        }
    }

    /// `obj.name`
    pub(crate) fn get_attribute(
        &mut self,
        object: &Value,
        name: &str,
    ) -> Result<Value, RuntimeError> {
        enum Found {
            Value(Value),
            Bind(Value),
            Native,
            Missing(String),
        }

        let found = match object {
            Value::Ref(addr) => match self.heap.get(*addr) {
                Some(HeapObject::Instance(instance)) => {
                    if let Some(value) = instance.attrs.get(name) {
                        Found::Value(value.clone())
                    } else if name == "__class__" {
                        Found::Value(Value::Ref(instance.class))
                    } else if name == "args" && is_exception_class(&self.heap, instance.class) {
                        Found::Value(Value::tuple(instance.args.clone()))
                    } else if let Some((attr, _)) = self.heap.class_lookup(instance.class, name) {
                        Found::Bind(attr)
                    } else {
                        Found::Missing(format!(
                            "'{}' object has no attribute '{}'",
                            self.heap.class_name(instance.class),
                            name
                        ))
                    }
                }
                Some(HeapObject::Class(class)) => {
                    if name == "__name__" {
                        Found::Value(Value::str(&class.name))
                    } else if let Some((attr, _)) = self.heap.class_lookup(*addr, name) {
                        Found::Value(attr)
                    } else {
                        Found::Missing(format!(
                            "type object '{}' has no attribute '{}'",
                            class.name, name
                        ))
                    }
                }
                Some(HeapObject::Module(module)) => match module.attrs.get(name) {
                    Some(value) => Found::Value(value.clone()),
                    None => Found::Missing(format!(
                        "module '{}' has no attribute '{}'",
                        module.name, name
                    )),
                },
                Some(HeapObject::Super { class, receiver }) => {
                    let start = self
                        .heap
                        .class_of(receiver)
                        .or_else(|| receiver.address())
                        .unwrap_or(*class);
                    match self.heap.class_lookup_after(start, *class, name) {
                        Some((attr, _)) => {
                            let receiver = receiver.clone();
                            return Ok(self.bind_to(attr, &receiver));
                        }
                        None if name == "__init__" => {
                            let receiver = receiver.clone();
                            return Ok(self.heap.alloc_value(HeapObject::NativeMethod {
                                receiver,
                                name: name.to_string(),
                            }));
                        }
                        None => {
                            Found::Missing(format!("'super' object has no attribute '{}'", name))
                        }
                    }
                }
                Some(HeapObject::Function(function)) if name == "__name__" => {
                    Found::Value(Value::str(&function.def.name))
                }
                _ if self.has_native_method(object, name) => Found::Native,
                _ => Found::Missing(format!(
                    "'{}' object has no attribute '{}'",
                    self.heap.type_name(object),
                    name
                )),
            },
            Value::Builtin(builtin) if name == "__name__" => {
                Found::Value(Value::str(builtin.name()))
            }
            _ if self.has_native_method(object, name) => Found::Native,
            _ => Found::Missing(format!(
                "'{}' object has no attribute '{}'",
                self.heap.type_name(object),
                name
            )),
        };

        match found {
            Found::Value(value) => Ok(value),
            Found::Bind(attr) => Ok(self.bind_to(attr, object)),
            Found::Native => Ok(self.heap.alloc_value(HeapObject::NativeMethod {
                receiver: object.clone(),
                name: name.to_string(),
            })),
            Found::Missing(message) => Err(self.attribute_error(message)),
        }
    }

    /// `obj.name = value`
    pub(crate) fn set_attribute(
        &mut self,
        object: &Value,
        name: &str,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let type_name = self.heap.type_name(object);
        match object.address().and_then(|a| self.heap.get_mut(a)) {
            Some(HeapObject::Instance(instance)) => {
                instance.attrs.set(name, value);
                Ok(())
            }
            Some(HeapObject::Class(class)) if !class.builtin => {
                class.attrs.set(name, value);
                Ok(())
            }
            _ => Err(self.attribute_error(format!(
                "'{}' object has no attribute '{}'",
                type_name, name
            ))),
        }
    }

    /// `del obj.name`
    pub(crate) fn delete_attribute(
        &mut self,
        object: &Value,
        name: &str,
    ) -> Result<(), RuntimeError> {
        let type_name = self.heap.type_name(object);
        let removed = match object.address().and_then(|a| self.heap.get_mut(a)) {
            Some(HeapObject::Instance(instance)) => instance.attrs.remove(name),
            Some(HeapObject::Class(class)) => class.attrs.remove(name),
            _ => None,
        };
        match removed {
            Some(_) => Ok(()),
            None => Err(self.attribute_error(format!(
                "'{}' object has no attribute '{}'",
                type_name, name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Interpreter;
    use crate::memory::value::Value;
    use crate::parser::parse::Parser;

    fn run(source: &str) -> Result<Interpreter<'static>, String> {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .map_err(|e| e.to_string())?;
        let mut interp = Interpreter::new();
        interp.run(&program).map_err(|e| e.to_string())?;
        Ok(interp)
    }

    fn global_int(interp: &Interpreter<'_>, name: &str) -> Option<i64> {
        interp.global(name).and_then(|v| v.as_int())
    }

    #[test]
    fn test_keyword_and_default_arguments() {
        let source = "def f(a, b=10, *rest):\n    return a + b + len(rest)\nx = f(1)\ny = f(b=2, a=1)\nz = f(1, 2, 3, 4)\n";
        let interp = run(source).expect("runs");
        assert_eq!(global_int(&interp, "x"), Some(11));
        assert_eq!(global_int(&interp, "y"), Some(3));
        assert_eq!(global_int(&interp, "z"), Some(5));
    }

    #[test]
    fn test_argument_errors() {
        let err = run("def f(a, b):\n    pass\nf(1)\n").err().expect("fails");
        assert_eq!(err, "f() missing 1 required positional argument: 'b'");

        let err = run("def f(a):\n    pass\nf(1, 2)\n").err().expect("fails");
        assert_eq!(err, "f() takes 1 positional argument but 2 were given");

        let err = run("def f(a):\n    pass\nf(1, a=2)\n").err().expect("fails");
        assert_eq!(err, "f() got multiple values for argument 'a'");
    }

    #[test]
    fn test_methods_and_inheritance() {
        let source = "\
class Animal:
    def __init__(self, legs):
        self.legs = legs
    def describe(self):
        return self.legs * 10
class Bird(Animal):
    def __init__(self):
        super().__init__(2)
        self.wings = 2
    def describe(self):
        return super().describe() + self.wings
b = Bird()
score = b.describe()
";
        let interp = run(source).expect("runs");
        assert_eq!(global_int(&interp, "score"), Some(22));
    }

    #[test]
    fn test_missing_attribute_message() {
        let err = run("class Node:\n    pass\nn = Node()\nn.value\n").err().expect("fails");
        assert_eq!(err, "'Node' object has no attribute 'value'");
    }

    #[test]
    fn test_class_without_init_rejects_arguments() {
        let err = run("class Empty:\n    pass\nEmpty(1)\n").err().expect("fails");
        assert_eq!(err, "Empty() takes no arguments");
    }

    #[test]
    fn test_callable_instance() {
        let source = "class Adder:\n    def __call__(self, x):\n        return x + 1\nr = Adder()(4)\n";
        let interp = run(source).expect("runs");
        assert!(matches!(interp.global("r"), Some(Value::Int(5))));
    }
}
