// Execution engine for the script interpreter

use crate::interpreter::builtins::Builtin;
use crate::interpreter::constants::{MODULE_FUNCTION_NAME, RECURSION_LIMIT};
use crate::interpreter::errors::{RuntimeError, EXCEPTION_HIERARCHY};
use crate::interpreter::hook::{FrameInfo, TraceEvent, TraceHook};
use crate::memory::heap::{Class, Heap, HeapObject, Namespace, Scope};
use crate::memory::stack::{FrameKind, Stack, StackFrame};
use crate::memory::value::{Address, Value};
use crate::parser::ast::*;
use rustc_hash::FxHashMap;

/// Pending non-local control transfer out of a statement block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return,
}

/// The main interpreter that executes a script
pub struct Interpreter<'a> {
    /// Object heap
    pub(crate) heap: Heap,

    /// Call stack
    pub(crate) stack: Stack,

    /// Scope holding module globals
    pub(crate) globals: Address,

    /// Built-in exception classes by name
    pub(crate) exception_classes: FxHashMap<String, Address>,

    /// Modules imported so far
    pub(crate) modules: FxHashMap<String, Address>,

    /// Everything `print` wrote
    pub(crate) output: String,

    /// Current source location being executed
    pub(crate) current_location: SourceLocation,

    /// Set by break/continue/return, consumed by the enclosing construct
    pub(crate) control_flow: ControlFlow,

    /// Value of the last `return`
    pub(crate) return_value: Value,

    /// Exceptions whose handlers are running, innermost last
    pub(crate) handled: Vec<RuntimeError>,

    /// Objects whose repr is being built, to print cycles as `[...]`
    pub(crate) repr_guard: Vec<Address>,

    /// Set while a hook inspects the frame; user functions refuse to run
    pub(crate) inspecting: bool,

    /// Condition of the `if` whose line event is being reported
    line_test: Option<Expr>,

    /// Installed frame event hook
    hook: Option<&'a mut dyn TraceHook>,
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let mut globals = Scope::default();
        globals.vars.set("__name__", Value::str("__main__"));
        let globals = heap.alloc(HeapObject::Scope(globals));

        let mut interp = Interpreter {
            heap,
            stack: Stack::new(),
            globals,
            exception_classes: FxHashMap::default(),
            modules: FxHashMap::default(),
            output: String::new(),
            current_location: SourceLocation::default(),
            control_flow: ControlFlow::Normal,
            return_value: Value::None,
            handled: Vec::new(),
            repr_guard: Vec::new(),
            inspecting: false,
            line_test: None,
            hook: None,
        };
        interp.install_exception_classes();
        interp
    }

    fn install_exception_classes(&mut self) {
        for (name, parent) in EXCEPTION_HIERARCHY {
            let bases: Vec<Address> = parent
                .and_then(|p| self.exception_classes.get(p).copied())
                .into_iter()
                .collect();
            let addr = self.heap.alloc(HeapObject::Class(Class {
                name: name.to_string(),
                bases: bases.clone(),
                mro: Vec::new(),
                attrs: Namespace::new(),
                builtin: true,
            }));
            let mro = self.heap.linearize(addr, &bases);
            if let Some(HeapObject::Class(class)) = self.heap.get_mut(addr) {
                class.mro = mro;
            }
            self.exception_classes.insert(name.to_string(), addr);
        }
    }

    /// Install or remove the frame event hook
    pub fn set_trace(&mut self, hook: Option<&'a mut dyn TraceHook>) {
        self.hook = hook;
    }

    /// Bind a module-level name before the program runs
    pub fn set_global(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.heap.scope_mut(self.globals) {
            scope.vars.set(name, value);
        }
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.heap.scope(self.globals)?.vars.get(name).cloned()
    }

    /// Allocate a list on the heap
    pub fn new_list(&mut self, items: Vec<Value>) -> Value {
        self.heap.alloc_value(HeapObject::List(items))
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Text written by `print` so far
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Run the program from start to finish
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let frame = StackFrame::new(
            MODULE_FUNCTION_NAME.to_string(),
            FrameKind::Module,
            self.globals,
            0,
        );
        self.run_frame(frame, &program.body).map(|_| ())
    }

    /// Push a frame, execute a body in it and pop it again.
    ///
    /// Fires `call` before the body and `return` after it, including when an
    /// exception unwinds through the frame. Function scopes nothing captured are
    /// released; class body scopes are left for the caller to collect.
    pub(crate) fn run_frame(
        &mut self,
        frame: StackFrame,
        body: &[Stmt],
    ) -> Result<Value, RuntimeError> {
        if self.stack.depth() >= RECURSION_LIMIT {
            if frame.kind == FrameKind::Function {
                self.heap.free(frame.locals);
            }
            return Err(RuntimeError::RecursionLimit {
                location: self.current_location,
            });
        }

        let saved_location = self.current_location;
        self.stack.push_frame(frame);
        self.fire(TraceEvent::Call);

        let result = self.execute_block(body);
        let flow = std::mem::replace(&mut self.control_flow, ControlFlow::Normal);
        let value = std::mem::take(&mut self.return_value);

        self.fire(TraceEvent::Return);
        if let Some(frame) = self.stack.pop_frame() {
            if frame.kind == FrameKind::Function && !frame.captured {
                self.heap.free(frame.locals);
            }
        }

        result?;
        self.current_location = saved_location;
        Ok(if flow == ControlFlow::Return { value } else { Value::None })
    }

    /// Execute statements until one of them transfers control
    pub(crate) fn execute_block(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.execute_statement(stmt)?;
            if self.control_flow != ControlFlow::Normal {
                break;
            }
        }
        Ok(())
    }

    /// Record that `line` starts executing in the current frame.
    ///
    /// Fires a `line` event when the line differs from the last reported one,
    /// or always when `force` is set (loop headers re-evaluated on each pass).
    pub(crate) fn mark_line(&mut self, line: usize, force: bool) {
        let Some(frame) = self.stack.current_frame_mut() else {
            return;
        };
        frame.line = line;
        if !force && frame.event_line == Some(line) {
            return;
        }
        frame.event_line = Some(line);
        self.fire(TraceEvent::Line);
    }

    /// [`Self::mark_line`] for an `if` header, exposing its condition to the hook
    pub(crate) fn mark_condition_line(&mut self, line: usize, test: &Expr) {
        if self.hook.is_some() {
            self.line_test = Some(test.clone());
        }
        self.mark_line(line, false);
        self.line_test = None;
    }

    fn fire(&mut self, event: TraceEvent) {
        if let Some(hook) = self.hook.take() {
            hook.on_event(self, event);
            self.hook = Some(hook);
        }
    }

    // ===== Frame inspection (used by trace hooks) =====

    /// Function name, line and kind of the running frame
    pub fn current_frame(&self) -> Option<FrameInfo> {
        self.stack.current_frame().map(|frame| FrameInfo {
            function: frame.function_name.clone(),
            line: frame.line,
            kind: frame.kind,
        })
    }

    /// Bindings of the running frame in the order they were made
    pub fn frame_bindings(&self) -> Vec<(String, Value)> {
        self.stack
            .current_frame()
            .and_then(|frame| self.heap.scope(frame.locals))
            .map(|scope| {
                scope
                    .vars
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Condition of the `if` statement whose `line` event is being reported
    pub fn line_condition(&self) -> Option<&Expr> {
        self.line_test.as_ref()
    }

    /// Evaluate an expression against the running frame's scopes.
    ///
    /// User-defined functions, dunder methods included, are not run: reaching
    /// one fails the evaluation instead.
    pub fn eval_in_frame(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.inspect(|interp| interp.evaluate_expr(expr))
    }

    /// Truthiness of `expr` in the running frame, under the rules of [`Self::eval_in_frame`]
    pub fn test_in_frame(&mut self, expr: &Expr) -> Result<bool, RuntimeError> {
        self.inspect(|interp| {
            let value = interp.evaluate_expr(expr)?;
            interp.truthy(&value)
        })
    }

    fn inspect<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        let saved_location = self.current_location;
        let was_inspecting = std::mem::replace(&mut self.inspecting, true);
        let result = f(self);
        self.inspecting = was_inspecting;
        self.current_location = saved_location;
        result
    }

    /// Resolve a name the way the running frame would, without raising
    pub fn resolve_name(&self, name: &str) -> Option<Value> {
        self.lookup_name(name).ok()
    }

    // ===== Name resolution =====

    fn current_scope(&self) -> Address {
        self.stack
            .current_frame()
            .map(|frame| frame.locals)
            .unwrap_or(self.globals)
    }

    /// Local scope chain, then globals, then builtins
    pub(crate) fn lookup_name(&self, name: &str) -> Result<Value, RuntimeError> {
        let declared_global = self
            .stack
            .current_frame()
            .is_some_and(|frame| frame.globals.contains(name));

        if !declared_global {
            let mut scope = Some(self.current_scope());
            while let Some(addr) = scope {
                let Some(current) = self.heap.scope(addr) else {
                    break;
                };
                if let Some(value) = current.vars.get(name) {
                    return Ok(value.clone());
                }
                scope = current.parent;
            }
        }

        if let Some(value) = self.global(name) {
            return Ok(value);
        }

        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Value::Builtin(builtin));
        }
        if let Some(&class) = self.exception_classes.get(name) {
            return Ok(Value::Ref(class));
        }

        Err(RuntimeError::UndefinedVariable {
            name: name.to_string(),
            location: self.current_location,
        })
    }

    /// Scope an assignment to `name` writes to in the running frame
    fn target_scope(&self, name: &str) -> Result<Address, RuntimeError> {
        let Some(frame) = self.stack.current_frame() else {
            return Ok(self.globals);
        };
        if frame.globals.contains(name) {
            return Ok(self.globals);
        }
        if frame.nonlocals.contains(name) {
            let mut scope = self.heap.scope(frame.locals).and_then(|s| s.parent);
            while let Some(addr) = scope {
                let Some(current) = self.heap.scope(addr) else {
                    break;
                };
                if current.vars.contains(name) {
                    return Ok(addr);
                }
                scope = current.parent;
            }
            return Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location: self.current_location,
            });
        }
        Ok(frame.locals)
    }

    pub(crate) fn assign_name(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let addr = self.target_scope(name)?;
        if let Some(scope) = self.heap.scope_mut(addr) {
            scope.vars.set(name, value);
        }
        Ok(())
    }

    pub(crate) fn delete_name(&mut self, name: &str) -> Result<(), RuntimeError> {
        let addr = self.target_scope(name)?;
        let removed = self
            .heap
            .scope_mut(addr)
            .and_then(|scope| scope.vars.remove(name));
        if removed.is_none() {
            return Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                location: self.current_location,
            });
        }
        Ok(())
    }

    /// Closure scope for a function or class defined in the running frame.
    ///
    /// Functions defined in a function capture its scope; class bodies are
    /// skipped so methods see the scope around the class.
    pub(crate) fn closure_for_definition(&mut self) -> Option<Address> {
        let frame = self.stack.current_frame_mut()?;
        match frame.kind {
            FrameKind::Module => None,
            FrameKind::Function => {
                frame.captured = true;
                Some(frame.locals)
            }
            FrameKind::Class => {
                let locals = frame.locals;
                self.heap.scope(locals).and_then(|s| s.parent)
            }
        }
    }

    // ===== Error helpers =====

    pub(crate) fn type_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::type_error(message, self.current_location)
    }

    pub(crate) fn value_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::value_error(message, self.current_location)
    }

    pub(crate) fn index_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::index_error(message, self.current_location)
    }

    pub(crate) fn attribute_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::MissingAttribute {
            message: message.into(),
            location: self.current_location,
        }
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn run(source: &str) -> (Interpreter<'static>, Result<(), RuntimeError>) {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("parse failed");
        let mut interp = Interpreter::new();
        let result = interp.run(&program);
        (interp, result)
    }

    #[derive(Default)]
    struct EventLog {
        events: Vec<(TraceEvent, String, usize)>,
    }

    impl TraceHook for EventLog {
        fn on_event(&mut self, interp: &mut Interpreter<'_>, event: TraceEvent) {
            if let Some(frame) = interp.current_frame() {
                self.events.push((event, frame.function, frame.line));
            }
        }
    }

    fn events(source: &str) -> Vec<(TraceEvent, String, usize)> {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("parse failed");
        let mut log = EventLog::default();
        let mut interp = Interpreter::new();
        interp.set_trace(Some(&mut log));
        let _ = interp.run(&program);
        drop(interp);
        log.events
    }

    #[test]
    fn test_globals_and_output() {
        let (interp, result) = run("x = 2\ny = x * 21\nprint('y is', y)\n");
        assert!(result.is_ok());
        assert!(matches!(interp.global("y"), Some(Value::Int(42))));
        assert_eq!(interp.output(), "y is 42\n");
    }

    #[test]
    fn test_undefined_name() {
        let (_, result) = run("print(missing)\n");
        let err = result.expect_err("should fail");
        assert_eq!(err.to_string(), "name 'missing' is not defined");
        assert_eq!(err.location().line, 1);
    }

    #[test]
    fn test_closures_and_nonlocal() {
        let source = "\
def counter():
    count = 0
    def bump():
        nonlocal count
        count += 1
        return count
    return bump
c = counter()
c()
total = c()
";
        let (interp, result) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        assert!(matches!(interp.global("total"), Some(Value::Int(2))));
    }

    #[test]
    fn test_global_declaration() {
        let (interp, result) = run("n = 1\ndef f():\n    global n\n    n = 5\nf()\n");
        assert!(result.is_ok());
        assert!(matches!(interp.global("n"), Some(Value::Int(5))));
    }

    #[test]
    fn test_recursion_limit() {
        // Run on a large-stack thread, as `tracer::run` does; the default
        // test thread stack is too small for RECURSION_LIMIT in debug builds.
        std::thread::Builder::new()
            .stack_size(crate::interpreter::constants::EXECUTION_STACK_SIZE)
            .spawn(|| {
                let (_, result) = run("def f(n):\n    return f(n + 1)\nf(0)\n");
                let err = result.expect_err("should overflow");
                assert_eq!(err.kind_name(), "RecursionError");
            })
            .expect("spawn test thread")
            .join()
            .unwrap();
    }

    #[test]
    fn test_event_sequence_for_call() {
        let log = events("def f(a):\n    b = a + 1\n    return b\nx = f(1)\n");
        let kinds: Vec<_> = log.iter().map(|(e, f, l)| (e.as_str(), f.as_str(), *l)).collect();
        assert_eq!(
            kinds,
            vec![
                ("call", "<module>", 0),
                ("line", "<module>", 1),
                ("line", "<module>", 4),
                ("call", "f", 1),
                ("line", "f", 2),
                ("line", "f", 3),
                ("return", "f", 3),
                ("return", "<module>", 4),
            ]
        );
    }

    #[test]
    fn test_loop_header_fires_once_per_fetch() {
        let log = events("for i in range(3):\n    pass\n");
        let header_lines = log
            .iter()
            .filter(|(e, _, l)| *e == TraceEvent::Line && *l == 1)
            .count();
        assert_eq!(header_lines, 4);
    }

    #[test]
    fn test_statements_sharing_a_line_fire_once() {
        let log = events("a = 1; b = 2\n");
        let lines = log.iter().filter(|(e, _, _)| *e == TraceEvent::Line).count();
        assert_eq!(lines, 1);
    }

    #[test]
    fn test_return_fires_when_exception_unwinds() {
        let log = events("def f():\n    return 1 / 0\nf()\n");
        let returns: Vec<_> = log
            .iter()
            .filter(|(e, _, _)| *e == TraceEvent::Return)
            .map(|(_, f, _)| f.as_str())
            .collect();
        assert_eq!(returns, vec!["f", "<module>"]);
    }
}
