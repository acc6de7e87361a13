//! Frame event hook that turns events into trace entries
//!
//! The [`Recorder`] stays silent until user state first becomes observable on
//! a main line. From then on every `call`, `line` and `return` event is
//! recorded with a snapshot of the frame's bindings.

use super::main_lines::MainLines;
use super::scope::{condition_of, scope_of, Condition};
use crate::interpreter::constants::CODE_LINES_GLOBAL;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::hook::{FrameInfo, TraceEvent, TraceHook};
use crate::memory::heap::{Heap, HeapObject};
use crate::memory::value::Value;
use crate::parser::ast::{Argument, Expr, FStringPart};
use crate::parser::parse::Parser;
use crate::snapshot::{Bindings, LocalValue, ScopeKind, Snapshot, Trace, TraceEntry, TypeTag};
use crate::structure::{classify, render, settle_tag, to_json};
use tracing::{debug, trace};

/// Whether snapshots are being taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arming {
    Unarmed,
    Armed,
}

/// Records trace entries for one run
pub struct Recorder {
    lines: Vec<String>,
    main_lines: MainLines,
    start_at: usize,
    state: Arming,
    depth: usize,
    /// One flag per open frame: whether its `call` was recorded
    open_calls: Vec<bool>,
    entries: Trace,
}

impl Recorder {
    pub fn new(source: &str, main_lines: MainLines) -> Self {
        let start_at = main_lines.start_at();
        Recorder {
            lines: source.lines().map(str::to_string).collect(),
            main_lines,
            start_at,
            state: Arming::Unarmed,
            depth: 0,
            open_calls: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn state(&self) -> Arming {
        self.state
    }

    pub fn into_trace(self) -> Trace {
        self.entries
    }

    /// Gating: skip the module prelude, then wait for observable user state
    fn should_record(&mut self, interp: &Interpreter<'_>, frame: &FrameInfo) -> bool {
        if frame.is_module() && frame.line < self.start_at {
            return false;
        }
        if self.state == Arming::Armed {
            return true;
        }
        if !self.main_lines.contains(frame.line) {
            return false;
        }
        let has_user_state = interp
            .frame_bindings()
            .iter()
            .any(|(name, value)| !name.starts_with("__") && !interp.heap().is_callable(value));
        if has_user_state {
            debug!(line = frame.line, function = %frame.function, "tracing armed");
            self.state = Arming::Armed;
        }
        has_user_state
    }

    /// Text of a source line, falling back to the copy the program carries
    fn source_line(&self, interp: &Interpreter<'_>, line: usize) -> String {
        let index = line.wrapping_sub(1);
        if let Some(text) = self.lines.get(index) {
            return text.trim().to_string();
        }
        let heap = interp.heap();
        interp
            .global(CODE_LINES_GLOBAL)
            .and_then(|lines| match lines.address().and_then(|a| heap.get(a)) {
                Some(HeapObject::List(items)) => items
                    .get(index)
                    .and_then(|v| v.as_str())
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn snapshot(
        &self,
        interp: &mut Interpreter<'_>,
        event: TraceEvent,
        frame: &FrameInfo,
    ) -> Snapshot {
        let source = self.source_line(interp, frame.line);
        let scope = scope_of(&source, event);
        let branch_taken = if event == TraceEvent::Line && scope == Some(ScopeKind::Conditional) {
            branch_outcome(interp, &source)
        } else {
            None
        };

        let heap = interp.heap();
        let mut locals = Bindings::new();
        let mut var_types = Bindings::new();
        for (name, value) in interp.frame_bindings() {
            if is_hidden(&name) || heap.is_callable(&value) {
                continue;
            }
            let (tag, local) = describe(heap, &value);
            locals.push(name.clone(), local);
            var_types.push(name, tag);
        }

        Snapshot {
            line: frame.line,
            function: frame.function.clone(),
            locals,
            var_types,
            scope,
            depth: self.depth,
            branch_taken,
        }
    }
}

impl TraceHook for Recorder {
    fn on_event(&mut self, interp: &mut Interpreter<'_>, event: TraceEvent) {
        let Some(frame) = interp.current_frame() else {
            return;
        };
        let recorded = self.should_record(interp, &frame);
        match event {
            TraceEvent::Call => {
                self.open_calls.push(recorded);
                if recorded {
                    self.depth += 1;
                }
            }
            TraceEvent::Return => {
                if self.open_calls.pop().unwrap_or(false) {
                    self.depth = self.depth.saturating_sub(1);
                }
            }
            TraceEvent::Line => {}
        }
        if !recorded {
            trace!(event = event.as_str(), line = frame.line, "event skipped");
            return;
        }

        let snapshot = self.snapshot(interp, event, &frame);
        trace!(
            event = event.as_str(),
            line = snapshot.line,
            depth = snapshot.depth,
            "event recorded"
        );
        self.entries.push(match event {
            TraceEvent::Call => TraceEntry::Call(snapshot),
            TraceEvent::Line => TraceEntry::Line(snapshot),
            TraceEvent::Return => TraceEntry::Return(snapshot),
        });
    }
}

/// Bindings the runtime adds on its own
fn is_hidden(name: &str) -> bool {
    name == CODE_LINES_GLOBAL || (name.starts_with("__") && name.ends_with("__"))
}

/// Tag and JSON view of one binding
fn describe(heap: &Heap, value: &Value) -> (TypeTag, LocalValue) {
    let tag = classify(heap, value);
    if tag.is_linked() {
        let rendering = render(heap, value, &tag);
        return (settle_tag(tag, &rendering), LocalValue::Linked(rendering));
    }
    if tag == TypeTag::Constructing {
        let sentinel = format!("<{} constructing...>", heap.type_name(value));
        return (tag, LocalValue::Plain(serde_json::Value::String(sentinel)));
    }
    (tag, LocalValue::Plain(to_json(heap, value)))
}

/// Re-evaluate the condition of an `if`/`elif` line, or report `else` as taken.
///
/// The interpreter hands over the parsed condition of the `if` being
/// reported; the line text is the fallback. Conditions that would run user
/// code are not evaluated.
fn branch_outcome(interp: &mut Interpreter<'_>, source: &str) -> Option<bool> {
    if let Some(test) = interp.line_condition().cloned() {
        return evaluate_condition(interp, &test);
    }
    let text = match condition_of(source)? {
        Condition::Else => return Some(true),
        Condition::Test(text) => text,
    };
    let expr = Parser::parse_standalone_expression(text).ok()?;
    evaluate_condition(interp, &expr)
}

fn evaluate_condition(interp: &mut Interpreter<'_>, expr: &Expr) -> Option<bool> {
    if !is_pure(interp, expr) {
        debug!("condition not evaluated: not side-effect free");
        return None;
    }
    match interp.test_in_frame(expr) {
        Ok(taken) => Some(taken),
        Err(err) => {
            debug!(error = %err, "condition not evaluated");
            None
        }
    }
}

/// No calls except to side-effect free builtins, no lambdas, no comprehensions
fn is_pure(interp: &Interpreter<'_>, expr: &Expr) -> bool {
    let pure = |e: &Expr| is_pure(interp, e);
    match expr {
        Expr::None
        | Expr::Bool(_)
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::Name(_) => true,
        Expr::FString(parts) => parts.iter().all(|part| match part {
            FStringPart::Literal(_) => true,
            FStringPart::Field { expr, .. } => pure(expr),
        }),
        Expr::Tuple(items) | Expr::List(items) | Expr::Set(items) => items.iter().all(pure),
        Expr::Dict(pairs) => pairs.iter().all(|(k, v)| pure(k) && pure(v)),
        Expr::Attribute { object, .. } => pure(object.as_ref()),
        Expr::Subscript { object, index } => pure(object.as_ref()) && pure(index.as_ref()),
        Expr::Slice { lower, upper, step } => [lower, upper, step]
            .into_iter()
            .flatten()
            .all(|e| pure(e.as_ref())),
        Expr::Unary { operand, .. } => pure(operand.as_ref()),
        Expr::Binary { left, right, .. } | Expr::BoolOp { left, right, .. } => {
            pure(left.as_ref()) && pure(right.as_ref())
        }
        Expr::Compare { left, comparisons } => {
            pure(left.as_ref()) && comparisons.iter().all(|(_, e)| pure(e))
        }
        Expr::IfExp { test, body, orelse } => {
            pure(test.as_ref()) && pure(body.as_ref()) && pure(orelse.as_ref())
        }
        Expr::Call { func, args } => {
            let callee_pure = match func.as_ref() {
                Expr::Name(name) => {
                    matches!(interp.resolve_name(name), Some(Value::Builtin(b)) if b.is_pure())
                }
                _ => false,
            };
            callee_pure
                && args.iter().all(|arg| match arg {
                    Argument::Positional(e) | Argument::Keyword(_, e) | Argument::Star(e) => {
                        pure(e)
                    }
                })
        }
        Expr::Lambda(_)
        | Expr::ListComp { .. }
        | Expr::SetComp { .. }
        | Expr::DictComp { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn record(source: &str) -> (Trace, Arming) {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("program parses");
        let mut recorder = Recorder::new(source, MainLines::from_program(&program));
        let mut interp = Interpreter::new();
        interp.set_trace(Some(&mut recorder));
        let _ = interp.run(&program);
        drop(interp);
        let state = recorder.state();
        (recorder.into_trace(), state)
    }

    fn lines_of(trace: &Trace) -> Vec<(&'static str, usize)> {
        trace
            .iter()
            .filter_map(|e| e.snapshot().map(|s| (e.event(), s.line)))
            .collect()
    }

    #[test]
    fn test_arms_on_first_observable_state() {
        let (trace, state) = record("def f():\n    return 1\nx = 1\ny = 2\n");
        assert_eq!(state, Arming::Armed);
        // Line 3 runs before `x` exists, so line 4 is the first recorded event
        assert_eq!(lines_of(&trace), vec![("line", 4), ("return", 4)]);
    }

    #[test]
    fn test_definitions_only_never_arm() {
        let (trace, state) = record("def f():\n    return 1\n\nclass A:\n    pass\n");
        assert_eq!(state, Arming::Unarmed);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_call_depth_and_scope() {
        let source = "def add(a, b):\n    return a + b\nx = 1\ny = add(x, 2)\nz = y\n";
        let (trace, _) = record(source);
        let call = trace
            .iter()
            .find(|e| e.event() == "call")
            .and_then(|e| e.snapshot())
            .expect("call recorded");
        assert_eq!(call.function, "add");
        assert_eq!(call.depth, 1);
        assert_eq!(call.scope, Some(ScopeKind::Function));
        assert_eq!(call.line, 1);

        let last = trace.last().and_then(|e| e.snapshot()).expect("snapshot");
        assert_eq!(last.depth, 0);
    }

    #[test]
    fn test_hidden_and_callable_bindings_are_dropped() {
        let (trace, _) = record("def f():\n    pass\nx = [1, 2]\ny = x\n");
        let snapshot = trace.first().and_then(|e| e.snapshot()).expect("snapshot");
        let names: Vec<&str> = snapshot.locals.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x"]);
        assert_eq!(snapshot.var_types.get("x"), Some(&TypeTag::Array));
    }

    #[test]
    fn test_branch_outcomes() {
        let source = "x = 5\nif x > 10:\n    y = 1\nelif x > 3:\n    y = 2\nelse:\n    y = 3\n";
        let (trace, _) = record(source);
        let outcomes: Vec<(usize, Option<bool>)> = trace
            .iter()
            .filter_map(|e| e.snapshot())
            .filter(|s| s.scope == Some(ScopeKind::Conditional))
            .map(|s| (s.line, s.branch_taken))
            .collect();
        assert_eq!(outcomes, vec![(2, Some(false)), (4, Some(true))]);
    }

    #[test]
    fn test_impure_conditions_are_not_evaluated() {
        let source = "items = []\ndef grow():\n    items.append(1)\n    return True\nif grow():\n    pass\n";
        let (trace, _) = record(source);
        let header = trace
            .iter()
            .filter_map(|e| e.snapshot())
            .find(|s| s.line == 5 && s.scope == Some(ScopeKind::Conditional))
            .expect("header recorded");
        assert_eq!(header.branch_taken, None);
        let last = trace.last().and_then(|e| e.snapshot()).expect("snapshot");
        assert_eq!(last.locals.get("items"), Some(&LocalValue::Plain(serde_json::json!([1]))));
    }

    #[test]
    fn test_condition_dunders_run_once() {
        let source = "\
class K:
    def __eq__(self, other):
        calls.append(1)
        print('eq ran')
        return True

class Sized:
    def __len__(self):
        log.append('len')
        return 2

calls = []
log = []
a = K()
b = K()
if a == b:
    hit = True
s = Sized()
if len(s):
    hit = False
";
        let trace = crate::tracer::run(source);
        let last = trace.iter().filter_map(|e| e.snapshot()).last().expect("snapshot");
        assert_eq!(last.locals.get("calls"), Some(&LocalValue::Plain(serde_json::json!([1]))));
        assert_eq!(last.locals.get("log"), Some(&LocalValue::Plain(serde_json::json!(["len"]))));
        assert_eq!(trace.last(), Some(&TraceEntry::Print { output: "eq ran".to_string() }));

        let headers: Vec<Option<bool>> = trace
            .iter()
            .filter(|e| e.event() == "line")
            .filter_map(|e| e.snapshot())
            .filter(|s| s.scope == Some(ScopeKind::Conditional))
            .map(|s| s.branch_taken)
            .collect();
        assert_eq!(headers, vec![None, None]);
    }

    #[test]
    fn test_single_line_and_wrapped_conditions() {
        let source = "x = 5\nif x > 3: y = 1\nif (x > 3 and\n        x < 4):\n    y = 2\n";
        let (trace, _) = record(source);
        let outcomes: Vec<(usize, Option<bool>)> = trace
            .iter()
            .filter(|e| e.event() == "line")
            .filter_map(|e| e.snapshot())
            .filter(|s| s.scope == Some(ScopeKind::Conditional))
            .map(|s| (s.line, s.branch_taken))
            .collect();
        assert_eq!(outcomes, vec![(2, Some(true)), (3, Some(false))]);
    }

    #[test]
    fn test_constructing_sentinel() {
        let source = "class Box:\n    def __init__(self):\n        self.v = 1\nb = 0\nb = Box()\n";
        let (trace, _) = record(source);
        let sentinel = trace
            .iter()
            .filter_map(|e| e.snapshot())
            .find(|s| {
                s.function == "__init__"
                    && s.var_types.get("self") == Some(&TypeTag::Constructing)
            })
            .and_then(|s| s.locals.get("self").cloned());
        assert_eq!(
            sentinel,
            Some(LocalValue::Plain(serde_json::json!("<Box constructing...>")))
        );
    }
}
