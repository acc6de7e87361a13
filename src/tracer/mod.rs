//! Trace driver
//!
//! [`run`] takes source text and returns the complete [`Trace`] of one
//! execution. Every call owns its own interpreter and [`recorder::Recorder`],
//! so runs never share state.
//!
//! - [`safety`]: denylist check applied before anything is parsed
//! - [`main_lines`]: top-level lines tracing may start on
//! - [`recorder`]: the frame event hook that builds snapshots
//! - [`scope`]: syntactic scope and condition of a source line
//! - [`request`]: request/response contract for an HTTP front end

pub mod main_lines;
pub mod recorder;
pub mod request;
pub mod safety;
pub mod scope;

use crate::interpreter::constants::{
    CODE_LINES_GLOBAL, EXECUTION_STACK_SIZE, PSEUDO_FILENAME, UNSAFE_CODE_MESSAGE,
};
use crate::interpreter::engine::Interpreter;
use crate::memory::value::Value;
use crate::parser::parse::Parser;
use crate::snapshot::{Trace, TraceEntry};
use main_lines::MainLines;
use recorder::Recorder;
use safety::is_safe;
use std::thread;
use tracing::{debug, warn};

/// Execute `code` and return its trace.
///
/// User code runs on a dedicated thread with a large stack so deep recursion
/// reaches the interpreter's recursion limit instead of overflowing.
pub fn run(code: &str) -> Trace {
    let source = code.to_string();
    let worker = thread::Builder::new()
        .name("steptrace-run".to_string())
        .stack_size(EXECUTION_STACK_SIZE)
        .spawn(move || trace_source(&source));
    match worker {
        Ok(handle) => handle.join().unwrap_or_else(|_| {
            vec![TraceEntry::exception("internal error: tracer thread panicked")]
        }),
        Err(err) => {
            warn!(error = %err, "could not spawn tracer thread, running inline");
            trace_source(code)
        }
    }
}

/// [`run`], serialized
pub fn run_to_json(code: &str) -> serde_json::Value {
    serde_json::to_value(run(code))
        .unwrap_or_else(|err| serde_json::json!({ "error": err.to_string() }))
}

fn trace_source(code: &str) -> Trace {
    let span = tracing::debug_span!("run", file = PSEUDO_FILENAME);
    let _entered = span.enter();

    if !is_safe(code) {
        return vec![TraceEntry::exception(UNSAFE_CODE_MESSAGE)];
    }

    let program = match Parser::new(code).and_then(|mut parser| parser.parse_program()) {
        Ok(program) => program,
        Err(err) => {
            debug!(error = %err, "parse failed");
            return vec![TraceEntry::exception(err.to_string())];
        }
    };

    let main_lines = MainLines::from_program(&program);
    debug!(start_at = main_lines.start_at(), statements = program.body.len(), "program parsed");
    let mut recorder = Recorder::new(code, main_lines);

    let mut interp = Interpreter::new();
    let code_lines = interp.new_list(code.lines().map(Value::str).collect());
    interp.set_global(CODE_LINES_GLOBAL, code_lines);
    interp.set_trace(Some(&mut recorder));
    let result = interp.run(&program);
    interp.set_trace(None);
    let output = interp.output().trim().to_string();
    drop(interp);

    let mut trace = recorder.into_trace();
    debug!(entries = trace.len(), failed = result.is_err(), "execution finished");
    if !output.is_empty() {
        trace.push(TraceEntry::Print { output });
    }
    if let Err(err) = result {
        trace.push(TraceEntry::exception(err.to_string()));
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_code_runs_nothing() {
        let trace = run("import os\nprint('hi')\n");
        assert_eq!(trace, vec![TraceEntry::exception(UNSAFE_CODE_MESSAGE)]);
    }

    #[test]
    fn test_parse_error_is_single_entry() {
        let trace = run("x = = 1\n");
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].event(), "exception");
    }

    #[test]
    fn test_print_precedes_exception() {
        let trace = run("x = 1\nprint('before')\ny = x / 0\n");
        let tail: Vec<&str> = trace.iter().rev().take(2).map(TraceEntry::event).collect();
        assert_eq!(tail, vec!["exception", "print"]);
        assert_eq!(
            trace.last(),
            Some(&TraceEntry::exception("division by zero"))
        );
        assert!(trace.contains(&TraceEntry::Print { output: "before".to_string() }));
    }

    #[test]
    fn test_code_lines_are_hidden() {
        let trace = run("x = 1\ny = 2\n");
        assert!(trace
            .iter()
            .filter_map(TraceEntry::snapshot)
            .all(|s| s.locals.get(CODE_LINES_GLOBAL).is_none()));
    }

    #[test]
    fn test_json_shape() {
        let json = run_to_json("x = 1\ny = 2\n");
        assert_eq!(json[0]["event"], "line");
        assert_eq!(json[0]["locals"]["x"], 1);
        assert_eq!(json[0]["var_types"]["x"], "primitive");
        assert_eq!(json[0]["depth"], 0);
    }
}
