// Properties every trace must satisfy

use std::fs;
use std::path::Path;
use steptrace::interpreter::constants::{DENYLIST, EXECUTION_STACK_SIZE, UNSAFE_CODE_MESSAGE};
use steptrace::interpreter::engine::Interpreter;
use steptrace::interpreter::hook::{TraceEvent, TraceHook};
use steptrace::parser::parse::Parser;
use steptrace::snapshot::{LinkedRendering, LocalValue, TypeTag};
use steptrace::tracer::main_lines::{filter_code, MainLines};
use steptrace::tracer::recorder::{Arming, Recorder};
use steptrace::{run, Trace, TraceEntry};

const DEMOS: &[&str] = &[
    "primes.py",
    "nqueens.py",
    "linked_list.py",
    "doubly_linked_list.py",
    "molecule.py",
];

fn demo_source(name: &str) -> String {
    fs::read_to_string(Path::new("demos").join(name)).expect("Failed to read demo file")
}

fn renderings(trace: &Trace) -> Vec<LinkedRendering> {
    trace
        .iter()
        .filter_map(TraceEntry::snapshot)
        .flat_map(|s| s.locals.iter())
        .filter_map(|(_, value)| match value {
            LocalValue::Linked(rendering) => Some(rendering.clone()),
            LocalValue::Plain(_) => None,
        })
        .collect()
}

#[test]
fn test_traces_survive_json_round_trip() {
    let mut sources: Vec<String> = DEMOS.iter().map(|name| demo_source(name)).collect();
    sources.push("x = 1\ny = x / 0\n".to_string());
    sources.push("d = {1: [1.5, None], 'k': (True, 'v')}\nf = float('nan')\n".to_string());
    sources.push("x = (\n".to_string());

    for source in &sources {
        let trace = run(source);
        let text = serde_json::to_string(&trace).expect("serializes");
        let decoded: Trace = serde_json::from_str(&text).expect("deserializes");
        assert_eq!(serde_json::to_value(&decoded).ok(), serde_json::to_value(&trace).ok());
    }
}

#[test]
fn test_prelude_only_programs_produce_no_frame_events() {
    let source = "\"\"\"Docs.\"\"\"\nimport math\n\ndef f(x):\n    return x\n\nclass A:\n    pass\n";
    assert!(filter_code(source).expect("parses").is_empty());
    let trace = run(source);
    assert!(trace.iter().all(|entry| entry.snapshot().is_none()));

    let extended = format!("{}value = f(3)\n", source);
    let line = extended.lines().count();
    let lines = filter_code(&extended).expect("parses");
    assert!(lines.first().is_some_and(|&first| first <= line));
}

/// Forwards events to a recorder and counts those seen after arming
struct ArmingCounter {
    recorder: Recorder,
    after_arming: usize,
}

impl TraceHook for ArmingCounter {
    fn on_event(&mut self, interp: &mut Interpreter<'_>, event: TraceEvent) {
        let was_armed = self.recorder.state() == Arming::Armed;
        self.recorder.on_event(interp, event);
        if was_armed {
            self.after_arming += 1;
        }
    }
}

#[test]
fn test_no_event_is_skipped_once_armed() {
    let worker = std::thread::Builder::new()
        .stack_size(EXECUTION_STACK_SIZE)
        .spawn(count_events_after_arming)
        .expect("spawn");
    worker.join().expect("counter thread panicked");
}

fn count_events_after_arming() {
    for name in DEMOS {
        let source = demo_source(name);
        let program = Parser::new(&source)
            .and_then(|mut p| p.parse_program())
            .expect("Parsing failed");
        let mut counter = ArmingCounter {
            recorder: Recorder::new(&source, MainLines::from_program(&program)),
            after_arming: 0,
        };
        let mut interpreter = Interpreter::new();
        interpreter.set_trace(Some(&mut counter));
        interpreter.run(&program).expect("Execution failed");
        drop(interpreter);

        let ArmingCounter { recorder, after_arming } = counter;
        let recorded = recorder.into_trace().len();
        assert_eq!(recorded, after_arming + 1, "{}", name);
    }
}

#[test]
fn test_call_depth_balances() {
    let source = "def fact(n):\n    if n <= 1:\n        return 1\n    return n * fact(n - 1)\n\nx = 0\nx = fact(5)\ny = x\n";
    let trace = run(source);
    assert!(!trace.iter().any(|e| e.event() == "exception"));

    let mut open: Vec<usize> = Vec::new();
    for entry in &trace {
        let Some(snapshot) = entry.snapshot() else {
            continue;
        };
        match entry {
            TraceEntry::Call(_) => {
                assert_eq!(snapshot.depth, open.last().copied().unwrap_or(0) + 1);
                open.push(snapshot.depth);
            }
            TraceEntry::Return(_) if snapshot.function != "<module>" => {
                open.pop();
                assert_eq!(snapshot.depth, open.last().copied().unwrap_or(0));
            }
            _ => {}
        }
    }
    assert!(open.is_empty());
    let max_depth = trace.iter().filter_map(TraceEntry::snapshot).map(|s| s.depth).max();
    assert_eq!(max_depth, Some(5));
}

#[test]
fn test_renderings_are_canonical() {
    for name in ["linked_list.py", "doubly_linked_list.py", "molecule.py"] {
        let trace = run(&demo_source(name));
        let all = renderings(&trace);
        assert!(!all.is_empty(), "{}", name);
        for rendering in all {
            let k = rendering.nodes.len();
            if k == 0 {
                assert_eq!(rendering.head, None);
                continue;
            }
            assert_eq!(rendering.head, Some(0));
            for (i, node) in rendering.nodes.iter().enumerate() {
                assert_eq!(node.id, i);
                assert!(node.next.map_or(true, |n| n < k));
                assert!(node.prev.map_or(true, |p| p < k));
            }
        }
    }
}

#[test]
fn test_cycle_back_to_head_is_finite() {
    let source = "class Node:\n    def __init__(self, v):\n        self.v = v\n        self.next = None\n\nclass Ring:\n    def __init__(self):\n        self.head = None\n\nr = Ring()\nr.head = Node(1)\nr.head.next = Node(2)\nr.head.next.next = Node(3)\nr.head.next.next.next = r.head\ndone = True\n";
    let trace = run(source);
    let last = trace.iter().filter_map(TraceEntry::snapshot).last().expect("snapshot");
    match last.locals.get("r") {
        Some(LocalValue::Linked(rendering)) => {
            assert_eq!(rendering.nodes.len(), 3);
            assert_eq!(rendering.nodes[2].next, Some(0));
        }
        other => panic!("unexpected value {:?}", other),
    }
}

#[test]
fn test_detection_ignores_identifiers() {
    let original = demo_source("linked_list.py");
    let renamed = original
        .replace("LinkedList", "Molecule")
        .replace("Node", "Atom")
        .replace(".data", ".charge")
        .replace(".next", ".bond")
        .replace(".head", ".center");

    let shape = |trace: &Trace| -> (Vec<Vec<TypeTag>>, Vec<Vec<(Option<usize>, Option<usize>)>>) {
        let tags = trace
            .iter()
            .filter_map(TraceEntry::snapshot)
            .map(|s| s.var_types.iter().map(|(_, t)| t.clone()).collect())
            .collect();
        let links = renderings(trace)
            .iter()
            .map(|r| r.nodes.iter().map(|n| (n.next, n.prev)).collect())
            .collect();
        (tags, links)
    };

    let (tags_a, links_a) = shape(&run(&original));
    let (tags_b, links_b) = shape(&run(&renamed));
    let strip = |tags: Vec<Vec<TypeTag>>| -> Vec<Vec<TypeTag>> {
        tags.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|t| match t {
                        TypeTag::Other(_) => TypeTag::Other(String::new()),
                        t => t,
                    })
                    .collect()
            })
            .collect()
    };
    assert_eq!(strip(tags_a), strip(tags_b));
    assert_eq!(links_a, links_b);
}

#[test]
fn test_denylisted_input_runs_nothing() {
    for pattern in DENYLIST {
        let source = format!("x = 1\nprint('side effect')\n{}\n", pattern);
        assert_eq!(run(&source), vec![TraceEntry::exception(UNSAFE_CODE_MESSAGE)], "{}", pattern);
    }
}
