// End-to-end traces of the demo programs

use serde_json::json;
use std::fs;
use std::path::Path;
use steptrace::interpreter::constants::UNSAFE_CODE_MESSAGE;
use steptrace::snapshot::{LinkedKind, LinkedRendering, LocalValue, ScopeKind, Snapshot, TypeTag};
use steptrace::{run, Trace, TraceEntry};

fn trace_demo(name: &str) -> Trace {
    let path = Path::new("demos").join(name);
    let source = fs::read_to_string(&path).expect("Failed to read demo file");
    run(&source)
}

fn snapshots(trace: &Trace) -> impl Iterator<Item = (&TraceEntry, &Snapshot)> {
    trace.iter().filter_map(|e| e.snapshot().map(|s| (e, s)))
}

fn last_module_snapshot(trace: &Trace) -> &Snapshot {
    snapshots(trace)
        .map(|(_, s)| s)
        .filter(|s| s.function == "<module>")
        .last()
        .expect("module snapshot")
}

fn linked(snapshot: &Snapshot, name: &str) -> LinkedRendering {
    match snapshot.locals.get(name) {
        Some(LocalValue::Linked(rendering)) => rendering.clone(),
        other => panic!("{} is not a linked rendering: {:?}", name, other),
    }
}

#[test]
fn test_primes_without_linked_state() {
    let trace = trace_demo("primes.py");

    let module: Vec<&Snapshot> = snapshots(&trace)
        .map(|(_, s)| s)
        .filter(|s| s.function == "<module>")
        .collect();
    assert!(module.iter().any(|s| s.locals.get("number") == Some(&LocalValue::Plain(json!(7)))));
    let last = module.last().expect("module snapshot");
    let names: Vec<&str> = last.locals.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["number", "result"]);
    assert_eq!(last.locals.get("result"), Some(&LocalValue::Plain(json!(true))));

    assert_eq!(
        trace.last(),
        Some(&TraceEntry::Print {
            output: "Prime? True".to_string()
        })
    );
    assert!(snapshots(&trace).all(|(_, s)| s.var_types.iter().all(|(_, t)| !t.is_linked())));
}

#[test]
fn test_nqueens_depth_and_branches() {
    let trace = trace_demo("nqueens.py");
    assert!(!trace.iter().any(|e| e.event() == "exception"));
    assert_eq!(
        trace.last(),
        Some(&TraceEntry::Print {
            output: "Solved: True [0, 2, 5, 7, 9, 4, 8, 1, 3, 6]".to_string()
        })
    );

    let mut open = Vec::new();
    for (entry, snapshot) in snapshots(&trace) {
        match entry.event() {
            "call" => {
                let before = open.last().copied().unwrap_or(0);
                assert_eq!(snapshot.depth, before + 1, "call at line {}", snapshot.line);
                open.push(snapshot.depth);
            }
            "return" if snapshot.function != "<module>" => {
                open.pop();
                assert_eq!(snapshot.depth, open.last().copied().unwrap_or(0));
            }
            _ => {}
        }
    }
    assert_eq!(last_module_snapshot(&trace).depth, 0);

    let branches: Vec<Option<bool>> = snapshots(&trace)
        .filter(|(e, s)| e.event() == "line" && s.scope == Some(ScopeKind::Conditional))
        .map(|(_, s)| s.branch_taken)
        .collect();
    assert!(branches.contains(&Some(true)));
    assert!(branches.contains(&Some(false)));
}

#[test]
fn test_singly_linked_list_rendering() {
    let trace = trace_demo("linked_list.py");
    let last = last_module_snapshot(&trace);
    assert_eq!(last.var_types.get("ll"), Some(&TypeTag::LinkedList));
    let rendering = serde_json::to_value(linked(last, "ll")).expect("serializes");
    assert_eq!(
        rendering,
        json!({
            "type": "linked_list",
            "head": 0,
            "nodes": [
                {"id": 0, "value": 5, "next": 1, "prev": null},
                {"id": 1, "value": 10, "next": 2, "prev": null},
                {"id": 2, "value": 20, "next": 3, "prev": null},
                {"id": 3, "value": 30, "next": null, "prev": null}
            ]
        })
    );
}

#[test]
fn test_doubly_linked_list_rendering() {
    let trace = trace_demo("doubly_linked_list.py");
    let last = last_module_snapshot(&trace);
    assert_eq!(last.var_types.get("dll"), Some(&TypeTag::DoublyLinkedList));
    assert_eq!(last.var_types.get("head"), Some(&TypeTag::DoublyLinkedNode));

    let rendering = linked(last, "dll");
    assert_eq!(rendering.kind, LinkedKind::DoublyLinkedList);

    let mut forward = Vec::new();
    let mut current = rendering.head;
    let mut tail = None;
    while let Some(id) = current {
        forward.push(rendering.nodes[id].value.clone());
        tail = Some(id);
        current = rendering.nodes[id].next;
    }
    let mut backward = Vec::new();
    let mut current = tail;
    while let Some(id) = current {
        backward.push(rendering.nodes[id].value.clone());
        current = rendering.nodes[id].prev;
    }
    assert_eq!(forward, vec![json!(5), json!(10), json!(20), json!(30)]);
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn test_name_independent_circular_chain() {
    let trace = trace_demo("molecule.py");
    let last = last_module_snapshot(&trace);
    assert_eq!(last.var_types.get("m"), Some(&TypeTag::LinkedList));

    let rendering = linked(last, "m");
    let links: Vec<(Option<usize>, Option<usize>)> =
        rendering.nodes.iter().map(|n| (n.next, n.prev)).collect();
    assert_eq!(links, vec![(Some(1), None), (Some(2), None), (Some(0), None)]);

    let encoded = serde_json::to_string(&trace).expect("serializes");
    for identifier in ["Atom", "Molecule", "bond", "center"] {
        assert!(!encoded.contains(&format!("\"type\":\"{}", identifier)));
    }
}

#[test]
fn test_unsafe_input() {
    let trace = run("import os\nprint(os.getcwd())\n");
    assert_eq!(
        serde_json::to_value(&trace).expect("serializes"),
        json!([{"event": "exception", "error": UNSAFE_CODE_MESSAGE}])
    );
}
