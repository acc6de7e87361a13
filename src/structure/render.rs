//! Canonical node-array rendering of linked lists
//!
//! The walk starts at the head node and follows at most one new object per
//! node. Nodes get ids `0..k` in visiting order. On a node with two or more
//! link slots, a reference back to the node just visited is recorded as
//! `prev`; any other reference to a visited node closes a cycle and is
//! recorded as `next`. The walk stops at a node with no unvisited successor,
//! on a cycle, or after [`MAX_RENDERED_NODES`] nodes.

use super::classify::container_head;
use super::json::to_json;
use super::shape::{analyze, attrs_of, has_attribute_dict};
use crate::interpreter::constants::MAX_RENDERED_NODES;
use crate::memory::heap::Heap;
use crate::memory::value::{Address, Value};
use crate::snapshot::{LinkedKind, LinkedRendering, RenderedNode, TypeTag};
use thiserror::Error;

/// Why a rendering could not be completed.
///
/// Links are followed only to live objects, so a walk fails only when the
/// value handed in is itself gone from the heap.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("reference to freed object at {0:#x}")]
    DanglingReference(Address),
}

/// Render the linked structure `value` was tagged as.
///
/// Failures degrade to an empty rendering carrying the error message.
pub fn render(heap: &Heap, value: &Value, tag: &TypeTag) -> LinkedRendering {
    let kind = match tag {
        TypeTag::DoublyLinkedList | TypeTag::DoublyLinkedNode => LinkedKind::DoublyLinkedList,
        _ => LinkedKind::LinkedList,
    };
    match try_render(heap, value, tag, kind) {
        Ok(rendering) => rendering,
        Err(err) => {
            tracing::warn!(error = %err, "linked rendering failed");
            LinkedRendering {
                error: Some(err.to_string()),
                ..LinkedRendering::empty(kind)
            }
        }
    }
}

/// Tag to report once the rendering is known: back links found during the
/// walk upgrade a singly linked tag to its doubly linked counterpart
pub fn settle_tag(tag: TypeTag, rendering: &LinkedRendering) -> TypeTag {
    if rendering.kind == LinkedKind::DoublyLinkedList {
        tag.to_doubly()
    } else {
        tag
    }
}

/// Node the traversal starts from
fn find_head(heap: &Heap, value: &Value, tag: &TypeTag) -> Option<Value> {
    if tag.is_container() {
        return container_head(heap, value, &analyze(heap, value));
    }
    if tag.is_linked() || analyze(heap, value).passes_node_test() {
        return Some(value.clone());
    }
    None
}

fn try_render(
    heap: &Heap,
    value: &Value,
    tag: &TypeTag,
    kind: LinkedKind,
) -> Result<LinkedRendering, RenderError> {
    let mut rendering = LinkedRendering::empty(kind);
    let Some(head) = find_head(heap, value, tag) else {
        return Ok(rendering);
    };

    let mut visited: Vec<Address> = Vec::new();
    let mut current = head.address();
    while let Some(addr) = current.take() {
        if visited.len() >= MAX_RENDERED_NODES {
            break;
        }
        let id = visited.len();
        visited.push(addr);

        let node_value = Value::Ref(addr);
        let attrs = attrs_of(heap, &node_value).ok_or(RenderError::DanglingReference(addr))?;
        let mut node = RenderedNode {
            id,
            value: attrs
                .iter()
                .find(|(_, v)| v.is_primitive())
                .map_or(serde_json::Value::Null, |(_, v)| to_json(heap, v)),
            next: None,
            prev: None,
        };

        let links: Vec<Address> = attrs
            .iter()
            .filter(|(_, target)| has_attribute_dict(heap, target))
            .filter_map(|(_, target)| target.address())
            .collect();
        // A node with a single link slot (object or None) can only point forward
        let has_back_link = attrs
            .iter()
            .filter(|(_, v)| v.is_none() || has_attribute_dict(heap, v))
            .count()
            >= 2;

        for &target in &links {
            match visited.iter().position(|&seen| seen == target) {
                Some(seen) if has_back_link && id > 0 && seen == id - 1 => {
                    if node.prev.is_none() {
                        node.prev = Some(seen);
                        rendering.kind = LinkedKind::DoublyLinkedList;
                    }
                }
                Some(seen) => {
                    if node.next.is_none() {
                        node.next = Some(seen);
                    }
                }
                None => {
                    if node.next.is_none() {
                        node.next = Some(id + 1);
                        current = Some(target);
                    }
                }
            }
        }
        rendering.nodes.push(node);
    }

    // A successor cut off by the node cap is not part of the rendering
    let count = rendering.nodes.len();
    if let Some(last) = rendering.nodes.last_mut() {
        if last.next == Some(count) {
            last.next = None;
        }
    }
    rendering.head = (count > 0).then_some(0);
    Ok(rendering)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Interpreter;
    use crate::parser::parse::Parser;
    use crate::structure::classify::classify;
    use serde_json::json;

    fn run(source: &str) -> Interpreter<'static> {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("program parses");
        let mut interp = Interpreter::new();
        interp.run(&program).expect("program runs");
        interp
    }

    fn render_global(interp: &Interpreter<'_>, name: &str) -> (TypeTag, LinkedRendering) {
        let value = interp.global(name).expect("bound");
        let tag = classify(interp.heap(), &value);
        let rendering = render(interp.heap(), &value, &tag);
        (settle_tag(tag, &rendering), rendering)
    }

    fn links(rendering: &LinkedRendering) -> Vec<(Option<usize>, Option<usize>)> {
        rendering.nodes.iter().map(|n| (n.next, n.prev)).collect()
    }

    const NODE: &str = "class Node:\n    def __init__(self, data):\n        self.data = data\n        self.next = None\n\n";

    #[test]
    fn test_singly_linked_list_from_container() {
        let source = format!(
            "{}class List:\n    def __init__(self):\n        self.head = None\n\nl = List()\nl.head = Node(5)\nl.head.next = Node(10)\nl.head.next.next = Node(20)\n",
            NODE
        );
        let interp = run(&source);
        let (tag, rendering) = render_global(&interp, "l");
        assert_eq!(tag, TypeTag::LinkedList);
        assert_eq!(rendering.head, Some(0));
        let values: Vec<_> = rendering.nodes.iter().map(|n| n.value.clone()).collect();
        assert_eq!(values, vec![json!(5), json!(10), json!(20)]);
        assert_eq!(links(&rendering), vec![(Some(1), None), (Some(2), None), (None, None)]);
    }

    #[test]
    fn test_cycle_terminates() {
        let source = format!(
            "{}a = Node(1)\nb = Node(2)\nc = Node(3)\na.next = b\nb.next = c\nc.next = a\n",
            NODE
        );
        let interp = run(&source);
        let (tag, rendering) = render_global(&interp, "a");
        assert_eq!(tag, TypeTag::LinkedListNode);
        assert_eq!(rendering.nodes.len(), 3);
        assert_eq!(links(&rendering), vec![(Some(1), None), (Some(2), None), (Some(0), None)]);
    }

    #[test]
    fn test_two_node_cycle_stays_singly() {
        let source = format!("{}a = Node(1)\nb = Node(2)\na.next = b\nb.next = a\n", NODE);
        let interp = run(&source);
        let (tag, rendering) = render_global(&interp, "a");
        assert_eq!(tag, TypeTag::LinkedListNode);
        assert_eq!(links(&rendering), vec![(Some(1), None), (Some(0), None)]);
    }

    #[test]
    fn test_self_loop() {
        let source = format!("{}a = Node(1)\na.next = a\n", NODE);
        let interp = run(&source);
        let (_, rendering) = render_global(&interp, "a");
        assert_eq!(links(&rendering), vec![(Some(0), None)]);
    }

    #[test]
    fn test_back_links_become_prev() {
        let source = "class D:\n    def __init__(self, v):\n        self.v = v\n        self.right = None\n        self.left = None\n\na = D(1)\nb = D(2)\nc = D(3)\na.right = b\nb.left = a\nb.right = c\nc.left = b\n";
        let interp = run(source);
        let (tag, rendering) = render_global(&interp, "a");
        assert_eq!(tag, TypeTag::DoublyLinkedNode);
        assert_eq!(rendering.kind, LinkedKind::DoublyLinkedList);
        assert_eq!(links(&rendering), vec![(Some(1), None), (Some(2), Some(0)), (None, Some(1))]);
    }

    #[test]
    fn test_node_cap() {
        let source = format!(
            "{}head = Node(0)\ncur = head\nfor i in range(150):\n    cur.next = Node(i)\n    cur = cur.next\n",
            NODE
        );
        let interp = run(&source);
        let (_, rendering) = render_global(&interp, "head");
        assert_eq!(rendering.nodes.len(), MAX_RENDERED_NODES);
        assert_eq!(rendering.nodes.last().and_then(|n| n.next), None);
        for (i, node) in rendering.nodes.iter().enumerate() {
            assert_eq!(node.id, i);
        }
    }

    #[test]
    fn test_freed_head_degrades_to_error() {
        let mut interp = run(&format!("{}a = Node(1)\na.next = Node(2)\n", NODE));
        let value = interp.global("a").expect("bound");
        let tag = classify(interp.heap(), &value);
        assert_eq!(tag, TypeTag::LinkedListNode);

        let addr = value.address().expect("heap object");
        interp.heap.free(addr);
        let rendering = render(interp.heap(), &value, &tag);
        assert_eq!(rendering.head, None);
        assert!(rendering.nodes.is_empty());
        assert_eq!(rendering.error, Some(RenderError::DanglingReference(addr).to_string()));
    }

    #[test]
    fn test_non_linked_value_renders_empty() {
        let interp = run("x = 3\n");
        let value = interp.global("x").expect("bound");
        let rendering = render(interp.heap(), &value, &TypeTag::Primitive);
        assert_eq!(rendering.head, None);
        assert!(rendering.nodes.is_empty());
    }
}
