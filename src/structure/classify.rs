//! Tagging runtime values by structure
//!
//! Concrete kinds are recognized first. Instances are then tested as a list
//! container (an object holding a reference to a node-shaped object of another
//! class) before they are tested as a node, so that a list object holding a
//! single fresh head is not mistaken for a node.

use super::shape::{analyze, attrs_of, has_attribute_dict, Shape};
use crate::memory::heap::{Heap, HeapObject};
use crate::memory::value::Value;
use crate::snapshot::TypeTag;

/// Structural tag of `value`
pub fn classify(heap: &Heap, value: &Value) -> TypeTag {
    match value {
        Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => {
            return TypeTag::Primitive
        }
        Value::Tuple(_) => return TypeTag::Array,
        _ => {}
    }
    match value.address().and_then(|a| heap.get(a)) {
        Some(HeapObject::List(_)) => return TypeTag::Array,
        Some(HeapObject::Dict(_)) => return TypeTag::Object,
        _ => {}
    }
    if heap.is_callable(value) {
        return TypeTag::Function;
    }

    if let Some(attrs) = attrs_of(heap, value) {
        if attrs.is_empty() {
            return TypeTag::Constructing;
        }
        let shape = analyze(heap, value);
        if let Some(doubly) = container_kind(heap, value, &shape) {
            return if doubly {
                TypeTag::DoublyLinkedList
            } else {
                TypeTag::LinkedList
            };
        }
        if shape.passes_node_test() {
            return if shape.self_ref_attrs.len() >= 2 {
                TypeTag::DoublyLinkedNode
            } else {
                TypeTag::LinkedListNode
            };
        }
    }

    TypeTag::Other(heap.type_name(value).to_lowercase())
}

/// `Some(is_doubly)` when `value` holds the head of a list
fn container_kind(heap: &Heap, value: &Value, shape: &Shape) -> Option<bool> {
    if shape.total > 3 || shape.primitive_attrs.len() > 1 {
        return None;
    }
    let head = container_head(heap, value, shape)?;
    Some(analyze(heap, &head).object_ref_attrs.len() >= 2)
}

/// The node-shaped object a container points at, if there is one.
///
/// The target must be of a different class than the container: a node whose
/// successor also looks node-shaped is a node, not a container.
pub(crate) fn container_head(heap: &Heap, value: &Value, shape: &Shape) -> Option<Value> {
    let attrs = attrs_of(heap, value)?;
    let own_class = heap.class_of(value);
    shape.object_ref_attrs.iter().find_map(|name| {
        let (_, target) = attrs.iter().find(|(n, _)| n == name)?;
        let distinct = own_class.is_none() || heap.class_of(target) != own_class;
        (has_attribute_dict(heap, target) && distinct && analyze(heap, target).is_node_shaped())
            .then(|| target.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Interpreter;
    use crate::parser::parse::Parser;

    fn run(source: &str) -> Interpreter<'static> {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("program parses");
        let mut interp = Interpreter::new();
        interp.run(&program).expect("program runs");
        interp
    }

    fn tag_of(interp: &Interpreter<'_>, name: &str) -> TypeTag {
        let value = interp.global(name).expect("bound");
        classify(interp.heap(), &value)
    }

    const SINGLY: &str = "class Node:\n    def __init__(self, data):\n        self.data = data\n        self.next = None\n\nclass LinkedList:\n    def __init__(self):\n        self.head = None\n\nempty = LinkedList()\nlst = LinkedList()\nlst.head = Node(1)\nlst.head.next = Node(2)\nn = lst.head\n";

    #[test]
    fn test_concrete_kinds() {
        let source = "a = 1\nb = [1]\nc = (1, 2)\nd = {'k': 1}\ndef f():\n    pass\ne = None\ns = {1}\nr = range(3)\n";
        let interp = run(source);
        assert_eq!(tag_of(&interp, "a"), TypeTag::Primitive);
        assert_eq!(tag_of(&interp, "e"), TypeTag::Primitive);
        assert_eq!(tag_of(&interp, "b"), TypeTag::Array);
        assert_eq!(tag_of(&interp, "c"), TypeTag::Array);
        assert_eq!(tag_of(&interp, "d"), TypeTag::Object);
        assert_eq!(tag_of(&interp, "f"), TypeTag::Function);
        assert_eq!(tag_of(&interp, "s"), TypeTag::Other("set".to_string()));
        assert_eq!(tag_of(&interp, "r"), TypeTag::Other("range".to_string()));
    }

    #[test]
    fn test_singly_linked_container_and_node() {
        let interp = run(SINGLY);
        assert_eq!(tag_of(&interp, "lst"), TypeTag::LinkedList);
        assert_eq!(tag_of(&interp, "n"), TypeTag::LinkedListNode);
        assert_eq!(tag_of(&interp, "empty"), TypeTag::Other("linkedlist".to_string()));
    }

    #[test]
    fn test_empty_instance_is_constructing() {
        let interp = run("class Box:\n    pass\nb = Box()\n");
        assert_eq!(tag_of(&interp, "b"), TypeTag::Constructing);
    }

    #[test]
    fn test_doubly_linked_detection() {
        let source = "class D:\n    def __init__(self, v):\n        self.v = v\n        self.fwd = None\n        self.back = None\n\nclass Chain:\n    def __init__(self):\n        self.first = None\n\na = D(1)\nb = D(2)\na.fwd = b\nb.back = a\nc = D(3)\nb.fwd = c\nc.back = b\nchain = Chain()\nchain.first = b\n";
        let interp = run(source);
        assert_eq!(tag_of(&interp, "b"), TypeTag::DoublyLinkedNode);
        assert_eq!(tag_of(&interp, "chain"), TypeTag::DoublyLinkedList);
    }

    #[test]
    fn test_detection_ignores_names() {
        let source = "class Atom:\n    def __init__(self, charge):\n        self.charge = charge\n        self.bond = None\n\nclass Molecule:\n    def __init__(self):\n        self.stem = None\n\nm = Molecule()\nm.stem = Atom(1)\nm.stem.bond = Atom(2)\n";
        let interp = run(source);
        assert_eq!(tag_of(&interp, "m"), TypeTag::LinkedList);
    }

    #[test]
    fn test_wide_objects_fall_back_to_type_name() {
        let source = "class Wide:\n    def __init__(self):\n        self.a = 1\n        self.b = 2\n        self.c = 3\n        self.d = 4\nw = Wide()\n";
        let interp = run(source);
        assert_eq!(tag_of(&interp, "w"), TypeTag::Other("wide".to_string()));
    }
}
