//! Structural analysis of a single object
//!
//! Only the shape of an object's attribute dictionary is inspected: how many
//! attributes hold primitives, how many reference other objects, and whether
//! those objects share the runtime class or are the object itself. Attribute
//! and class names never matter.

use crate::memory::heap::{Heap, HeapObject};
use crate::memory::value::{Address, Value};

/// Attribute counts of one object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shape {
    /// Attributes holding a bool, number or string
    pub primitive_attrs: Vec<String>,
    /// Attributes holding an object with its own attribute dictionary
    pub object_ref_attrs: Vec<String>,
    /// Object references whose target has the same runtime type
    pub self_ref_attrs: Vec<String>,
    /// Object references whose target is the object itself
    pub circular_ref_attrs: Vec<String>,
    /// Number of attributes considered
    pub total: usize,
}

impl Shape {
    /// At least one primitive and at most four attributes
    pub fn is_node_shaped(&self) -> bool {
        !self.primitive_attrs.is_empty() && self.total <= 4
    }

    /// Candidate list node: links onward and carries data or links to its own kind
    pub fn passes_node_test(&self) -> bool {
        !self.object_ref_attrs.is_empty()
            && self.total <= 6
            && (!self.primitive_attrs.is_empty() || !self.self_ref_attrs.is_empty())
    }
}

/// Whether the value carries an attribute dictionary of its own
pub fn has_attribute_dict(heap: &Heap, value: &Value) -> bool {
    matches!(
        value.address().and_then(|a| heap.get(a)),
        Some(HeapObject::Instance(_) | HeapObject::Module(_))
    )
}

/// Non-callable, non-dunder attributes of the object's own dictionary, in
/// insertion order. `None` when the value has no attribute dictionary.
pub fn attrs_of(heap: &Heap, value: &Value) -> Option<Vec<(String, Value)>> {
    let namespace = match value.address().and_then(|a| heap.get(a))? {
        HeapObject::Instance(instance) => &instance.attrs,
        HeapObject::Module(module) => &module.attrs,
        _ => return None,
    };
    Some(
        namespace
            .iter()
            .filter(|(name, value)| !is_dunder(name) && !heap.is_callable(value))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    )
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// Identity of a value's runtime type: the class of an instance, otherwise the type name
fn same_runtime_type(heap: &Heap, a: &Value, b: &Value) -> bool {
    match (heap.class_of(a), heap.class_of(b)) {
        (Some(x), Some(y)) => x == y,
        (None, None) => heap.type_name(a) == heap.type_name(b),
        _ => false,
    }
}

/// Analyze the attribute dictionary of `value`
pub fn analyze(heap: &Heap, value: &Value) -> Shape {
    let mut shape = Shape::default();
    let Some(attrs) = attrs_of(heap, value) else {
        return shape;
    };
    let own_address: Option<Address> = value.address();

    shape.total = attrs.len();
    for (name, attr) in attrs {
        if attr.is_primitive() {
            shape.primitive_attrs.push(name);
        } else if has_attribute_dict(heap, &attr) {
            if same_runtime_type(heap, value, &attr) {
                shape.self_ref_attrs.push(name.clone());
            }
            if attr.address() == own_address {
                shape.circular_ref_attrs.push(name.clone());
            }
            shape.object_ref_attrs.push(name);
        }
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::heap::{Class, Instance, Namespace};

    fn class(heap: &mut Heap, name: &str) -> Address {
        let addr = heap.alloc(HeapObject::Class(Class {
            name: name.to_string(),
            bases: Vec::new(),
            mro: Vec::new(),
            attrs: Namespace::new(),
            builtin: false,
        }));
        if let Some(HeapObject::Class(c)) = heap.get_mut(addr) {
            c.mro = vec![addr];
        }
        addr
    }

    fn object(heap: &mut Heap, class: Address, attrs: &[(&str, Value)]) -> Value {
        let mut namespace = Namespace::new();
        for (name, value) in attrs {
            namespace.set(name, value.clone());
        }
        heap.alloc_value(HeapObject::Instance(Instance {
            class,
            attrs: namespace,
            args: Vec::new(),
        }))
    }

    #[test]
    fn test_counts_attribute_kinds() {
        let mut heap = Heap::new();
        let cls = class(&mut heap, "Cell");
        let tail = object(&mut heap, cls, &[("v", Value::Int(2)), ("link", Value::None)]);
        let head = object(&mut heap, cls, &[("v", Value::Int(1)), ("link", tail)]);

        let shape = analyze(&heap, &head);
        assert_eq!(shape.primitive_attrs, vec!["v"]);
        assert_eq!(shape.object_ref_attrs, vec!["link"]);
        assert_eq!(shape.self_ref_attrs, vec!["link"]);
        assert!(shape.circular_ref_attrs.is_empty());
        assert_eq!(shape.total, 2);
        assert!(shape.passes_node_test());
        assert!(shape.is_node_shaped());
    }

    #[test]
    fn test_none_is_not_primitive_and_dunders_are_skipped() {
        let mut heap = Heap::new();
        let cls = class(&mut heap, "Thing");
        let thing = object(
            &mut heap,
            cls,
            &[("__hidden__", Value::Int(1)), ("empty", Value::None)],
        );
        let shape = analyze(&heap, &thing);
        assert_eq!(shape.total, 1);
        assert!(shape.primitive_attrs.is_empty());
        assert!(shape.object_ref_attrs.is_empty());
    }

    #[test]
    fn test_circular_reference() {
        let mut heap = Heap::new();
        let cls = class(&mut heap, "Loop");
        let node = object(&mut heap, cls, &[("x", Value::Int(0))]);
        if let Some(HeapObject::Instance(instance)) = node.address().and_then(|a| heap.get_mut(a)) {
            instance.attrs.set("me", node.clone());
        }
        let shape = analyze(&heap, &node);
        assert_eq!(shape.circular_ref_attrs, vec!["me"]);
        assert_eq!(shape.self_ref_attrs, vec!["me"]);
    }

    #[test]
    fn test_non_objects_have_no_attributes() {
        let heap = Heap::new();
        assert!(attrs_of(&heap, &Value::Int(3)).is_none());
        assert_eq!(analyze(&heap, &Value::str("s")), Shape::default());
    }
}
