//! Data structures for execution traces
//!
//! A [`Trace`] is the ordered list of [`TraceEntry`] values a run produces.
//! Frame events carry a [`Snapshot`] of the frame's variables; the run ends
//! with an optional `print` entry holding the captured output and, on
//! failure, an `exception` entry. Everything here serializes to the JSON the
//! visualizer consumes:
//!
//! ```json
//! {"event": "line", "line": 3, "function": "<module>",
//!  "locals": {"x": 1}, "var_types": {"x": "primitive"},
//!  "scope": null, "depth": 1, "branch_taken": null}
//! ```

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Complete trace of one run, in execution order
pub type Trace = Vec<TraceEntry>;

/// One trace entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TraceEntry {
    Call(Snapshot),
    Line(Snapshot),
    Return(Snapshot),
    /// Everything the program printed, trimmed
    Print { output: String },
    /// Rejected input, parse failure or uncaught runtime error
    Exception { error: String },
}

impl TraceEntry {
    pub fn exception(error: impl Into<String>) -> Self {
        TraceEntry::Exception { error: error.into() }
    }

    /// Event name as it appears on the wire
    pub fn event(&self) -> &'static str {
        match self {
            TraceEntry::Call(_) => "call",
            TraceEntry::Line(_) => "line",
            TraceEntry::Return(_) => "return",
            TraceEntry::Print { .. } => "print",
            TraceEntry::Exception { .. } => "exception",
        }
    }

    /// The frame snapshot of call/line/return entries
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            TraceEntry::Call(snapshot)
            | TraceEntry::Line(snapshot)
            | TraceEntry::Return(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// State of a frame at a call/line/return event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Line the frame is executing
    pub line: usize,
    /// Name of the function the frame runs (`<module>` at top level)
    pub function: String,
    /// JSON view of every non-callable binding
    pub locals: Bindings<LocalValue>,
    /// Structural tag of every binding in `locals`
    pub var_types: Bindings<TypeTag>,
    /// Syntactic scope of the source line
    pub scope: Option<ScopeKind>,
    /// Number of recorded calls whose return has not been recorded yet
    pub depth: usize,
    /// Outcome of the condition on a conditional line
    pub branch_taken: Option<bool>,
}

/// Syntactic kind of the traced line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Function,
    Loop,
    Conditional,
}

/// Structural tag of a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Primitive,
    Array,
    Object,
    Function,
    Constructing,
    LinkedList,
    LinkedListNode,
    DoublyLinkedList,
    DoublyLinkedNode,
    /// Lowercase runtime type name of anything else
    Other(String),
}

impl TypeTag {
    pub fn as_str(&self) -> &str {
        match self {
            TypeTag::Primitive => "primitive",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Function => "function",
            TypeTag::Constructing => "constructing",
            TypeTag::LinkedList => "linked_list",
            TypeTag::LinkedListNode => "linked_list_node",
            TypeTag::DoublyLinkedList => "doubly_linked_list",
            TypeTag::DoublyLinkedNode => "doubly_linked_node",
            TypeTag::Other(name) => name,
        }
    }

    pub fn parse(tag: &str) -> TypeTag {
        match tag {
            "primitive" => TypeTag::Primitive,
            "array" => TypeTag::Array,
            "object" => TypeTag::Object,
            "function" => TypeTag::Function,
            "constructing" => TypeTag::Constructing,
            "linked_list" => TypeTag::LinkedList,
            "linked_list_node" => TypeTag::LinkedListNode,
            "doubly_linked_list" => TypeTag::DoublyLinkedList,
            "doubly_linked_node" => TypeTag::DoublyLinkedNode,
            other => TypeTag::Other(other.to_string()),
        }
    }

    /// One of the four linked-structure tags
    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            TypeTag::LinkedList
                | TypeTag::LinkedListNode
                | TypeTag::DoublyLinkedList
                | TypeTag::DoublyLinkedNode
        )
    }

    /// A list object holding a head reference, as opposed to a node
    pub fn is_container(&self) -> bool {
        matches!(self, TypeTag::LinkedList | TypeTag::DoublyLinkedList)
    }

    /// The doubly linked counterpart of a linked tag
    pub fn to_doubly(&self) -> TypeTag {
        match self {
            TypeTag::LinkedList => TypeTag::DoublyLinkedList,
            TypeTag::LinkedListNode => TypeTag::DoublyLinkedNode,
            other => other.clone(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TypeTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D>(deserializer: D) -> Result<TypeTag, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TagVisitor;

        impl Visitor<'_> for TagVisitor {
            type Value = TypeTag;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a variable type tag")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(TypeTag::parse(value))
            }
        }
        deserializer.deserialize_str(TagVisitor)
    }
}

/// Value stored for a variable in `locals`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalValue {
    /// Canonical rendering of a linked structure
    Linked(LinkedRendering),
    /// Any other value, already converted to JSON
    Plain(serde_json::Value),
}

/// Kind of a rendered linked structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedKind {
    LinkedList,
    DoublyLinkedList,
}

/// `{type, head, nodes}` view of a linked list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedRendering {
    #[serde(rename = "type")]
    pub kind: LinkedKind,
    /// Id of the first node; `null` when nothing could be rendered
    pub head: Option<usize>,
    pub nodes: Vec<RenderedNode>,
    /// Why rendering stopped short, when it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkedRendering {
    pub fn empty(kind: LinkedKind) -> Self {
        LinkedRendering {
            kind,
            head: None,
            nodes: Vec::new(),
            error: None,
        }
    }
}

/// One node of a [`LinkedRendering`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedNode {
    /// Position in traversal order
    pub id: usize,
    /// First primitive attribute of the node
    pub value: serde_json::Value,
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

/// Name-ordered bindings, serialized as a JSON object in binding order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings<T>(pub IndexMap<String, T, FxBuildHasher>);

impl<T> Bindings<T> {
    pub fn new() -> Self {
        Bindings(IndexMap::default())
    }

    /// Add a binding; a repeated name keeps its first position
    pub fn push(&mut self, name: impl Into<String>, value: T) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<T> Default for Bindings<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_snapshot() -> Snapshot {
        let mut locals = Bindings::new();
        locals.push("b", LocalValue::Plain(json!(2)));
        locals.push("a", LocalValue::Plain(json!([1, 2])));
        let mut var_types = Bindings::new();
        var_types.push("b", TypeTag::Primitive);
        var_types.push("a", TypeTag::Array);
        Snapshot {
            line: 3,
            function: "<module>".to_string(),
            locals,
            var_types,
            scope: Some(ScopeKind::Loop),
            depth: 1,
            branch_taken: None,
        }
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = TraceEntry::Line(sample_snapshot());
        let text = serde_json::to_string(&entry).expect("serializes");
        assert_eq!(
            text,
            r#"{"event":"line","line":3,"function":"<module>","locals":{"b":2,"a":[1,2]},"var_types":{"b":"primitive","a":"array"},"scope":"loop","depth":1,"branch_taken":null}"#
        );

        let text =
            serde_json::to_string(&TraceEntry::exception("division by zero")).expect("serializes");
        assert_eq!(text, r#"{"event":"exception","error":"division by zero"}"#);
    }

    #[test]
    fn test_entries_read_back() {
        let entry = TraceEntry::Call(sample_snapshot());
        let text = serde_json::to_string(&entry).expect("serializes");
        let back: TraceEntry = serde_json::from_str(&text).expect("deserializes");
        assert_eq!(back, entry);
    }

    #[test]
    fn test_linked_rendering_shape() {
        let rendering = LinkedRendering {
            kind: LinkedKind::DoublyLinkedList,
            head: Some(0),
            nodes: vec![RenderedNode {
                id: 0,
                value: json!(5),
                next: None,
                prev: None,
            }],
            error: None,
        };
        let value = serde_json::to_value(LocalValue::Linked(rendering)).expect("serializes");
        assert_eq!(
            value,
            json!({
                "type": "doubly_linked_list",
                "head": 0,
                "nodes": [{"id": 0, "value": 5, "next": null, "prev": null}]
            })
        );
    }

    #[test]
    fn test_bindings_keep_binding_order() {
        let bindings: Bindings<serde_json::Value> =
            serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).expect("deserializes");
        let names: Vec<&str> = bindings.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["z", "a", "m"]);

        let mut tags = Bindings::new();
        tags.push("n", TypeTag::Primitive);
        tags.push("head", TypeTag::LinkedListNode);
        tags.push("n", TypeTag::Array);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("n"), Some(&TypeTag::Array));
        assert_eq!(
            serde_json::to_string(&tags).ok().as_deref(),
            Some(r#"{"n":"array","head":"linked_list_node"}"#)
        );
    }

    #[test]
    fn test_unknown_tags_are_type_names() {
        assert_eq!(TypeTag::parse("linkedlist"), TypeTag::Other("linkedlist".to_string()));
        assert_eq!(TypeTag::LinkedListNode.to_doubly(), TypeTag::DoublyLinkedNode);
        assert!(TypeTag::DoublyLinkedList.is_container());
    }
}
