//! Object heap for the interpreter
//!
//! Every value with identity lives here: lists, dicts, sets, class instances,
//! classes, functions, bound methods, modules and the variable scopes that
//! closures capture. Objects are addressed by a monotonically increasing
//! [`Address`], which doubles as the object's `id()`.
//!
//! Attribute dictionaries and variable scopes are [`Namespace`]s, which keep
//! insertion order so that snapshots list bindings in the order they were made.

use super::value::{Address, Value};
use crate::interpreter::builtins::Builtin;
use crate::interpreter::constants::HEAP_ADDRESS_START;
use crate::parser::ast::FunctionDef;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::rc::Rc;

/// Insertion-ordered name → value map
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    values: IndexMap<String, Value, FxBuildHasher>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bind a name; rebinding keeps the original position
    pub fn set(&mut self, name: &str, value: Value) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Hashable projection of a value, used to index dicts and sets
///
/// Numbers that compare equal hash equal: `True`, `1` and `1.0` are one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    Range(i64, i64, i64),
    Builtin(Builtin),
    Identity(Address),
}

/// Insertion-ordered hash table backing dicts and sets
///
/// Each entry keeps the key object it was first inserted with next to its value.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: IndexMap<HashKey, (Value, Value), FxBuildHasher>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &HashKey) -> Option<&Value> {
        self.entries.get(key).map(|(_, value)| value)
    }

    pub fn contains(&self, key: &HashKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite; an existing entry keeps its original key object and position
    pub fn insert(&mut self, hash: HashKey, key: Value, value: Value) {
        match self.entries.get_mut(&hash) {
            Some(entry) => entry.1 = value,
            None => {
                self.entries.insert(hash, (key, value));
            }
        }
    }

    pub fn remove(&mut self, hash: &HashKey) -> Option<(Value, Value)> {
        self.entries.shift_remove(hash)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.values().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.values().map(|(_, v)| v.clone()).collect()
    }

    /// `(key, value)` pairs in insertion order
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &(Value, Value)> + ExactSizeIterator {
        self.entries.values()
    }

    /// Keys paired with the hash each was stored under, in insertion order
    pub fn keyed(&self) -> Vec<(HashKey, Value)> {
        self.entries
            .iter()
            .map(|(hash, (key, _))| (hash.clone(), key.clone()))
            .collect()
    }
}

/// An instance of a user-defined (or built-in exception) class
#[derive(Debug, Clone)]
pub struct Instance {
    pub class: Address,
    /// The instance dictionary
    pub attrs: Namespace,
    /// Constructor arguments of exception instances
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub bases: Vec<Address>,
    /// Method resolution order, starting with the class itself
    pub mro: Vec<Address>,
    pub attrs: Namespace,
    /// Built-in exception classes are created by the interpreter, not by user code
    pub builtin: bool,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// Evaluated default of each parameter, aligned with `def.params`
    pub defaults: Vec<Option<Value>>,
    /// Scope of the enclosing function, for closures
    pub closure: Option<Address>,
    /// Class whose body defined this function, for `super()`
    pub owner: Option<Address>,
}

/// A variable scope that may outlive its frame when captured by a closure
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub vars: Namespace,
    pub parent: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub attrs: Namespace,
}

/// Objects stored on the heap
#[derive(Debug, Clone)]
pub enum HeapObject {
    List(Vec<Value>),
    Dict(Table),
    /// A set is a table whose values are unused
    Set(Table),
    Instance(Instance),
    Class(Class),
    Function(Function),
    BoundMethod { receiver: Value, function: Address },
    NativeMethod { receiver: Value, name: String },
    Super { class: Address, receiver: Value },
    Module(Module),
    Scope(Scope),
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    objects: FxHashMap<Address, HeapObject>,
    next_address: Address,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            objects: FxHashMap::default(),
            next_address: HEAP_ADDRESS_START,
        }
    }

    /// Allocate an object and return its address
    pub fn alloc(&mut self, object: HeapObject) -> Address {
        let addr = self.next_address;
        self.next_address += 1;
        self.objects.insert(addr, object);
        addr
    }

    pub fn alloc_value(&mut self, object: HeapObject) -> Value {
        Value::Ref(self.alloc(object))
    }

    pub fn get(&self, addr: Address) -> Option<&HeapObject> {
        self.objects.get(&addr)
    }

    pub fn get_mut(&mut self, addr: Address) -> Option<&mut HeapObject> {
        self.objects.get_mut(&addr)
    }

    /// Release an object; used for frame scopes nothing captured
    pub fn free(&mut self, addr: Address) {
        self.objects.remove(&addr);
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn class(&self, addr: Address) -> Option<&Class> {
        match self.objects.get(&addr) {
            Some(HeapObject::Class(class)) => Some(class),
            _ => None,
        }
    }

    pub fn instance(&self, addr: Address) -> Option<&Instance> {
        match self.objects.get(&addr) {
            Some(HeapObject::Instance(instance)) => Some(instance),
            _ => None,
        }
    }

    pub fn scope(&self, addr: Address) -> Option<&Scope> {
        match self.objects.get(&addr) {
            Some(HeapObject::Scope(scope)) => Some(scope),
            _ => None,
        }
    }

    pub fn scope_mut(&mut self, addr: Address) -> Option<&mut Scope> {
        match self.objects.get_mut(&addr) {
            Some(HeapObject::Scope(scope)) => Some(scope),
            _ => None,
        }
    }

    /// Class of an instance value
    pub fn class_of(&self, value: &Value) -> Option<Address> {
        self.instance(value.address()?).map(|i| i.class)
    }

    /// Compute a depth-first, left-to-right method resolution order
    pub fn linearize(&self, class: Address, bases: &[Address]) -> Vec<Address> {
        let mut mro = vec![class];
        for &base in bases {
            if let Some(base_class) = self.class(base) {
                for &ancestor in &base_class.mro {
                    if !mro.contains(&ancestor) {
                        mro.push(ancestor);
                    }
                }
            }
        }
        mro
    }

    /// Look an attribute up along a class's MRO; returns the value and the defining class
    pub fn class_lookup(&self, class: Address, name: &str) -> Option<(Value, Address)> {
        let mro = &self.class(class)?.mro;
        mro.iter().find_map(|&c| {
            self.class(c)
                .and_then(|cls| cls.attrs.get(name))
                .map(|v| (v.clone(), c))
        })
    }

    /// Look an attribute up along the MRO of `class`, starting after `after`
    pub fn class_lookup_after(
        &self,
        class: Address,
        after: Address,
        name: &str,
    ) -> Option<(Value, Address)> {
        let mro = &self.class(class)?.mro;
        let start = mro.iter().position(|&c| c == after).map_or(0, |p| p + 1);
        mro[start..].iter().find_map(|&c| {
            self.class(c)
                .and_then(|cls| cls.attrs.get(name))
                .map(|v| (v.clone(), c))
        })
    }

    pub fn is_subclass(&self, class: Address, base: Address) -> bool {
        self.class(class).is_some_and(|c| c.mro.contains(&base))
    }

    pub fn class_name(&self, class: Address) -> String {
        self.class(class)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "object".to_string())
    }

    /// Runtime type name, as `type(value).__name__` reports it
    pub fn type_name(&self, value: &Value) -> String {
        if let Some(name) = value.inline_type_name() {
            return name.to_string();
        }
        let Some(object) = value.address().and_then(|a| self.get(a)) else {
            return "object".to_string();
        };
        match object {
            HeapObject::List(_) => "list".to_string(),
            HeapObject::Dict(_) => "dict".to_string(),
            HeapObject::Set(_) => "set".to_string(),
            HeapObject::Instance(instance) => self.class_name(instance.class),
            HeapObject::Class(_) => "type".to_string(),
            HeapObject::Function(_) => "function".to_string(),
            HeapObject::BoundMethod { .. } => "method".to_string(),
            HeapObject::NativeMethod { .. } => "builtin_function_or_method".to_string(),
            HeapObject::Super { .. } => "super".to_string(),
            HeapObject::Module(_) => "module".to_string(),
            HeapObject::Scope(_) => "cell".to_string(),
        }
    }

    /// Whether calling the value is meaningful
    pub fn is_callable(&self, value: &Value) -> bool {
        match value {
            Value::Builtin(_) => true,
            Value::Ref(addr) => match self.get(*addr) {
                Some(
                    HeapObject::Class(_)
                    | HeapObject::Function(_)
                    | HeapObject::BoundMethod { .. }
                    | HeapObject::NativeMethod { .. },
                ) => true,
                Some(HeapObject::Instance(instance)) => {
                    self.class_lookup(instance.class, "__call__").is_some()
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Hashable projection of a value; `None` when the value is unhashable
    pub fn hash_key(&self, value: &Value) -> Option<HashKey> {
        let key = match value {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(i64::from(*b)),
            Value::Int(n) => HashKey::Int(*n),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 9.2e18 {
                    HashKey::Int(*x as i64)
                } else {
                    HashKey::Float(x.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(|item| self.hash_key(item))
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Range { start, stop, step } => HashKey::Range(*start, *stop, *step),
            Value::Builtin(b) => HashKey::Builtin(*b),
            Value::Ref(addr) => match self.get(*addr)? {
                HeapObject::List(_) | HeapObject::Dict(_) | HeapObject::Set(_) => return None,
                _ => HashKey::Identity(*addr),
            },
        };
        Some(key)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(heap: &mut Heap, name: &str, bases: Vec<Address>) -> Address {
        let addr = heap.alloc(HeapObject::Class(Class {
            name: name.to_string(),
            bases: bases.clone(),
            mro: Vec::new(),
            attrs: Namespace::new(),
            builtin: false,
        }));
        let mro = heap.linearize(addr, &bases);
        if let Some(HeapObject::Class(c)) = heap.get_mut(addr) {
            c.mro = mro;
        }
        addr
    }

    #[test]
    fn test_namespace_keeps_insertion_order() {
        let mut ns = Namespace::new();
        ns.set("b", Value::Int(1));
        ns.set("a", Value::Int(2));
        ns.set("b", Value::Int(3));
        let names: Vec<_> = ns.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(matches!(ns.get("b"), Some(Value::Int(3))));

        ns.remove("b");
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_numeric_keys_unify() {
        let heap = Heap::new();
        assert_eq!(heap.hash_key(&Value::Bool(true)), heap.hash_key(&Value::Int(1)));
        assert_eq!(heap.hash_key(&Value::Float(2.0)), heap.hash_key(&Value::Int(2)));
        assert_ne!(heap.hash_key(&Value::Float(2.5)), heap.hash_key(&Value::Int(2)));
    }

    #[test]
    fn test_lists_are_unhashable() {
        let mut heap = Heap::new();
        let list = heap.alloc_value(HeapObject::List(vec![]));
        assert!(heap.hash_key(&list).is_none());
        assert!(heap.hash_key(&Value::tuple(vec![list])).is_none());
    }

    #[test]
    fn test_table_remove_keeps_order() {
        let heap = Heap::new();
        let mut table = Table::new();
        for (k, v) in [("x", 1), ("y", 2), ("z", 3)] {
            let key = Value::str(k);
            let hash = heap.hash_key(&key).expect("hashable");
            table.insert(hash, key, Value::Int(v));
        }
        table.remove(&HashKey::Str(Rc::from("x")));
        assert_eq!(table.len(), 2);
        assert!(matches!(table.get(&HashKey::Str(Rc::from("z"))), Some(Value::Int(3))));
        assert!(matches!(table.keys()[0], Value::Str(ref s) if &**s == "y"));

        let key = Value::str("x");
        table.insert(HashKey::Str(Rc::from("x")), key, Value::Int(4));
        let order: Vec<(HashKey, Value)> = table.keyed();
        assert_eq!(order.last().map(|(hash, _)| hash.clone()), Some(HashKey::Str(Rc::from("x"))));
    }

    #[test]
    fn test_table_overwrite_keeps_first_key() {
        let heap = Heap::new();
        let mut table = Table::new();
        for key in [Value::Int(1), Value::Str(Rc::from("k")), Value::Bool(true)] {
            let hash = heap.hash_key(&key).expect("hashable");
            table.insert(hash, key, Value::None);
        }
        assert_eq!(table.len(), 2);
        assert!(matches!(table.entries().next(), Some((Value::Int(1), Value::None))));
        assert!(matches!(table.entries().next_back(), Some((Value::Str(_), Value::None))));
    }

    #[test]
    fn test_mro_is_depth_first() {
        let mut heap = Heap::new();
        let base = class(&mut heap, "Base", vec![]);
        let left = class(&mut heap, "Left", vec![base]);
        let right = class(&mut heap, "Right", vec![]);
        let child = class(&mut heap, "Child", vec![left, right]);

        assert_eq!(heap.class(child).map(|c| c.mro.clone()), Some(vec![child, left, base, right]));
        assert!(heap.is_subclass(child, base));
        assert!(!heap.is_subclass(right, base));
    }
}
