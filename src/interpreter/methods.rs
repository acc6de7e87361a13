//! Methods of the built-in container and string types
//!
//! `list`, `dict`, `set` and `str` methods are dispatched by name on the
//! receiver's runtime type. Looking such a method up as an attribute produces a
//! `NativeMethod` heap object that remembers the receiver, so it can be stored
//! and called later like any other bound method.
//!
//! `dict.keys()`, `dict.values()` and `dict.items()` return lists.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::format::is_exception_class;
use crate::memory::heap::{HashKey, HeapObject, Table};
use crate::memory::value::{Address, Value};

const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "reverse", "sort", "copy",
    "clear",
];

const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "pop", "popitem", "setdefault", "update", "copy", "clear",
];

const SET_METHODS: &[&str] = &[
    "add",
    "remove",
    "discard",
    "pop",
    "union",
    "intersection",
    "difference",
    "symmetric_difference",
    "issubset",
    "issuperset",
    "isdisjoint",
    "update",
    "copy",
    "clear",
];

const STR_METHODS: &[&str] = &[
    "join",
    "split",
    "splitlines",
    "strip",
    "lstrip",
    "rstrip",
    "lower",
    "upper",
    "replace",
    "startswith",
    "endswith",
    "find",
    "rfind",
    "index",
    "count",
    "isdigit",
    "isalpha",
    "isalnum",
    "isspace",
    "isupper",
    "islower",
    "title",
    "capitalize",
    "format",
    "zfill",
    "center",
    "ljust",
    "rjust",
    "partition",
];

impl<'a> Interpreter<'a> {
    /// Hash key of a value usable as a dict key or set member
    pub(crate) fn hash_of(&self, value: &Value) -> Result<HashKey, RuntimeError> {
        self.heap.hash_key(value).ok_or_else(|| {
            self.type_error(format!("unhashable type: '{}'", self.heap.type_name(value)))
        })
    }

    pub(crate) fn new_dict(&mut self, entries: Vec<(Value, Value)>) -> Result<Value, RuntimeError> {
        let mut table = Table::new();
        for (key, value) in entries {
            let hash = self.hash_of(&key)?;
            table.insert(hash, key, value);
        }
        Ok(self.heap.alloc_value(HeapObject::Dict(table)))
    }

    pub(crate) fn new_set(&mut self, items: Vec<Value>) -> Result<Value, RuntimeError> {
        let table = self.build_set_table(items)?;
        Ok(self.heap.alloc_value(HeapObject::Set(table)))
    }

    fn build_set_table(&self, items: Vec<Value>) -> Result<Table, RuntimeError> {
        let mut table = Table::new();
        for item in items {
            let hash = self.hash_of(&item)?;
            if !table.contains(&hash) {
                table.insert(hash, item, Value::None);
            }
        }
        Ok(table)
    }

    /// Whether `value.name` is a built-in method
    pub(crate) fn has_native_method(&self, value: &Value, name: &str) -> bool {
        match value {
            Value::Str(_) => STR_METHODS.contains(&name),
            Value::Float(_) => name == "is_integer",
            Value::Int(_) => name == "bit_length",
            Value::Ref(addr) => match self.heap.get(*addr) {
                Some(HeapObject::List(_)) => LIST_METHODS.contains(&name),
                Some(HeapObject::Dict(_)) => DICT_METHODS.contains(&name),
                Some(HeapObject::Set(_)) => SET_METHODS.contains(&name),
                _ => false,
            },
            _ => false,
        }
    }

    /// Call a built-in method on `receiver`
    pub(crate) fn call_native_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let accepts_keywords = matches!(name, "sort" | "format" | "split" | "__init__");
        if !kwargs.is_empty() && !accepts_keywords {
            return Err(self.type_error(format!("{}() takes no keyword arguments", name)));
        }

        match &receiver {
            Value::Str(s) => self.str_method(s.to_string(), name, args, kwargs),
            Value::Float(x) if name == "is_integer" => {
                self.method_arity(name, &args, 0, 0)?;
                Ok(Value::Bool(x.is_finite() && x.fract() == 0.0))
            }
            Value::Int(n) if name == "bit_length" => {
                self.method_arity(name, &args, 0, 0)?;
                Ok(Value::Int(i64::from(64 - n.unsigned_abs().leading_zeros())))
            }
            Value::Ref(addr) => {
                let addr = *addr;
                match self.heap.get(addr) {
                    Some(HeapObject::List(_)) => self.list_method(addr, name, args, kwargs),
                    Some(HeapObject::Dict(_)) => self.dict_method(addr, name, args),
                    Some(HeapObject::Set(_)) => self.set_method(addr, name, args),
                    Some(HeapObject::Instance(instance)) if name == "__init__" => {
                        if is_exception_class(&self.heap, instance.class) {
                            if let Some(HeapObject::Instance(instance)) = self.heap.get_mut(addr) {
                                instance.args = args;
                            }
                        }
                        Ok(Value::None)
                    }
                    _ => Err(self.attribute_error(format!(
                        "'{}' object has no attribute '{}'",
                        self.heap.type_name(&receiver),
                        name
                    ))),
                }
            }
            other => Err(self.attribute_error(format!(
                "'{}' object has no attribute '{}'",
                self.heap.type_name(other),
                name
            ))),
        }
    }

    fn method_arity(
        &self,
        name: &str,
        args: &[Value],
        min: usize,
        max: usize,
    ) -> Result<(), RuntimeError> {
        let n = args.len();
        if n >= min && n <= max {
            return Ok(());
        }
        let message = match (min, max) {
            (0, 0) => format!("{}() takes no arguments ({} given)", name, n),
            (a, b) if a == b => format!("{}() takes exactly one argument ({} given)", name, n),
            (_, b) if n > b => format!("{} expected at most {} arguments, got {}", name, b, n),
            (a, _) => {
                let plural = if a == 1 { "" } else { "s" };
                format!("{} expected at least {} argument{}, got {}", name, a, plural, n)
            }
        };
        Err(self.type_error(message))
    }

    fn list_items(&self, addr: Address) -> Vec<Value> {
        match self.heap.get(addr) {
            Some(HeapObject::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    fn with_list<R>(&mut self, addr: Address, f: impl FnOnce(&mut Vec<Value>) -> R) -> Option<R> {
        match self.heap.get_mut(addr) {
            Some(HeapObject::List(items)) => Some(f(items)),
            _ => None,
        }
    }

    /// Position of the first item equal to `needle`
    fn position_of(
        &mut self,
        items: &[Value],
        needle: &Value,
    ) -> Result<Option<usize>, RuntimeError> {
        for (i, item) in items.iter().enumerate() {
            if self.equals(item, needle)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn list_method(
        &mut self,
        addr: Address,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        match name {
            "append" => {
                self.method_arity(name, &args, 1, 1)?;
                let item = args.into_iter().next().unwrap_or_default();
                self.with_list(addr, |items| items.push(item));
                Ok(Value::None)
            }
            "extend" => {
                self.method_arity(name, &args, 1, 1)?;
                let extra = self.iterate(&args[0])?;
                self.with_list(addr, |items| items.extend(extra));
                Ok(Value::None)
            }
            "insert" => {
                self.method_arity(name, &args, 2, 2)?;
                let index = self.index_value(&args[0])?;
                let item = args[1].clone();
                self.with_list(addr, |items| {
                    let len = items.len() as i64;
                    let pos = if index < 0 { (index + len).max(0) } else { index.min(len) };
                    items.insert(pos as usize, item);
                });
                Ok(Value::None)
            }
            "pop" => {
                self.method_arity(name, &args, 0, 1)?;
                let index = match args.first() {
                    Some(value) => self.index_value(value)?,
                    None => -1,
                };
                let popped = self.with_list(addr, |items| {
                    if items.is_empty() {
                        return Err("pop from empty list");
                    }
                    let len = items.len() as i64;
                    let pos = if index < 0 { index + len } else { index };
                    if pos < 0 || pos >= len {
                        return Err("pop index out of range");
                    }
                    Ok(items.remove(pos as usize))
                });
                match popped {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(message)) => Err(self.index_error(message)),
                    None => Ok(Value::None),
                }
            }
            "remove" => {
                self.method_arity(name, &args, 1, 1)?;
                let items = self.list_items(addr);
                match self.position_of(&items, &args[0])? {
                    Some(pos) => {
                        self.with_list(addr, |items| items.remove(pos));
                        Ok(Value::None)
                    }
                    None => Err(self.value_error("list.remove(x): x not in list")),
                }
            }
            "index" => {
                self.method_arity(name, &args, 1, 3)?;
                let items = self.list_items(addr);
                let len = items.len() as i64;
                let clamp = |n: i64| (if n < 0 { (n + len).max(0) } else { n.min(len) }) as usize;
                let start = match args.get(1) {
                    Some(v) => clamp(self.index_value(v)?),
                    None => 0,
                };
                let end = match args.get(2) {
                    Some(v) => clamp(self.index_value(v)?),
                    None => items.len(),
                };
                let window = items.get(start..end.max(start)).unwrap_or(&[]);
                match self.position_of(window, &args[0])? {
                    Some(pos) => Ok(Value::Int((start + pos) as i64)),
                    None => {
                        let shown = self.repr_of(&args[0])?;
                        Err(self.value_error(format!("{} is not in list", shown)))
                    }
                }
            }
            "count" => {
                self.method_arity(name, &args, 1, 1)?;
                let items = self.list_items(addr);
                let mut count = 0;
                for item in &items {
                    if self.equals(item, &args[0])? {
                        count += 1;
                    }
                }
                Ok(Value::Int(count))
            }
            "reverse" => {
                self.method_arity(name, &args, 0, 0)?;
                self.with_list(addr, |items| items.reverse());
                Ok(Value::None)
            }
            "sort" => {
                self.method_arity(name, &args, 0, 0)?;
                let (key, reverse) = self.sort_options(kwargs, "sort")?;
                let items = self.list_items(addr);
                let sorted = self.sort_values(items, key, reverse)?;
                self.with_list(addr, |items| *items = sorted);
                Ok(Value::None)
            }
            "copy" => {
                self.method_arity(name, &args, 0, 0)?;
                let items = self.list_items(addr);
                Ok(self.new_list(items))
            }
            "clear" => {
                self.method_arity(name, &args, 0, 0)?;
                self.with_list(addr, Vec::clear);
                Ok(Value::None)
            }
            _ => Err(self.attribute_error(format!("'list' object has no attribute '{}'", name))),
        }
    }

    fn table_of(&self, addr: Address) -> Table {
        match self.heap.get(addr) {
            Some(HeapObject::Dict(table) | HeapObject::Set(table)) => table.clone(),
            _ => Table::new(),
        }
    }

    fn with_table<R>(&mut self, addr: Address, f: impl FnOnce(&mut Table) -> R) -> Option<R> {
        match self.heap.get_mut(addr) {
            Some(HeapObject::Dict(table) | HeapObject::Set(table)) => Some(f(table)),
            _ => None,
        }
    }

    pub(crate) fn key_error(&mut self, key: &Value) -> RuntimeError {
        let shown = self
            .repr_of(key)
            .unwrap_or_else(|_| crate::interpreter::format::repr_plain(&self.heap, key));
        RuntimeError::KeyNotFound {
            key: shown,
            value: key.clone(),
            location: self.current_location,
        }
    }

    fn dict_method(
        &mut self,
        addr: Address,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match name {
            "get" => {
                self.method_arity(name, &args, 1, 2)?;
                let hash = self.hash_of(&args[0])?;
                let found = self.table_of_ref(addr).and_then(|t| t.get(&hash).cloned());
                Ok(found.or_else(|| args.get(1).cloned()).unwrap_or_default())
            }
            "keys" | "values" | "items" => {
                self.method_arity(name, &args, 0, 0)?;
                let table = self.table_of(addr);
                let items = match name {
                    "keys" => table.keys(),
                    "values" => table.values(),
                    _ => table
                        .entries()
                        .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                        .collect(),
                };
                Ok(self.new_list(items))
            }
            "pop" => {
                self.method_arity(name, &args, 1, 2)?;
                let hash = self.hash_of(&args[0])?;
                match self.with_table(addr, |t| t.remove(&hash)).flatten() {
                    Some((_, value)) => Ok(value),
                    None => match args.get(1) {
                        Some(default) => Ok(default.clone()),
                        None => Err(self.key_error(&args[0])),
                    },
                }
            }
            "popitem" => {
                self.method_arity(name, &args, 0, 0)?;
                let last = self.table_of_ref(addr).and_then(|t| t.entries().next_back().cloned());
                let Some((key, value)) = last else {
                    return Err(RuntimeError::KeyNotFound {
                        key: "'popitem(): dictionary is empty'".to_string(),
                        value: Value::str("popitem(): dictionary is empty"),
                        location: self.current_location,
                    });
                };
                let hash = self.hash_of(&key)?;
                self.with_table(addr, |t| t.remove(&hash));
                Ok(Value::tuple(vec![key, value]))
            }
            "setdefault" => {
                self.method_arity(name, &args, 1, 2)?;
                let hash = self.hash_of(&args[0])?;
                let existing = self.table_of_ref(addr).and_then(|t| t.get(&hash).cloned());
                if let Some(existing) = existing {
                    return Ok(existing);
                }
                let default = args.get(1).cloned().unwrap_or_default();
                let key = args[0].clone();
                let stored = default.clone();
                self.with_table(addr, |t| t.insert(hash, key, stored));
                Ok(default)
            }
            "update" => {
                self.method_arity(name, &args, 0, 1)?;
                let Some(source) = args.first() else {
                    return Ok(Value::None);
                };
                let pairs = match source.address().and_then(|a| self.heap.get(a)) {
                    Some(HeapObject::Dict(table)) => table.entries().cloned().collect::<Vec<_>>(),
                    _ => {
                        let mut pairs = Vec::new();
                        for item in self.iterate(source)? {
                            let pair = self.iterate(&item)?;
                            if pair.len() != 2 {
                                return Err(self.value_error(format!(
                                    "dictionary update sequence element has length {}; 2 is required",
                                    pair.len()
                                )));
                            }
                            let mut pair = pair.into_iter();
                            let key = pair.next().unwrap_or_default();
                            pairs.push((key, pair.next().unwrap_or_default()));
                        }
                        pairs
                    }
                };
                for (key, value) in pairs {
                    let hash = self.hash_of(&key)?;
                    self.with_table(addr, |t| t.insert(hash, key, value));
                }
                Ok(Value::None)
            }
            "copy" => {
                self.method_arity(name, &args, 0, 0)?;
                let table = self.table_of(addr);
                Ok(self.heap.alloc_value(HeapObject::Dict(table)))
            }
            "clear" => {
                self.method_arity(name, &args, 0, 0)?;
                self.with_table(addr, Table::clear);
                Ok(Value::None)
            }
            _ => Err(self.attribute_error(format!("'dict' object has no attribute '{}'", name))),
        }
    }

    fn table_of_ref(&self, addr: Address) -> Option<&Table> {
        match self.heap.get(addr) {
            Some(HeapObject::Dict(table) | HeapObject::Set(table)) => Some(table),
            _ => None,
        }
    }

    /// Members of any iterable, as a set table
    fn set_operand(&mut self, value: &Value) -> Result<Table, RuntimeError> {
        if let Some(HeapObject::Set(table)) = value.address().and_then(|a| self.heap.get(a)) {
            return Ok(table.clone());
        }
        let items = self.iterate(value)?;
        self.build_set_table(items)
    }

    fn set_method(
        &mut self,
        addr: Address,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match name {
            "add" => {
                self.method_arity(name, &args, 1, 1)?;
                let hash = self.hash_of(&args[0])?;
                let item = args[0].clone();
                self.with_table(addr, |t| {
                    if !t.contains(&hash) {
                        t.insert(hash, item, Value::None);
                    }
                });
                Ok(Value::None)
            }
            "remove" | "discard" => {
                self.method_arity(name, &args, 1, 1)?;
                let hash = self.hash_of(&args[0])?;
                let removed = self.with_table(addr, |t| t.remove(&hash)).flatten();
                if removed.is_none() && name == "remove" {
                    return Err(self.key_error(&args[0]));
                }
                Ok(Value::None)
            }
            "pop" => {
                self.method_arity(name, &args, 0, 0)?;
                let first = self.table_of_ref(addr).and_then(|t| t.keys().into_iter().next());
                let Some(item) = first else {
                    return Err(RuntimeError::KeyNotFound {
                        key: "'pop from an empty set'".to_string(),
                        value: Value::str("pop from an empty set"),
                        location: self.current_location,
                    });
                };
                let hash = self.hash_of(&item)?;
                self.with_table(addr, |t| t.remove(&hash));
                Ok(item)
            }
            "union" | "intersection" | "difference" | "symmetric_difference" => {
                let mut result = self.table_of(addr);
                for other in &args {
                    let other = self.set_operand(other)?;
                    result = combine_sets(&result, &other, name);
                }
                Ok(self.heap.alloc_value(HeapObject::Set(result)))
            }
            "update" => {
                for other in &args {
                    let other = self.set_operand(other)?;
                    let merged = combine_sets(&self.table_of(addr), &other, "union");
                    self.with_table(addr, |t| *t = merged);
                }
                Ok(Value::None)
            }
            "issubset" | "issuperset" | "isdisjoint" => {
                self.method_arity(name, &args, 1, 1)?;
                let own = self.table_of(addr);
                let other = self.set_operand(&args[0])?;
                let result = match name {
                    "issubset" => is_subset(&own, &other),
                    "issuperset" => is_subset(&other, &own),
                    _ => combine_sets(&own, &other, "intersection").is_empty(),
                };
                Ok(Value::Bool(result))
            }
            "copy" => {
                self.method_arity(name, &args, 0, 0)?;
                let table = self.table_of(addr);
                Ok(self.heap.alloc_value(HeapObject::Set(table)))
            }
            "clear" => {
                self.method_arity(name, &args, 0, 0)?;
                self.with_table(addr, Table::clear);
                Ok(Value::None)
            }
            _ => Err(self.attribute_error(format!("'set' object has no attribute '{}'", name))),
        }
    }

    fn str_arg<'v>(&self, method: &str, value: &'v Value) -> Result<&'v str, RuntimeError> {
        value.as_str().ok_or_else(|| {
            self.type_error(format!(
                "{}() argument must be str, not {}",
                method,
                self.heap.type_name(value)
            ))
        })
    }

    fn str_method(
        &mut self,
        s: String,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let text = |t: &str| Value::str(t);
        match name {
            "join" => {
                self.method_arity(name, &args, 1, 1)?;
                let mut parts = Vec::new();
                for (i, item) in self.iterate(&args[0])?.into_iter().enumerate() {
                    match item {
                        Value::Str(part) => parts.push(part.to_string()),
                        other => {
                            return Err(self.type_error(format!(
                                "sequence item {}: expected str instance, {} found",
                                i,
                                self.heap.type_name(&other)
                            )))
                        }
                    }
                }
                Ok(text(&parts.join(&s)))
            }
            "split" => {
                let mut sep = args.first().cloned().unwrap_or_default();
                let mut maxsplit = match args.get(1) {
                    Some(v) => self.index_value(v)?,
                    None => -1,
                };
                for (key, value) in kwargs {
                    match key.as_str() {
                        "sep" => sep = value,
                        "maxsplit" => maxsplit = self.index_value(&value)?,
                        _ => {
                            return Err(self.type_error(format!(
                                "'{}' is an invalid keyword argument for split()",
                                key
                            )))
                        }
                    }
                }
                let limit = usize::try_from(maxsplit).ok();
                let parts: Vec<String> = match &sep {
                    Value::None => split_whitespace(&s, limit),
                    Value::Str(sep) if sep.is_empty() => {
                        return Err(self.value_error("empty separator"))
                    }
                    Value::Str(sep) => match limit {
                        Some(n) => s.splitn(n + 1, &**sep).map(str::to_string).collect(),
                        None => s.split(&**sep).map(str::to_string).collect(),
                    },
                    other => {
                        return Err(self.type_error(format!(
                            "must be str or None, not {}",
                            self.heap.type_name(other)
                        )))
                    }
                };
                let items = parts.iter().map(|p| text(p)).collect();
                Ok(self.new_list(items))
            }
            "splitlines" => {
                self.method_arity(name, &args, 0, 0)?;
                let items = s.lines().map(text).collect();
                Ok(self.new_list(items))
            }
            "strip" | "lstrip" | "rstrip" => {
                self.method_arity(name, &args, 0, 1)?;
                let chars: Option<Vec<char>> = match args.first() {
                    None | Some(Value::None) => None,
                    Some(v) => Some(self.str_arg(name, v)?.chars().collect()),
                };
                let matches = |c: char| match &chars {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                let stripped = match name {
                    "strip" => s.trim_matches(matches),
                    "lstrip" => s.trim_start_matches(matches),
                    _ => s.trim_end_matches(matches),
                };
                Ok(text(stripped))
            }
            "lower" => {
                self.method_arity(name, &args, 0, 0)?;
                Ok(text(&s.to_lowercase()))
            }
            "upper" => {
                self.method_arity(name, &args, 0, 0)?;
                Ok(text(&s.to_uppercase()))
            }
            "replace" => {
                self.method_arity(name, &args, 2, 3)?;
                let old = self.str_arg(name, &args[0])?;
                let new = self.str_arg(name, &args[1])?;
                let replaced = match args.get(2) {
                    Some(count) => match usize::try_from(self.index_value(count)?) {
                        Ok(n) => s.replacen(old, new, n),
                        Err(_) => s.replace(old, new),
                    },
                    None => s.replace(old, new),
                };
                Ok(text(&replaced))
            }
            "startswith" | "endswith" => {
                self.method_arity(name, &args, 1, 1)?;
                let options: Vec<Value> = match &args[0] {
                    Value::Tuple(items) => items.to_vec(),
                    other => vec![other.clone()],
                };
                for option in &options {
                    let affix = self.str_arg(name, option)?;
                    let hit = if name == "startswith" {
                        s.starts_with(affix)
                    } else {
                        s.ends_with(affix)
                    };
                    if hit {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "find" | "rfind" | "index" => {
                self.method_arity(name, &args, 1, 1)?;
                let needle = self.str_arg(name, &args[0])?;
                let byte = if name == "rfind" { s.rfind(needle) } else { s.find(needle) };
                match byte {
                    Some(b) => Ok(Value::Int(s[..b].chars().count() as i64)),
                    None if name == "index" => Err(self.value_error("substring not found")),
                    None => Ok(Value::Int(-1)),
                }
            }
            "count" => {
                self.method_arity(name, &args, 1, 1)?;
                let needle = self.str_arg(name, &args[0])?;
                let count = if needle.is_empty() {
                    s.chars().count() + 1
                } else {
                    s.matches(needle).count()
                };
                Ok(Value::Int(count as i64))
            }
            "isdigit" | "isalpha" | "isalnum" | "isspace" => {
                self.method_arity(name, &args, 0, 0)?;
                let test: fn(char) -> bool = match name {
                    "isdigit" => |c| c.is_ascii_digit(),
                    "isalpha" => char::is_alphabetic,
                    "isalnum" => char::is_alphanumeric,
                    _ => char::is_whitespace,
                };
                Ok(Value::Bool(!s.is_empty() && s.chars().all(test)))
            }
            "isupper" | "islower" => {
                self.method_arity(name, &args, 0, 0)?;
                let cased: Vec<char> = s.chars().filter(|c| c.is_alphabetic()).collect();
                let result = !cased.is_empty()
                    && if name == "isupper" {
                        cased.iter().all(|c| !c.is_lowercase())
                    } else {
                        cased.iter().all(|c| !c.is_uppercase())
                    };
                Ok(Value::Bool(result))
            }
            "title" => {
                self.method_arity(name, &args, 0, 0)?;
                let mut out = String::with_capacity(s.len());
                let mut previous_cased = false;
                for c in s.chars() {
                    if previous_cased {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    previous_cased = c.is_alphabetic();
                }
                Ok(text(&out))
            }
            "capitalize" => {
                self.method_arity(name, &args, 0, 0)?;
                let mut chars = s.chars();
                let out = match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                };
                Ok(text(&out))
            }
            "format" => {
                let formatted = self.format_template(&s, &args, &kwargs)?;
                Ok(text(&formatted))
            }
            "zfill" => {
                self.method_arity(name, &args, 1, 1)?;
                let width = usize::try_from(self.index_value(&args[0])?).unwrap_or(0);
                let len = s.chars().count();
                if len >= width {
                    return Ok(text(&s));
                }
                let pad = "0".repeat(width - len);
                let out = match s.strip_prefix(['+', '-']) {
                    Some(rest) => format!("{}{}{}", &s[..1], pad, rest),
                    None => pad + &s,
                };
                Ok(text(&out))
            }
            "center" | "ljust" | "rjust" => {
                self.method_arity(name, &args, 1, 2)?;
                let width = usize::try_from(self.index_value(&args[0])?).unwrap_or(0);
                let fill = match args.get(1) {
                    Some(v) => {
                        let f = self.str_arg(name, v)?;
                        let mut chars = f.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => c,
                            _ => {
                                return Err(self.type_error(
                                    "The fill character must be exactly one character long",
                                ))
                            }
                        }
                    }
                    None => ' ',
                };
                let len = s.chars().count();
                if len >= width {
                    return Ok(text(&s));
                }
                let gap = width - len;
                let pad = |n: usize| fill.to_string().repeat(n);
                let out = match name {
                    "ljust" => s.clone() + &pad(gap),
                    "rjust" => pad(gap) + &s,
                    _ => {
                        // Odd padding goes to the right unless the width is odd
                        let left = gap / 2 + (gap & width & 1);
                        format!("{}{}{}", pad(left), s, pad(gap - left))
                    }
                };
                Ok(text(&out))
            }
            "partition" => {
                self.method_arity(name, &args, 1, 1)?;
                let sep = self.str_arg(name, &args[0])?;
                if sep.is_empty() {
                    return Err(self.value_error("empty separator"));
                }
                let parts = match s.split_once(sep) {
                    Some((head, tail)) => vec![text(head), text(sep), text(tail)],
                    None => vec![text(&s), text(""), text("")],
                };
                Ok(Value::tuple(parts))
            }
            _ => Err(self.attribute_error(format!("'str' object has no attribute '{}'", name))),
        }
    }
}

/// `str.split()` without a separator: runs of whitespace, at most `limit` splits
fn split_whitespace(s: &str, limit: Option<usize>) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if limit.is_some_and(|n| parts.len() == n) {
            parts.push(rest.to_string());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parts.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    parts
}

fn combine_sets(left: &Table, right: &Table, op: &str) -> Table {
    let mut result = Table::new();
    let mut add = |entries: Vec<(HashKey, Value)>, keep: &dyn Fn(&HashKey) -> bool| {
        for (hash, value) in entries {
            if keep(&hash) && !result.contains(&hash) {
                result.insert(hash, value, Value::None);
            }
        }
    };
    match op {
        "union" => {
            add(left.keyed(), &|_| true);
            add(right.keyed(), &|_| true);
        }
        "intersection" => add(left.keyed(), &|h| right.contains(h)),
        "difference" => add(left.keyed(), &|h| !right.contains(h)),
        _ => {
            add(left.keyed(), &|h| !right.contains(h));
            add(right.keyed(), &|h| !left.contains(h));
        }
    }
    result
}

fn is_subset(small: &Table, big: &Table) -> bool {
    small.keyed().iter().all(|(hash, _)| big.contains(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_whitespace_limits() {
        assert_eq!(split_whitespace("  a b  c ", None), vec!["a", "b", "c"]);
        assert_eq!(split_whitespace("a b c", Some(1)), vec!["a", "b c"]);
        assert!(split_whitespace("   ", None).is_empty());
    }

    #[test]
    fn test_set_algebra() {
        let table = |items: &[i64]| {
            let mut t = Table::new();
            for &n in items {
                t.insert(HashKey::Int(n), Value::Int(n), Value::None);
            }
            t
        };
        let a = table(&[1, 2, 3]);
        let b = table(&[2, 3, 4]);
        assert_eq!(combine_sets(&a, &b, "union").len(), 4);
        assert_eq!(combine_sets(&a, &b, "intersection").len(), 2);
        assert_eq!(combine_sets(&a, &b, "difference").len(), 1);
        assert_eq!(combine_sets(&a, &b, "symmetric_difference").len(), 2);
        assert!(is_subset(&table(&[2]), &a));
        assert!(!is_subset(&b, &a));
    }
}
