//! JSON view of runtime values

use crate::interpreter::format::repr_plain;
use crate::memory::heap::{Heap, HeapObject};
use crate::memory::value::{format_float, Address, Value};
use serde_json::{Map, Number};

/// Convert a value for the `locals` of a snapshot.
///
/// Containers that reach themselves again render the repeated occurrence as
/// `"[...]"` or `"{...}"`.
pub fn to_json(heap: &Heap, value: &Value) -> serde_json::Value {
    let mut guard = Vec::new();
    convert(heap, value, &mut guard)
}

fn convert(heap: &Heap, value: &Value, guard: &mut Vec<Address>) -> serde_json::Value {
    match value {
        Value::None => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(x) => Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(format_float(*x))),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Tuple(items) => {
            serde_json::Value::Array(items.iter().map(|v| convert(heap, v, guard)).collect())
        }
        Value::Ref(addr) => convert_object(heap, *addr, value, guard),
        Value::Range { .. } | Value::Builtin(_) => {
            serde_json::Value::String(repr_plain(heap, value))
        }
    }
}

fn convert_object(
    heap: &Heap,
    addr: Address,
    value: &Value,
    guard: &mut Vec<Address>,
) -> serde_json::Value {
    let Some(object) = heap.get(addr) else {
        return serde_json::Value::String(repr_plain(heap, value));
    };
    if guard.contains(&addr) {
        let marker = if matches!(object, HeapObject::Dict(_)) { "{...}" } else { "[...]" };
        return serde_json::Value::String(marker.to_string());
    }

    guard.push(addr);
    let json = match object {
        HeapObject::List(items) => {
            serde_json::Value::Array(items.iter().map(|v| convert(heap, v, guard)).collect())
        }
        HeapObject::Set(table) => serde_json::Value::Array(
            table.keys().iter().map(|v| convert(heap, v, guard)).collect(),
        ),
        HeapObject::Dict(table) => {
            let mut map = Map::new();
            for (key, item) in table.entries() {
                map.insert(key_text(heap, key), convert(heap, item, guard));
            }
            serde_json::Value::Object(map)
        }
        HeapObject::Instance(_) | HeapObject::Module(_) => {
            serde_json::Value::String(format!("<{} object>", heap.type_name(value)))
        }
        _ => serde_json::Value::String(repr_plain(heap, value)),
    };
    guard.pop();
    json
}

/// Object key for a dict key, stringified like a JSON encoder does
fn key_text(heap: &Heap, key: &Value) -> String {
    match key {
        Value::Str(s) => s.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::None => "null".to_string(),
        Value::Float(x) if x.is_nan() => "NaN".to_string(),
        Value::Float(x) if x.is_infinite() => {
            if *x > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        }
        Value::Float(x) => format_float(*x),
        other => repr_plain(heap, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Interpreter;
    use crate::parser::parse::Parser;
    use serde_json::json;

    fn json_of(source: &str, name: &str) -> serde_json::Value {
        let program = Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("program parses");
        let mut interp = Interpreter::new();
        interp.run(&program).expect("program runs");
        let value = interp.global(name).expect("bound");
        to_json(interp.heap(), &value)
    }

    #[test]
    fn test_primitives() {
        assert_eq!(json_of("x = 3\n", "x"), json!(3));
        assert_eq!(json_of("x = 2.5\n", "x"), json!(2.5));
        assert_eq!(json_of("x = 'hi'\n", "x"), json!("hi"));
        assert_eq!(json_of("x = None\n", "x"), json!(null));
        assert_eq!(json_of("x = True\n", "x"), json!(true));
        assert_eq!(json_of("x = float('inf')\n", "x"), json!("inf"));
    }

    #[test]
    fn test_containers() {
        assert_eq!(json_of("x = [1, (2, 3), 'a']\n", "x"), json!([1, [2, 3], "a"]));
        assert_eq!(json_of("x = {'a': 1, 2: [3]}\n", "x"), json!({"a": 1, "2": [3]}));
        assert_eq!(
            json_of("x = {True: 1, None: 2, 1.5: 3}\n", "x"),
            json!({"true": 1, "null": 2, "1.5": 3})
        );
    }

    #[test]
    fn test_dict_keeps_insertion_order() {
        let value = json_of("x = {'z': 1, 'a': 2, 'm': 3}\n", "x");
        let keys: Vec<&String> = value.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_self_reference() {
        assert_eq!(json_of("x = [1]\nx.append(x)\n", "x"), json!([1, "[...]"]));
        assert_eq!(json_of("x = {}\nx['me'] = x\n", "x"), json!({"me": "{...}"}));
    }

    #[test]
    fn test_instances_and_other_values() {
        assert_eq!(json_of("class Point:\n    pass\np = Point()\n", "p"), json!("<Point object>"));
        assert_eq!(json_of("r = range(3)\n", "r"), json!("range(0, 3)"));
    }
}
