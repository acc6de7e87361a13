//! Conversions of values to text
//!
//! `str()`, `repr()`, truthiness, the format-spec mini-language used by
//! `format()`, f-strings and `str.format`, and printf-style `%` formatting.
//!
//! [`repr_plain`] renders a value from the heap alone, without running user
//! `__repr__` methods; the interpreter methods defer to user code where a class
//! defines it.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{Heap, HeapObject};
use crate::memory::value::{format_float, Address, Value};

/// `repr()` of a string; double quotes only when the text has a `'` and no `"`
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// `repr()` of a value computed from the heap alone
pub fn repr_plain(heap: &Heap, value: &Value) -> String {
    let mut guard = Vec::new();
    repr_guarded(heap, value, &mut guard)
}

fn repr_guarded(heap: &Heap, value: &Value, guard: &mut Vec<Address>) -> String {
    match value {
        Value::Tuple(items) => {
            let parts: Vec<String> = items.iter().map(|v| repr_guarded(heap, v, guard)).collect();
            tuple_text(&parts)
        }
        Value::Ref(addr) => {
            let Some(object) = heap.get(*addr) else {
                return "<freed object>".to_string();
            };
            if guard.contains(addr) {
                return cycle_marker(object).to_string();
            }
            guard.push(*addr);
            let text = match object {
                HeapObject::List(items) => {
                    let parts: Vec<String> =
                        items.iter().map(|v| repr_guarded(heap, v, guard)).collect();
                    format!("[{}]", parts.join(", "))
                }
                HeapObject::Dict(table) => {
                    let parts: Vec<String> = table
                        .entries()
                        .map(|(k, v)| {
                            format!(
                                "{}: {}",
                                repr_guarded(heap, k, guard),
                                repr_guarded(heap, v, guard)
                            )
                        })
                        .collect();
                    format!("{{{}}}", parts.join(", "))
                }
                HeapObject::Set(table) => {
                    let parts: Vec<String> =
                        table.keys().iter().map(|v| repr_guarded(heap, v, guard)).collect();
                    set_text(&parts)
                }
                HeapObject::Instance(instance) if is_exception_class(heap, instance.class) => {
                    let parts: Vec<String> =
                        instance.args.iter().map(|v| repr_guarded(heap, v, guard)).collect();
                    format!("{}({})", heap.class_name(instance.class), parts.join(", "))
                }
                _ => object_text(heap, *addr, object),
            };
            guard.pop();
            text
        }
        other => leaf_text(other),
    }
}

fn cycle_marker(object: &HeapObject) -> &'static str {
    match object {
        HeapObject::Dict(_) => "{...}",
        HeapObject::Set(_) => "set(...)",
        _ => "[...]",
    }
}

fn tuple_text(parts: &[String]) -> String {
    if parts.len() == 1 {
        format!("({},)", parts[0])
    } else {
        format!("({})", parts.join(", "))
    }
}

fn set_text(parts: &[String]) -> String {
    if parts.is_empty() {
        "set()".to_string()
    } else {
        format!("{{{}}}", parts.join(", "))
    }
}

/// Whether `class` derives from a built-in exception class
pub(crate) fn is_exception_class(heap: &Heap, class: Address) -> bool {
    heap.class(class).is_some_and(|c| {
        c.mro
            .last()
            .and_then(|&root| heap.class(root))
            .is_some_and(|root| root.builtin)
    })
}

/// Text of values that contain no other values
fn leaf_text(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => format_float(*x),
        Value::Str(s) => repr_str(s),
        Value::Range { start, stop, step } if *step == 1 => format!("range({}, {})", start, stop),
        Value::Range { start, stop, step } => format!("range({}, {}, {})", start, stop, step),
        Value::Builtin(b) if b.is_type() => format!("<class '{}'>", b.name()),
        Value::Builtin(b) => format!("<built-in function {}>", b.name()),
        Value::Tuple(_) | Value::Ref(_) => String::new(),
    }
}

fn object_text(heap: &Heap, addr: Address, object: &HeapObject) -> String {
    match object {
        HeapObject::Instance(instance) => {
            format!("<__main__.{} object at {:#x}>", heap.class_name(instance.class), addr)
        }
        HeapObject::Class(class) if class.builtin => format!("<class '{}'>", class.name),
        HeapObject::Class(class) => format!("<class '__main__.{}'>", class.name),
        HeapObject::Function(function) => {
            format!("<function {} at {:#x}>", function.def.name, addr)
        }
        HeapObject::BoundMethod { receiver, function } => {
            let name = match heap.get(*function) {
                Some(HeapObject::Function(f)) => f.def.name.clone(),
                _ => "?".to_string(),
            };
            format!(
                "<bound method {}.{} of {}>",
                heap.type_name(receiver),
                name,
                repr_plain(heap, receiver)
            )
        }
        HeapObject::NativeMethod { receiver, name } => {
            format!("<built-in method {} of {} object>", name, heap.type_name(receiver))
        }
        HeapObject::Super { class, .. } => {
            format!("<super: <class '{}'>>", heap.class_name(*class))
        }
        HeapObject::Module(module) => format!("<module '{}' (built-in)>", module.name),
        HeapObject::Scope(_) => format!("<cell at {:#x}>", addr),
        HeapObject::List(_) | HeapObject::Dict(_) | HeapObject::Set(_) => String::new(),
    }
}

/// Parsed `[[fill]align][sign][#][0][width][grouping][.precision][type]`
#[derive(Debug, Clone, Default)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FormatSpec {
    fn parse(spec: &str) -> Option<FormatSpec> {
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = FormatSpec::default();
        let mut i = 0;
        let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

        if chars.len() >= 2 && is_align(chars[1]) {
            parsed.fill = Some(chars[0]);
            parsed.align = Some(chars[1]);
            i = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            parsed.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
            parsed.sign = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            parsed.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            if parsed.align.is_none() {
                parsed.fill = Some('0');
                parsed.align = Some('=');
            }
            i += 1;
        }
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            parsed.width = parsed.width * 10 + d as usize;
            i += 1;
        }
        if let Some(&c @ (',' | '_')) = chars.get(i) {
            parsed.grouping = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            let mut precision = 0;
            let start = i;
            while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                i += 1;
            }
            if i == start {
                return None;
            }
            parsed.precision = Some(precision);
        }
        if let Some(&c) = chars.get(i) {
            parsed.kind = Some(c);
            i += 1;
        }
        (i == chars.len()).then_some(parsed)
    }

    /// Pad `body` (already signed) to the requested width
    fn pad(&self, body: String, numeric: bool) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.fill.unwrap_or(' ');
        let gap = self.width - len;
        let repeat = |n: usize| fill.to_string().repeat(n);
        match self.align.unwrap_or(if numeric { '>' } else { '<' }) {
            '<' => body + &repeat(gap),
            '^' => format!("{}{}{}", repeat(gap / 2), body, repeat(gap - gap / 2)),
            '=' => {
                let split = body
                    .char_indices()
                    .find(|(_, c)| !matches!(c, '+' | '-' | ' '))
                    .map_or(0, |(i, _)| i);
                let prefix_end = if body[split..].starts_with("0x")
                    || body[split..].starts_with("0b")
                    || body[split..].starts_with("0o")
                {
                    split + 2
                } else {
                    split
                };
                format!("{}{}{}", &body[..prefix_end], repeat(gap), &body[prefix_end..])
            }
            _ => repeat(gap) + &body,
        }
    }

    fn sign_prefix(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, Some('+')) => "+",
            (false, Some(' ')) => " ",
            _ => "",
        }
    }
}

/// Insert a separator every three digits of the integer part
fn group_digits(digits: &str, separator: char) -> String {
    let (int_part, rest) = match digits.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => digits.split_at(pos),
        None => (digits, ""),
    };
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped + rest
}

/// Rust's `{:e}` output rewritten with a signed two-digit exponent
fn scientific(x: f64, precision: usize, upper: bool) -> String {
    let text = format!("{:.*e}", precision, x);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exponent.abs())
}

/// `g` presentation: fixed or scientific depending on the exponent
fn general(x: f64, precision: usize, alternate: bool, upper: bool) -> String {
    if !x.is_finite() {
        return non_finite(x, upper);
    }
    let precision = precision.max(1);
    let rounded = format!("{:.*e}", precision - 1, x);
    let exponent: i32 = rounded
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    let text = if exponent >= -4 && exponent < precision as i32 {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, x)
    } else {
        scientific(x, precision - 1, upper)
    };
    if alternate {
        return text;
    }
    match text.split_once(['e', 'E']) {
        Some((mantissa, exp)) => {
            let e = if upper { 'E' } else { 'e' };
            format!("{}{}{}", strip_zeros(mantissa), e, exp)
        }
        None => strip_zeros(&text),
    }
}

fn strip_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

fn non_finite(x: f64, upper: bool) -> String {
    let text = if x.is_nan() { "nan" } else { "inf" };
    if upper {
        text.to_uppercase()
    } else {
        text.to_string()
    }
}

impl<'a> Interpreter<'a> {
    /// `str(value)`
    pub(crate) fn str_of(&mut self, value: &Value) -> Result<String, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Ref(addr) if self.heap.instance(*addr).is_some() => {
                if let Some(text) = self.call_special(value, "__str__", vec![])? {
                    return self.expect_text(text, "__str__");
                }
                let class = self.heap.class_of(value).unwrap_or_default();
                if is_exception_class(&self.heap, class) {
                    return self.exception_message(value);
                }
                self.repr_of(value)
            }
            other => self.repr_of(other),
        }
    }

    /// `repr(value)`
    pub(crate) fn repr_of(&mut self, value: &Value) -> Result<String, RuntimeError> {
        match value {
            Value::Tuple(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items.iter() {
                    parts.push(self.repr_of(item)?);
                }
                Ok(tuple_text(&parts))
            }
            Value::Ref(addr) => {
                let addr = *addr;
                if self.repr_guard.contains(&addr) {
                    return Ok(self.heap.get(addr).map_or("[...]", cycle_marker).to_string());
                }
                if self.heap.instance(addr).is_some() {
                    if let Some(text) = self.call_special(value, "__repr__", vec![])? {
                        return self.expect_text(text, "__repr__");
                    }
                }

                let children: Option<(u8, Vec<Value>)> = match self.heap.get(addr) {
                    Some(HeapObject::List(items)) => Some((0, items.clone())),
                    Some(HeapObject::Dict(table)) => Some((
                        1,
                        table.entries().flat_map(|(k, v)| [k.clone(), v.clone()]).collect(),
                    )),
                    Some(HeapObject::Set(table)) => Some((2, table.keys())),
                    _ => None,
                };
                let Some((shape, children)) = children else {
                    return Ok(repr_plain(&self.heap, value));
                };

                self.repr_guard.push(addr);
                let parts: Result<Vec<String>, RuntimeError> =
                    children.iter().map(|child| self.repr_of(child)).collect();
                self.repr_guard.pop();
                let parts = parts?;

                Ok(match shape {
                    0 => format!("[{}]", parts.join(", ")),
                    1 => {
                        let pairs: Vec<String> = parts
                            .chunks(2)
                            .map(|pair| {
                                let value = pair.get(1).map_or("", String::as_str);
                                format!("{}: {}", pair[0], value)
                            })
                            .collect();
                        format!("{{{}}}", pairs.join(", "))
                    }
                    _ => set_text(&parts),
                })
            }
            other => Ok(leaf_text(other)),
        }
    }

    fn expect_text(&self, value: Value, method: &str) -> Result<String, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(self.type_error(format!(
                "{} returned non-string (type {})",
                method,
                self.heap.type_name(&other)
            ))),
        }
    }

    /// `str()` of an exception instance without a user `__str__`
    pub(crate) fn exception_message(&mut self, instance: &Value) -> Result<String, RuntimeError> {
        if let Some(text) = self.call_special(instance, "__str__", vec![])? {
            return self.expect_text(text, "__str__");
        }
        let Some(object) = instance.address().and_then(|a| self.heap.instance(a)) else {
            return self.str_of(instance);
        };
        let args = object.args.clone();
        let is_key_error = self
            .exception_classes
            .get("KeyError")
            .is_some_and(|&key_error| self.heap.is_subclass(object.class, key_error));

        match args.as_slice() {
            [] => Ok(String::new()),
            [single] if is_key_error => self.repr_of(single),
            [single] => self.str_of(single),
            _ => self.repr_of(&Value::tuple(args)),
        }
    }

    /// Truth value of `value`
    pub(crate) fn truthy(&mut self, value: &Value) -> Result<bool, RuntimeError> {
        Ok(match value {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Range { start, stop, step } => {
                crate::memory::value::range_len(*start, *stop, *step) > 0
            }
            Value::Builtin(_) => true,
            Value::Ref(addr) => match self.heap.get(*addr) {
                Some(HeapObject::List(items)) => !items.is_empty(),
                Some(HeapObject::Dict(table) | HeapObject::Set(table)) => !table.is_empty(),
                Some(HeapObject::Instance(_)) => {
                    if let Some(result) = self.call_special(value, "__bool__", vec![])? {
                        return match result {
                            Value::Bool(b) => Ok(b),
                            other => Err(self.type_error(format!(
                                "__bool__ should return bool, returned {}",
                                self.heap.type_name(&other)
                            ))),
                        };
                    }
                    match self.call_special(value, "__len__", vec![])? {
                        Some(len) => len.as_int().is_some_and(|n| n != 0),
                        None => true,
                    }
                }
                _ => true,
            },
        })
    }

    /// One replacement field of an f-string or `str.format`
    pub(crate) fn format_field(
        &mut self,
        value: &Value,
        conversion: Option<char>,
        spec: &str,
    ) -> Result<String, RuntimeError> {
        let converted = match conversion {
            Some('r') | Some('a') => Value::str(&self.repr_of(value)?),
            Some('s') => Value::str(&self.str_of(value)?),
            Some(other) => {
                return Err(self.value_error(format!(
                    "Unknown conversion specifier {}",
                    other
                )))
            }
            None => value.clone(),
        };
        self.format_with_spec(&converted, spec)
    }

    /// `format(value, spec)`
    pub(crate) fn format_with_spec(
        &mut self,
        value: &Value,
        spec: &str,
    ) -> Result<String, RuntimeError> {
        if spec.is_empty() {
            return self.str_of(value);
        }
        let parsed = FormatSpec::parse(spec)
            .ok_or_else(|| self.value_error("Invalid format specifier"))?;
        let unknown = |this: &Self| {
            this.value_error(format!(
                "Unknown format code '{}' for object of type '{}'",
                parsed.kind.unwrap_or(' '),
                this.heap.type_name(value)
            ))
        };

        match value {
            Value::Str(s) => {
                if !matches!(parsed.kind, None | Some('s')) {
                    return Err(unknown(self));
                }
                if parsed.align == Some('=') {
                    return Err(self.value_error(
                        "'=' alignment not allowed in string format specifier",
                    ));
                }
                let text: String = match parsed.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s.to_string(),
                };
                Ok(parsed.pad(text, false))
            }
            Value::Int(_) | Value::Bool(_)
                if !matches!(parsed.kind, Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%')) =>
            {
                let n = value.as_int().unwrap_or(0);
                if parsed.kind.is_none() && matches!(value, Value::Bool(_)) {
                    let text = self.str_of(value)?;
                    return Ok(parsed.pad(text, true));
                }
                if parsed.precision.is_some() {
                    return Err(self.value_error(
                        "Precision not allowed in integer format specifier",
                    ));
                }
                let magnitude = n.unsigned_abs();
                let prefix = |p: &'static str| if parsed.alternate { p } else { "" };
                let digits = match parsed.kind {
                    None | Some('d') | Some('n') => magnitude.to_string(),
                    Some('b') => format!("{}{:b}", prefix("0b"), magnitude),
                    Some('o') => format!("{}{:o}", prefix("0o"), magnitude),
                    Some('x') => format!("{}{:x}", prefix("0x"), magnitude),
                    Some('X') => format!("{}{:X}", prefix("0X"), magnitude),
                    Some('c') => {
                        let c = u32::try_from(n)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| RuntimeError::overflow(self.current_location))?;
                        return Ok(parsed.pad(c.to_string(), false));
                    }
                    Some(_) => return Err(unknown(self)),
                };
                let digits = match parsed.grouping {
                    Some(sep) => group_digits(&digits, sep),
                    None => digits,
                };
                Ok(parsed.pad(format!("{}{}", parsed.sign_prefix(n < 0), digits), true))
            }
            Value::Int(_) | Value::Bool(_) | Value::Float(_) => {
                let x = value.as_float().unwrap_or(0.0);
                let magnitude = x.abs();
                let upper = parsed.kind.is_some_and(|k| k.is_ascii_uppercase());
                let digits = parsed.precision.unwrap_or(6);
                let body = match parsed.kind {
                    _ if !magnitude.is_finite() && parsed.kind != Some('%') => {
                        non_finite(magnitude, upper)
                    }
                    Some('f') | Some('F') => format!("{:.*}", digits, magnitude),
                    Some('e') | Some('E') => scientific(magnitude, digits, upper),
                    Some('g') | Some('G') => general(magnitude, digits, parsed.alternate, upper),
                    Some('%') => format!("{:.*}%", digits, magnitude * 100.0),
                    Some('n') | None => match parsed.precision {
                        Some(p) => {
                            let text = general(magnitude, p, parsed.alternate, false);
                            if text.contains(['.', 'e', 'n']) {
                                text
                            } else {
                                text + ".0"
                            }
                        }
                        None => format_float(magnitude),
                    },
                    Some(_) => return Err(unknown(self)),
                };
                let body = match parsed.grouping {
                    Some(sep) if magnitude.is_finite() => group_digits(&body, sep),
                    _ => body,
                };
                let negative = x.is_sign_negative() && !x.is_nan();
                Ok(parsed.pad(format!("{}{}", parsed.sign_prefix(negative), body), true))
            }
            _ => {
                if parsed.kind.is_some_and(|k| k != 's') {
                    return Err(unknown(self));
                }
                let text = self.str_of(value)?;
                Ok(parsed.pad(text, false))
            }
        }
    }

    /// `template % args`
    pub(crate) fn percent_format(
        &mut self,
        template: &str,
        args: &Value,
    ) -> Result<String, RuntimeError> {
        let values: Vec<Value> = match args {
            Value::Tuple(items) => items.to_vec(),
            other => vec![other.clone()],
        };
        let mut next = values.into_iter();
        let mut out = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            let mut flags = String::new();
            while let Some(&f @ ('-' | '+' | ' ' | '0' | '#')) = chars.peek() {
                flags.push(f);
                chars.next();
            }
            let mut width = String::new();
            while let Some(&d) = chars.peek().filter(|c| c.is_ascii_digit()) {
                width.push(d);
                chars.next();
            }
            let mut precision = None;
            if chars.peek() == Some(&'.') {
                chars.next();
                let mut digits = String::new();
                while let Some(&d) = chars.peek().filter(|c| c.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                precision = Some(digits);
            }
            let Some(kind) = chars.next() else {
                return Err(self.value_error("incomplete format"));
            };
            if kind == '%' {
                out.push('%');
                continue;
            }

            let value = next
                .next()
                .ok_or_else(|| self.type_error("not enough arguments for format string"))?;
            let mut spec = String::new();
            if flags.contains('-') {
                spec.push('<');
            }
            if flags.contains('+') {
                spec.push('+');
            } else if flags.contains(' ') {
                spec.push(' ');
            }
            if flags.contains('#') {
                spec.push('#');
            }
            if flags.contains('0') && !flags.contains('-') {
                spec.push('0');
            }
            spec.push_str(&width);

            let text = match kind {
                's' | 'r' => {
                    let text = if kind == 's' {
                        self.str_of(&value)?
                    } else {
                        self.repr_of(&value)?
                    };
                    let limit = precision.as_ref().and_then(|p| p.parse::<usize>().ok());
                    let text: String = match limit {
                        Some(p) => text.chars().take(p).collect(),
                        None => text,
                    };
                    let align = if flags.contains('-') { '<' } else { '>' };
                    let spec = format!("{}{}", align, width);
                    self.format_with_spec(&Value::str(&text), &spec)?
                }
                'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'c' => {
                    let int_value = match &value {
                        Value::Float(x) => Value::Int(self.float_to_int(*x)?),
                        Value::Int(_) | Value::Bool(_) => value.clone(),
                        Value::Str(s) if kind == 'c' => Value::str(s),
                        other => {
                            return Err(self.type_error(format!(
                                "%{} format: a real number is required, not {}",
                                kind,
                                self.heap.type_name(other)
                            )))
                        }
                    };
                    if let Value::Str(s) = &int_value {
                        s.to_string()
                    } else {
                        let code = match kind {
                            'i' | 'u' => 'd',
                            other => other,
                        };
                        self.format_with_spec(&int_value, &format!("{}{}", spec, code))?
                    }
                }
                'f' | 'F' | 'e' | 'E' | 'g' | 'G' => {
                    if !value.is_number() {
                        return Err(self.type_error(format!(
                            "must be real number, not {}",
                            self.heap.type_name(&value)
                        )));
                    }
                    let precision = precision.unwrap_or_else(|| "6".to_string());
                    let precision = if precision.is_empty() { "0".to_string() } else { precision };
                    let float_value = Value::Float(value.as_float().unwrap_or(0.0));
                    self.format_with_spec(&float_value, &format!("{}.{}{}", spec, precision, kind))?
                }
                other => {
                    return Err(self.value_error(format!(
                        "unsupported format character '{}' ({:#x})",
                        other, other as u32
                    )))
                }
            };
            out.push_str(&text);
        }

        if next.next().is_some() {
            return Err(self.type_error("not all arguments converted during string formatting"));
        }
        Ok(out)
    }

    /// `template.format(*args, **kwargs)`
    pub(crate) fn format_template(
        &mut self,
        template: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<String, RuntimeError> {
        let mut out = String::new();
        let mut chars = template.chars().peekable();
        let mut auto_index = 0;
        let mut manual = false;

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => return Err(self.value_error("Single '}' encountered in format string")),
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        field.push(c);
                    }
                    if !closed {
                        return Err(self.value_error("Single '{' encountered in format string"));
                    }

                    let (field, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                    let (field, conversion) = match field.split_once('!') {
                        Some((name, conv)) => (name, conv.chars().next()),
                        None => (field, None),
                    };
                    let name_end = field.find(['.', '[']).unwrap_or(field.len());
                    let (head, accessors) = field.split_at(name_end);

                    let mut value = if head.is_empty() {
                        if manual {
                            return Err(self.value_error(
                                "cannot switch from manual field specification to automatic field numbering",
                            ));
                        }
                        let index = auto_index;
                        auto_index += 1;
                        self.positional_field(args, index)?
                    } else if let Ok(index) = head.parse::<usize>() {
                        if auto_index > 0 {
                            return Err(self.value_error(
                                "cannot switch from automatic field numbering to manual field specification",
                            ));
                        }
                        manual = true;
                        self.positional_field(args, index)?
                    } else {
                        kwargs
                            .iter()
                            .find(|(k, _)| k == head)
                            .map(|(_, v)| v.clone())
                            .ok_or_else(|| RuntimeError::KeyNotFound {
                                key: repr_str(head),
                                value: Value::str(head),
                                location: self.current_location,
                            })?
                    };

                    value = self.resolve_field_accessors(value, accessors)?;
                    let text = self.format_field(&value, conversion, spec)?;
                    out.push_str(&text);
                }
                c => out.push(c),
            }
        }
        Ok(out)
    }

    fn positional_field(&self, args: &[Value], index: usize) -> Result<Value, RuntimeError> {
        args.get(index).cloned().ok_or_else(|| {
            self.index_error(format!(
                "Replacement index {} out of range for positional args tuple",
                index
            ))
        })
    }

    /// Apply `.attr` and `[key]` accessors of a replacement field
    fn resolve_field_accessors(
        &mut self,
        mut value: Value,
        accessors: &str,
    ) -> Result<Value, RuntimeError> {
        let mut rest = accessors;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['.', '[']).unwrap_or(after.len());
                value = self.get_attribute(&value, &after[..end])?;
                rest = &after[end..];
            } else if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| self.value_error("Missing ']' in format string"))?;
                let key = &after[..end];
                let key = match key.parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::str(key),
                };
                value = self.get_item(&value, &key)?;
                rest = &after[end + 1..];
            } else {
                return Err(self.value_error(
                    "Only '.' or '[' may follow ']' in format field specifier",
                ));
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_str_quoting() {
        assert_eq!(repr_str("abc"), "'abc'");
        assert_eq!(repr_str("it's"), "\"it's\"");
        assert_eq!(repr_str("a\nb"), "'a\\nb'");
        assert_eq!(repr_str("both ' and \""), "'both \\' and \"'");
    }

    #[test]
    fn test_repr_plain_containers() {
        let mut heap = Heap::new();
        let inner = heap.alloc_value(HeapObject::List(vec![Value::Int(1), Value::str("x")]));
        let outer = Value::tuple(vec![inner, Value::None]);
        assert_eq!(repr_plain(&heap, &outer), "([1, 'x'], None)");
        assert_eq!(repr_plain(&heap, &Value::tuple(vec![Value::Int(1)])), "(1,)");
    }

    #[test]
    fn test_repr_plain_cycle() {
        let mut heap = Heap::new();
        let addr = heap.alloc(HeapObject::List(vec![]));
        if let Some(HeapObject::List(items)) = heap.get_mut(addr) {
            items.push(Value::Ref(addr));
        }
        assert_eq!(repr_plain(&heap, &Value::Ref(addr)), "[[...]]");
    }

    #[test]
    fn test_format_spec_parse() {
        let spec = FormatSpec::parse("*^10.3f").expect("valid spec");
        assert_eq!(spec.fill, Some('*'));
        assert_eq!(spec.align, Some('^'));
        assert_eq!(spec.width, 10);
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.kind, Some('f'));
        assert!(FormatSpec::parse("10.q!").is_none());
    }

    #[test]
    fn test_general_format() {
        assert_eq!(general(1234.5, 6, false, false), "1234.5");
        assert_eq!(general(0.00001, 6, false, false), "1e-05");
        assert_eq!(general(123456789.0, 6, false, false), "1.23457e+08");
        assert_eq!(general(2.0, 3, false, false), "2");
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1234567", ','), "1,234,567");
        assert_eq!(group_digits("1234.50", '_'), "1_234.50");
        assert_eq!(group_digits("123", ','), "123");
    }
}
