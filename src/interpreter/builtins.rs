//! Built-in function implementations
//!
//! This module provides the functions and types that are available without an
//! import (`print`, `len`, `range`, `int`, ...) and the `math` module.
//!
//! # Implementation Notes
//!
//! - Built-ins are plain [`Value::Builtin`] values, so they can be passed around,
//!   shadowed and called like user functions
//! - `enumerate`, `map`, `filter`, `zip` and `reversed` return lists rather
//!   than lazy iterators
//! - `print` writes to the interpreter's output buffer, never to stdout
//! - All built-ins are implemented as methods on the [`Interpreter`] struct

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::heap::{HeapObject, Module, Namespace};
use crate::memory::value::{range_len, Address, Value};
use crate::parser::ast::BinOp;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Built-in functions and types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Abs,
    All,
    Any,
    Bin,
    Bool,
    Callable,
    Chr,
    Dict,
    Divmod,
    Enumerate,
    Filter,
    Float,
    Format,
    Getattr,
    Hasattr,
    Hex,
    Id,
    Int,
    Isinstance,
    Len,
    List,
    Map,
    Max,
    Min,
    Object,
    Ord,
    Pow,
    Range,
    Repr,
    Reversed,
    Round,
    Set,
    Setattr,
    Sorted,
    Str,
    Sum,
    Super,
    Tuple,
    Type,
    Zip,
    // math module
    Sqrt,
    Floor,
    Ceil,
    Fabs,
    Gcd,
    Factorial,
    Log,
    MathPow,
}

const GLOBAL_BUILTINS: &[Builtin] = &[
    Builtin::Print,
    Builtin::Abs,
    Builtin::All,
    Builtin::Any,
    Builtin::Bin,
    Builtin::Bool,
    Builtin::Callable,
    Builtin::Chr,
    Builtin::Dict,
    Builtin::Divmod,
    Builtin::Enumerate,
    Builtin::Filter,
    Builtin::Float,
    Builtin::Format,
    Builtin::Getattr,
    Builtin::Hasattr,
    Builtin::Hex,
    Builtin::Id,
    Builtin::Int,
    Builtin::Isinstance,
    Builtin::Len,
    Builtin::List,
    Builtin::Map,
    Builtin::Max,
    Builtin::Min,
    Builtin::Object,
    Builtin::Ord,
    Builtin::Pow,
    Builtin::Range,
    Builtin::Repr,
    Builtin::Reversed,
    Builtin::Round,
    Builtin::Set,
    Builtin::Setattr,
    Builtin::Sorted,
    Builtin::Str,
    Builtin::Sum,
    Builtin::Super,
    Builtin::Tuple,
    Builtin::Type,
    Builtin::Zip,
];

const MATH_FUNCTIONS: &[Builtin] = &[
    Builtin::Sqrt,
    Builtin::Floor,
    Builtin::Ceil,
    Builtin::Fabs,
    Builtin::Gcd,
    Builtin::Factorial,
    Builtin::Log,
    Builtin::MathPow,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Abs => "abs",
            Builtin::All => "all",
            Builtin::Any => "any",
            Builtin::Bin => "bin",
            Builtin::Bool => "bool",
            Builtin::Callable => "callable",
            Builtin::Chr => "chr",
            Builtin::Dict => "dict",
            Builtin::Divmod => "divmod",
            Builtin::Enumerate => "enumerate",
            Builtin::Filter => "filter",
            Builtin::Float => "float",
            Builtin::Format => "format",
            Builtin::Getattr => "getattr",
            Builtin::Hasattr => "hasattr",
            Builtin::Hex => "hex",
            Builtin::Id => "id",
            Builtin::Int => "int",
            Builtin::Isinstance => "isinstance",
            Builtin::Len => "len",
            Builtin::List => "list",
            Builtin::Map => "map",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Object => "object",
            Builtin::Ord => "ord",
            Builtin::Pow | Builtin::MathPow => "pow",
            Builtin::Range => "range",
            Builtin::Repr => "repr",
            Builtin::Reversed => "reversed",
            Builtin::Round => "round",
            Builtin::Set => "set",
            Builtin::Setattr => "setattr",
            Builtin::Sorted => "sorted",
            Builtin::Str => "str",
            Builtin::Sum => "sum",
            Builtin::Super => "super",
            Builtin::Tuple => "tuple",
            Builtin::Type => "type",
            Builtin::Zip => "zip",
            Builtin::Sqrt => "sqrt",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Fabs => "fabs",
            Builtin::Gcd => "gcd",
            Builtin::Factorial => "factorial",
            Builtin::Log => "log",
        }
    }

    /// Resolve a name visible without an import
    pub fn from_name(name: &str) -> Option<Builtin> {
        GLOBAL_BUILTINS.iter().copied().find(|b| b.name() == name)
    }

    /// Built-ins that are classes (`int`, `list`, ...) rather than functions
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Builtin::Bool
                | Builtin::Dict
                | Builtin::Float
                | Builtin::Int
                | Builtin::List
                | Builtin::Object
                | Builtin::Range
                | Builtin::Set
                | Builtin::Str
                | Builtin::Tuple
                | Builtin::Type
                | Builtin::Super
        )
    }

    /// Whether calling this built-in can neither write output, mutate an
    /// object nor run user code
    pub fn is_pure(self) -> bool {
        !matches!(
            self,
            Builtin::Print
                | Builtin::Setattr
                | Builtin::Map
                | Builtin::Filter
                | Builtin::Sorted
                | Builtin::Super
                | Builtin::Object
        )
    }
}

impl<'a> Interpreter<'a> {
    /// Call a built-in function
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let name = builtin.name();
        let takes_keywords = matches!(
            builtin,
            Builtin::Print
                | Builtin::Sorted
                | Builtin::Max
                | Builtin::Min
                | Builtin::Dict
                | Builtin::Int
                | Builtin::Enumerate
                | Builtin::Sum
                | Builtin::Round
        );
        if !kwargs.is_empty() && !takes_keywords {
            return Err(self.type_error(format!("{}() takes no keyword arguments", name)));
        }

        match builtin {
            Builtin::Print => self.builtin_print(args, kwargs),
            Builtin::Sorted => self.builtin_sorted(args, kwargs),
            Builtin::Max | Builtin::Min => self.builtin_extreme(builtin, args, kwargs),
            Builtin::Dict => self.builtin_dict(args, kwargs),
            Builtin::Int => self.builtin_int(args, kwargs),
            Builtin::Abs => {
                let [value] = self.exact_args(name, args)?;
                match value {
                    Value::Int(n) => n
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or_else(|| RuntimeError::overflow(self.current_location)),
                    Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    other => match self.call_special(&other, "__abs__", vec![])? {
                        Some(result) => Ok(result),
                        None => Err(self.type_error(format!(
                            "bad operand type for abs(): '{}'",
                            self.heap.type_name(&other)
                        ))),
                    },
                }
            }
            Builtin::All | Builtin::Any => {
                let [iterable] = self.exact_args(name, args)?;
                let want = builtin == Builtin::Any;
                for item in self.iterate(&iterable)? {
                    if self.truthy(&item)? == want {
                        return Ok(Value::Bool(want));
                    }
                }
                Ok(Value::Bool(!want))
            }
            Builtin::Bin | Builtin::Hex => {
                let [value] = self.exact_args(name, args)?;
                let n = self.index_value(&value)?;
                let digits = if builtin == Builtin::Bin {
                    format!("0b{:b}", n.unsigned_abs())
                } else {
                    format!("0x{:x}", n.unsigned_abs())
                };
                Ok(Value::str(&if n < 0 { format!("-{}", digits) } else { digits }))
            }
            Builtin::Bool => match args.len() {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(self.truthy(&args[0])?)),
                n => Err(self.type_error(format!("bool expected at most 1 argument, got {}", n))),
            },
            Builtin::Callable => {
                let [value] = self.exact_args(name, args)?;
                Ok(Value::Bool(self.heap.is_callable(&value)))
            }
            Builtin::Chr => {
                let [value] = self.exact_args(name, args)?;
                let code = self.index_value(&value)?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Value::str(&c.to_string()))
                    .ok_or_else(|| self.value_error("chr() arg not in range(0x110000)"))
            }
            Builtin::Divmod => {
                let [a, b] = self.exact_args(name, args)?;
                let quotient = self.binary_op(BinOp::FloorDiv, a.clone(), b.clone())?;
                let remainder = self.binary_op(BinOp::Mod, a, b)?;
                Ok(Value::tuple(vec![quotient, remainder]))
            }
            Builtin::Enumerate => {
                let mut start = 0;
                for (key, value) in kwargs {
                    if key != "start" {
                        return Err(self.type_error(format!(
                            "'{}' is an invalid keyword argument for enumerate()",
                            key
                        )));
                    }
                    start = self.index_value(&value)?;
                }
                let (iterable, rest) = self.split_first(name, args)?;
                if let Some(value) = rest.first() {
                    start = self.index_value(value)?;
                }
                let items = self.iterate(&iterable)?;
                let mut pairs = Vec::with_capacity(items.len());
                for (offset, item) in items.into_iter().enumerate() {
                    let index = start
                        .checked_add(offset as i64)
                        .ok_or_else(|| RuntimeError::overflow(self.current_location))?;
                    pairs.push(Value::tuple(vec![Value::Int(index), item]));
                }
                Ok(self.new_list(pairs))
            }
            Builtin::Filter => {
                let [function, iterable] = self.exact_args(name, args)?;
                let mut kept = Vec::new();
                for item in self.iterate(&iterable)? {
                    let verdict = if function.is_none() {
                        item.clone()
                    } else {
                        self.call_value(function.clone(), vec![item.clone()], vec![])?
                    };
                    if self.truthy(&verdict)? {
                        kept.push(item);
                    }
                }
                Ok(self.new_list(kept))
            }
            Builtin::Float => match args.as_slice() {
                [] => Ok(Value::Float(0.0)),
                [value] => self.to_float(value).map(Value::Float),
                _ => Err(self.type_error(format!(
                    "float expected at most 1 argument, got {}",
                    args.len()
                ))),
            },
            Builtin::Format => {
                let (value, rest) = self.split_first(name, args)?;
                let spec = match rest.first() {
                    Some(Value::Str(s)) => s.to_string(),
                    Some(other) => {
                        return Err(self.type_error(format!(
                            "format() argument 2 must be str, not {}",
                            self.heap.type_name(other)
                        )))
                    }
                    None => String::new(),
                };
                Ok(Value::str(&self.format_with_spec(&value, &spec)?))
            }
            Builtin::Getattr => {
                if !(2..=3).contains(&args.len()) {
                    return Err(self.type_error(format!(
                        "getattr expected 2 or 3 arguments, got {}",
                        args.len()
                    )));
                }
                let attr = self.attribute_name(&args[1])?;
                match self.get_attribute(&args[0], &attr) {
                    Ok(value) => Ok(value),
                    Err(RuntimeError::MissingAttribute { .. }) if args.len() == 3 => {
                        Ok(args[2].clone())
                    }
                    Err(err) => Err(err),
                }
            }
            Builtin::Hasattr => {
                let [object, attr] = self.exact_args(name, args)?;
                let attr = self.attribute_name(&attr)?;
                match self.get_attribute(&object, &attr) {
                    Ok(_) => Ok(Value::Bool(true)),
                    Err(RuntimeError::MissingAttribute { .. }) => Ok(Value::Bool(false)),
                    Err(err) => Err(err),
                }
            }
            Builtin::Id => {
                let [value] = self.exact_args(name, args)?;
                Ok(Value::Int(self.identity(&value)))
            }
            Builtin::Isinstance => {
                let [object, class] = self.exact_args(name, args)?;
                Ok(Value::Bool(self.isinstance_of(&object, &class)?))
            }
            Builtin::Len => {
                let [value] = self.exact_args(name, args)?;
                Ok(Value::Int(self.len_of(&value)? as i64))
            }
            Builtin::List => match args.len() {
                0 => Ok(self.new_list(Vec::new())),
                1 => {
                    let items = self.iterate(&args[0])?;
                    Ok(self.new_list(items))
                }
                n => Err(self.type_error(format!("list expected at most 1 argument, got {}", n))),
            },
            Builtin::Map => {
                let (function, iterables) = self.split_first(name, args)?;
                if iterables.is_empty() {
                    return Err(self.type_error("map() must have at least two arguments."));
                }
                let columns = iterables
                    .iter()
                    .map(|it| self.iterate(it))
                    .collect::<Result<Vec<_>, _>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut mapped = Vec::with_capacity(len);
                for i in 0..len {
                    let call_args = columns.iter().map(|c| c[i].clone()).collect();
                    mapped.push(self.call_value(function.clone(), call_args, vec![])?);
                }
                Ok(self.new_list(mapped))
            }
            Builtin::Object => Err(RuntimeError::UnsupportedOperation {
                message: "object() instances are not supported".to_string(),
                location: self.current_location,
            }),
            Builtin::Ord => {
                let [value] = self.exact_args(name, args)?;
                let Value::Str(s) = &value else {
                    return Err(self.type_error(format!(
                        "ord() expected string of length 1, but {} found",
                        self.heap.type_name(&value)
                    )));
                };
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Int(c as i64)),
                    _ => Err(self.type_error(format!(
                        "ord() expected a character, but string of length {} found",
                        s.chars().count()
                    ))),
                }
            }
            Builtin::Pow => match args.len() {
                2 => {
                    let mut args = args.into_iter();
                    let base = args.next().unwrap_or_default();
                    let exp = args.next().unwrap_or_default();
                    self.binary_op(BinOp::Pow, base, exp)
                }
                3 => self.modular_pow(&args[0], &args[1], &args[2]),
                n => Err(self.type_error(format!("pow expected 2 or 3 arguments, got {}", n))),
            },
            Builtin::Range => self.builtin_range(args),
            Builtin::Repr => {
                let [value] = self.exact_args(name, args)?;
                Ok(Value::str(&self.repr_of(&value)?))
            }
            Builtin::Reversed => {
                let [value] = self.exact_args(name, args)?;
                let mut items = self.iterate(&value)?;
                items.reverse();
                Ok(self.new_list(items))
            }
            Builtin::Round => self.builtin_round(args, kwargs),
            Builtin::Set => match args.len() {
                0 => self.new_set(Vec::new()),
                1 => {
                    let items = self.iterate(&args[0])?;
                    self.new_set(items)
                }
                n => Err(self.type_error(format!("set expected at most 1 argument, got {}", n))),
            },
            Builtin::Setattr => {
                let [object, attr, value] = self.exact_args(name, args)?;
                let attr = self.attribute_name(&attr)?;
                self.set_attribute(&object, &attr, value)?;
                Ok(Value::None)
            }
            Builtin::Str => match args.as_slice() {
                [] => Ok(Value::str("")),
                [value] => Ok(Value::str(&self.str_of(value)?)),
                _ => Err(self.type_error(format!(
                    "str expected at most 1 argument, got {}",
                    args.len()
                ))),
            },
            Builtin::Sum => {
                let mut total = Value::Int(0);
                for (key, value) in kwargs {
                    if key != "start" {
                        return Err(self.type_error(format!(
                            "'{}' is an invalid keyword argument for sum()",
                            key
                        )));
                    }
                    total = value;
                }
                let (iterable, rest) = self.split_first(name, args)?;
                if let Some(start) = rest.into_iter().next() {
                    total = start;
                }
                if matches!(total, Value::Str(_)) {
                    return Err(
                        self.type_error("sum() can't sum strings [use ''.join(seq) instead]")
                    );
                }
                for item in self.iterate(&iterable)? {
                    total = self.binary_op(BinOp::Add, total, item)?;
                }
                Ok(total)
            }
            Builtin::Super => self.make_super(args),
            Builtin::Tuple => match args.len() {
                0 => Ok(Value::tuple(Vec::new())),
                1 => Ok(Value::tuple(self.iterate(&args[0])?)),
                n => Err(self.type_error(format!("tuple expected at most 1 argument, got {}", n))),
            },
            Builtin::Type => {
                let [value] = self.exact_args(name, args)?;
                Ok(self.type_of(&value))
            }
            Builtin::Zip => {
                let columns = args
                    .iter()
                    .map(|it| self.iterate(it))
                    .collect::<Result<Vec<_>, _>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let rows = (0..len)
                    .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone()).collect()))
                    .collect();
                Ok(self.new_list(rows))
            }
            Builtin::Sqrt | Builtin::Fabs => {
                let [value] = self.exact_args(name, args)?;
                let x = self.to_float_arg(&value)?;
                if builtin == Builtin::Fabs {
                    return Ok(Value::Float(x.abs()));
                }
                if x < 0.0 {
                    return Err(self.value_error("math domain error"));
                }
                Ok(Value::Float(x.sqrt()))
            }
            Builtin::Floor | Builtin::Ceil => {
                let [value] = self.exact_args(name, args)?;
                if let Some(n) = value.as_int() {
                    return Ok(Value::Int(n));
                }
                let x = self.to_float_arg(&value)?;
                let rounded = if builtin == Builtin::Floor { x.floor() } else { x.ceil() };
                self.float_to_int(rounded).map(Value::Int)
            }
            Builtin::Gcd => {
                let mut result: i64 = 0;
                for value in &args {
                    let mut a = self.index_value(value)?.unsigned_abs();
                    let mut b = result.unsigned_abs();
                    while b != 0 {
                        (a, b) = (b, a % b);
                    }
                    result = i64::try_from(a)
                        .map_err(|_| RuntimeError::overflow(self.current_location))?;
                }
                Ok(Value::Int(result))
            }
            Builtin::Factorial => {
                let [value] = self.exact_args(name, args)?;
                let n = self.index_value(&value)?;
                if n < 0 {
                    return Err(self.value_error("factorial() not defined for negative values"));
                }
                let mut result: i64 = 1;
                for k in 2..=n {
                    result = result
                        .checked_mul(k)
                        .ok_or_else(|| RuntimeError::overflow(self.current_location))?;
                }
                Ok(Value::Int(result))
            }
            Builtin::Log => {
                if !(1..=2).contains(&args.len()) {
                    return Err(self.type_error(format!(
                        "log expected 1 or 2 arguments, got {}",
                        args.len()
                    )));
                }
                let x = self.to_float_arg(&args[0])?;
                if x <= 0.0 {
                    return Err(self.value_error("math domain error"));
                }
                match args.get(1) {
                    Some(base) => {
                        let base = self.to_float_arg(base)?;
                        if base <= 0.0 || base == 1.0 {
                            return Err(self.value_error("math domain error"));
                        }
                        Ok(Value::Float(x.ln() / base.ln()))
                    }
                    None => Ok(Value::Float(x.ln())),
                }
            }
            Builtin::MathPow => {
                let [base, exp] = self.exact_args(name, args)?;
                let (base, exp) = (self.to_float_arg(&base)?, self.to_float_arg(&exp)?);
                Ok(Value::Float(base.powf(exp)))
            }
        }
    }

    fn exact_args<const N: usize>(
        &self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<[Value; N], RuntimeError> {
        let given = args.len();
        args.try_into().map_err(|_| {
            if N == 1 {
                self.type_error(format!("{}() takes exactly one argument ({} given)", name, given))
            } else {
                self.type_error(format!("{} expected {} arguments, got {}", name, N, given))
            }
        })
    }

    fn split_first(
        &self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<(Value, Vec<Value>), RuntimeError> {
        let mut args = args.into_iter();
        match args.next() {
            Some(first) => Ok((first, args.collect())),
            None => Err(self.type_error(format!("{}() missing required argument", name))),
        }
    }

    fn attribute_name(&self, value: &Value) -> Result<String, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(self.type_error(format!(
                "attribute name must be string, not '{}'",
                self.heap.type_name(other)
            ))),
        }
    }

    /// Integer value of an int or bool; anything else cannot be used as an index
    pub(crate) fn index_value(&self, value: &Value) -> Result<i64, RuntimeError> {
        value.as_int().ok_or_else(|| {
            self.type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                self.heap.type_name(value)
            ))
        })
    }

    fn to_float_arg(&self, value: &Value) -> Result<f64, RuntimeError> {
        value.as_float().ok_or_else(|| {
            self.type_error(format!("must be real number, not {}", self.heap.type_name(value)))
        })
    }

    pub(crate) fn float_to_int(&self, x: f64) -> Result<i64, RuntimeError> {
        if x.is_nan() {
            return Err(self.value_error("cannot convert float NaN to integer"));
        }
        if x.is_infinite() {
            return Err(RuntimeError::IntegerOverflow {
                message: "cannot convert float infinity to integer".to_string(),
                location: self.current_location,
            });
        }
        if x < -9.223_372_036_854_776e18 || x >= 9.223_372_036_854_776e18 {
            return Err(RuntimeError::overflow(self.current_location));
        }
        Ok(x.trunc() as i64)
    }

    fn builtin_print(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();
        for (key, value) in kwargs {
            let text = match &value {
                Value::None => None,
                Value::Str(s) => Some(s.to_string()),
                other => {
                    return Err(self.type_error(format!(
                        "{} must be None or a string, not {}",
                        key,
                        self.heap.type_name(other)
                    )))
                }
            };
            match key.as_str() {
                "sep" => sep = text.unwrap_or_else(|| " ".to_string()),
                "end" => end = text.unwrap_or_else(|| "\n".to_string()),
                "flush" | "file" => {}
                _ => {
                    return Err(self.type_error(format!(
                        "'{}' is an invalid keyword argument for print()",
                        key
                    )))
                }
            }
        }

        let mut line = String::new();
        for (i, value) in args.iter().enumerate() {
            if i > 0 {
                line.push_str(&sep);
            }
            line.push_str(&self.str_of(value)?);
        }
        line.push_str(&end);
        self.output.push_str(&line);
        Ok(Value::None)
    }

    fn builtin_int(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let mut base = None;
        for (key, value) in kwargs {
            if key != "base" {
                return Err(self.type_error(format!(
                    "'{}' is an invalid keyword argument for int()",
                    key
                )));
            }
            base = Some(self.index_value(&value)?);
        }
        if args.len() > 2 {
            return Err(self.type_error(format!(
                "int() takes at most 2 arguments ({} given)",
                args.len()
            )));
        }
        if let Some(value) = args.get(1) {
            base = Some(self.index_value(value)?);
        }

        let Some(value) = args.first() else {
            return Ok(Value::Int(0));
        };
        match (value, base) {
            (Value::Str(s), base) => self.parse_int(s, base.unwrap_or(10)),
            (_, Some(_)) => {
                Err(self.type_error("int() can't convert non-string with explicit base"))
            }
            (Value::Int(n), None) => Ok(Value::Int(*n)),
            (Value::Bool(b), None) => Ok(Value::Int(i64::from(*b))),
            (Value::Float(x), None) => self.float_to_int(*x).map(Value::Int),
            (other, None) => Err(self.type_error(format!(
                "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                self.heap.type_name(other)
            ))),
        }
    }

    fn parse_int(&self, text: &str, base: i64) -> Result<Value, RuntimeError> {
        let invalid = || {
            self.value_error(format!(
                "invalid literal for int() with base {}: {}",
                base,
                crate::interpreter::format::repr_str(text)
            ))
        };
        if !(base == 0 || (2..=36).contains(&base)) {
            return Err(self.value_error("int() base must be >= 2 and <= 36, or 0"));
        }

        let trimmed = text.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let lower = digits.to_ascii_lowercase();
        let (radix, digits) = match (base, lower.get(..2)) {
            (0 | 16, Some("0x")) => (16, &digits[2..]),
            (0 | 8, Some("0o")) => (8, &digits[2..]),
            (0 | 2, Some("0b")) => (2, &digits[2..]),
            (0, _) => (10, digits),
            (b, _) => (b as u32, digits),
        };
        if digits.is_empty()
            || digits.starts_with('_')
            || digits.ends_with('_')
            || digits.contains("__")
        {
            return Err(invalid());
        }
        let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
        let magnitude = i128::from_str_radix(&cleaned, radix).map_err(|_| invalid())?;
        let value = if negative { -magnitude } else { magnitude };
        i64::try_from(value)
            .map(Value::Int)
            .map_err(|_| RuntimeError::overflow(self.current_location))
    }

    /// `float(value)` conversion
    pub(crate) fn to_float(&self, value: &Value) -> Result<f64, RuntimeError> {
        match value {
            Value::Str(s) => {
                let text = s.trim().to_ascii_lowercase().replace('_', "");
                let parsed = match text.trim_start_matches(['+', '-']) {
                    "inf" | "infinity" | "nan" => {
                        let magnitude =
                            if text.ends_with("nan") { f64::NAN } else { f64::INFINITY };
                        Some(if text.starts_with('-') { -magnitude } else { magnitude })
                    }
                    _ => text.parse::<f64>().ok(),
                };
                parsed.ok_or_else(|| {
                    self.value_error(format!(
                        "could not convert string to float: {}",
                        crate::interpreter::format::repr_str(s)
                    ))
                })
            }
            other => other.as_float().ok_or_else(|| {
                self.type_error(format!(
                    "float() argument must be a string or a real number, not '{}'",
                    self.heap.type_name(other)
                ))
            }),
        }
    }

    fn builtin_range(&self, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let ints = args
            .iter()
            .map(|v| self.index_value(v))
            .collect::<Result<Vec<_>, _>>()?;
        let (start, stop, step) = match ints.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            [] => return Err(self.type_error("range expected at least 1 argument, got 0")),
            _ => {
                return Err(self.type_error(format!(
                    "range expected at most 3 arguments, got {}",
                    ints.len()
                )))
            }
        };
        if step == 0 {
            return Err(self.value_error("range() arg 3 must not be zero"));
        }
        Ok(Value::Range { start, stop, step })
    }

    fn builtin_round(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let mut digits = None;
        for (key, value) in kwargs {
            if key != "ndigits" {
                return Err(self.type_error(format!(
                    "'{}' is an invalid keyword argument for round()",
                    key
                )));
            }
            digits = Some(value);
        }
        let (value, rest) = self.split_first("round", args)?;
        if let Some(d) = rest.into_iter().next() {
            digits = Some(d);
        }
        let digits = match digits {
            None | Some(Value::None) => None,
            Some(d) => Some(self.index_value(&d)?),
        };

        match (value, digits) {
            (Value::Int(n), _) => Ok(Value::Int(n)),
            (Value::Bool(b), _) => Ok(Value::Int(i64::from(b))),
            (Value::Float(x), None) => self.float_to_int(x.round_ties_even()).map(Value::Int),
            (Value::Float(x), Some(d)) => {
                let scale = 10f64.powi(d.clamp(-308, 308) as i32);
                let rounded = (x * scale).round_ties_even() / scale;
                Ok(Value::Float(if rounded.is_finite() { rounded } else { x }))
            }
            (other, _) => Err(self.type_error(format!(
                "type {} doesn't define __round__ method",
                self.heap.type_name(&other)
            ))),
        }
    }

    fn builtin_dict(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        if args.len() > 1 {
            return Err(self.type_error(format!(
                "dict expected at most 1 argument, got {}",
                args.len()
            )));
        }
        let mut entries = Vec::new();
        if let Some(source) = args.first() {
            let mapping = match source.address().and_then(|a| self.heap.get(a)) {
                Some(HeapObject::Dict(table)) => Some(table.entries().cloned().collect::<Vec<_>>()),
                _ => None,
            };
            match mapping {
                Some(pairs) => entries = pairs,
                None => {
                    for item in self.iterate(source)? {
                        let pair = self.iterate(&item)?;
                        let [key, value]: [Value; 2] = pair.try_into().map_err(|p: Vec<Value>| {
                            self.value_error(format!(
                                "dictionary update sequence element has length {}; 2 is required",
                                p.len()
                            ))
                        })?;
                        entries.push((key, value));
                    }
                }
            }
        }
        entries.extend(kwargs.into_iter().map(|(k, v)| (Value::str(&k), v)));
        self.new_dict(entries)
    }

    fn builtin_sorted(
        &mut self,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let [iterable] = self.exact_args("sorted", args)?;
        let (key, reverse) = self.sort_options(kwargs, "sorted")?;
        let items = self.iterate(&iterable)?;
        let sorted = self.sort_values(items, key, reverse)?;
        Ok(self.new_list(sorted))
    }

    /// Parse the `key=` and `reverse=` keyword arguments of `sorted`/`list.sort`
    pub(crate) fn sort_options(
        &mut self,
        kwargs: Vec<(String, Value)>,
        caller: &str,
    ) -> Result<(Option<Value>, bool), RuntimeError> {
        let mut key = None;
        let mut reverse = false;
        for (name, value) in kwargs {
            match name.as_str() {
                "key" => key = (!value.is_none()).then_some(value),
                "reverse" => reverse = self.truthy(&value)?,
                _ => {
                    return Err(self.type_error(format!(
                        "'{}' is an invalid keyword argument for {}()",
                        name, caller
                    )))
                }
            }
        }
        Ok((key, reverse))
    }

    /// Stable merge sort whose comparisons may fail
    pub(crate) fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<Value>,
        reverse: bool,
    ) -> Result<Vec<Value>, RuntimeError> {
        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            let k = match &key {
                Some(function) => self.call_value(function.clone(), vec![item.clone()], vec![])?,
                None => item.clone(),
            };
            keyed.push((k, item));
        }
        let sorted = self.merge_sort(keyed, reverse)?;
        Ok(sorted.into_iter().map(|(_, item)| item).collect())
    }

    fn merge_sort(
        &mut self,
        mut items: Vec<(Value, Value)>,
        reverse: bool,
    ) -> Result<Vec<(Value, Value)>, RuntimeError> {
        if items.len() <= 1 {
            return Ok(items);
        }
        let right = items.split_off(items.len() / 2);
        let left = self.merge_sort(items, reverse)?;
        let right = self.merge_sort(right, reverse)?;

        let mut merged = Vec::with_capacity(left.len() + right.len());
        let mut left = left.into_iter().peekable();
        let mut right = right.into_iter().peekable();
        while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
            let take_right = if reverse {
                self.less_than(&l.0, &r.0)?
            } else {
                self.less_than(&r.0, &l.0)?
            };
            let next = if take_right { right.next() } else { left.next() };
            merged.extend(next);
        }
        merged.extend(left);
        merged.extend(right);
        Ok(merged)
    }

    fn builtin_extreme(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let name = builtin.name();
        let mut key = None;
        let mut default = None;
        for (k, v) in kwargs {
            match k.as_str() {
                "key" => key = (!v.is_none()).then_some(v),
                "default" => default = Some(v),
                _ => {
                    return Err(self.type_error(format!(
                        "'{}' is an invalid keyword argument for {}()",
                        k, name
                    )))
                }
            }
        }

        let items = match args.len() {
            0 => {
                return Err(
                    self.type_error(format!("{} expected at least 1 argument, got 0", name))
                )
            }
            1 => self.iterate(&args[0])?,
            _ => args,
        };

        let mut best: Option<(Value, Value)> = None;
        for item in items {
            let k = match &key {
                Some(function) => self.call_value(function.clone(), vec![item.clone()], vec![])?,
                None => item.clone(),
            };
            let replace = match &best {
                None => true,
                Some((best_key, _)) if builtin == Builtin::Max => self.less_than(best_key, &k)?,
                Some((best_key, _)) => self.less_than(&k, best_key)?,
            };
            if replace {
                best = Some((k, item));
            }
        }

        match (best, default) {
            (Some((_, item)), _) => Ok(item),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(self.value_error(format!("{}() arg is an empty sequence", name))),
        }
    }

    fn modular_pow(
        &self,
        base: &Value,
        exp: &Value,
        modulus: &Value,
    ) -> Result<Value, RuntimeError> {
        let (base, exp, modulus) = match (base.as_int(), exp.as_int(), modulus.as_int()) {
            (Some(b), Some(e), Some(m)) => (b, e, m),
            _ => {
                return Err(self.type_error(
                    "pow() 3rd argument not allowed unless all arguments are integers",
                ))
            }
        };
        if modulus == 0 {
            return Err(self.value_error("pow() 3rd argument cannot be 0"));
        }
        if exp < 0 {
            return Err(self.value_error("base is not invertible for the given modulus"));
        }
        let m = modulus as i128;
        let mut result: i128 = 1;
        let mut b = (base as i128).rem_euclid(m);
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = result * b % m;
            }
            b = b * b % m;
            e >>= 1;
        }
        // Result takes the sign of the modulus
        let result = result.rem_euclid(m.abs());
        let result = if m < 0 && result != 0 { result + m } else { result };
        Ok(Value::Int(result as i64))
    }

    /// `len(value)`
    pub(crate) fn len_of(&mut self, value: &Value) -> Result<usize, RuntimeError> {
        let len = match value {
            Value::Str(s) => Some(s.chars().count()),
            Value::Tuple(items) => Some(items.len()),
            Value::Range { start, stop, step } => Some(range_len(*start, *stop, *step)),
            Value::Ref(addr) => match self.heap.get(*addr) {
                Some(HeapObject::List(items)) => Some(items.len()),
                Some(HeapObject::Dict(table) | HeapObject::Set(table)) => Some(table.len()),
                Some(HeapObject::Instance(_)) => match self.call_special(
                    value,
                    "__len__",
                    vec![],
                )? {
                    Some(Value::Int(n)) if n >= 0 => Some(n as usize),
                    Some(Value::Int(_)) => {
                        return Err(self.value_error("__len__() should return >= 0"))
                    }
                    Some(other) => {
                        return Err(self.type_error(format!(
                            "'{}' object cannot be interpreted as an integer",
                            self.heap.type_name(&other)
                        )))
                    }
                    None => None,
                },
                _ => None,
            },
            _ => None,
        };
        len.ok_or_else(|| {
            self.type_error(format!("object of type '{}' has no len()", self.heap.type_name(value)))
        })
    }

    /// `id(value)`: heap objects report their address
    fn identity(&self, value: &Value) -> i64 {
        if let Some(addr) = value.address() {
            return addr as i64;
        }
        let mut hasher = FxHasher::default();
        match self.heap.hash_key(value) {
            Some(key) => key.hash(&mut hasher),
            None => std::mem::discriminant(value).hash(&mut hasher),
        }
        (hasher.finish() >> 1) as i64
    }

    /// `type(value)`: built-in types for inline values, the class for instances
    pub(crate) fn type_of(&self, value: &Value) -> Value {
        let builtin = match value {
            Value::Bool(_) => Builtin::Bool,
            Value::Int(_) => Builtin::Int,
            Value::Float(_) => Builtin::Float,
            Value::Str(_) => Builtin::Str,
            Value::Tuple(_) => Builtin::Tuple,
            Value::Range { .. } => Builtin::Range,
            Value::Ref(addr) => match self.heap.get(*addr) {
                Some(HeapObject::List(_)) => Builtin::List,
                Some(HeapObject::Dict(_)) => Builtin::Dict,
                Some(HeapObject::Set(_)) => Builtin::Set,
                Some(HeapObject::Instance(instance)) => return Value::Ref(instance.class),
                Some(HeapObject::Class(_)) => Builtin::Type,
                _ => Builtin::Object,
            },
            Value::Builtin(b) if b.is_type() => Builtin::Type,
            Value::None | Value::Builtin(_) => Builtin::Object,
        };
        Value::Builtin(builtin)
    }

    /// `isinstance(object, class_or_tuple)`
    pub(crate) fn isinstance_of(
        &self,
        object: &Value,
        class: &Value,
    ) -> Result<bool, RuntimeError> {
        match class {
            Value::Tuple(options) => {
                for option in options.iter() {
                    if self.isinstance_of(object, option)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Value::Builtin(b) if b.is_type() => Ok(match b {
                Builtin::Object => true,
                Builtin::Int => matches!(object, Value::Int(_) | Value::Bool(_)),
                Builtin::Type => {
                    matches!(object, Value::Builtin(t) if t.is_type())
                        || object.address().and_then(|a| self.heap.class(a)).is_some()
                }
                other => matches!(self.type_of(object), Value::Builtin(t) if t == *other),
            }),
            Value::Ref(addr) if self.heap.class(*addr).is_some() => Ok(self
                .heap
                .class_of(object)
                .is_some_and(|c| self.heap.is_subclass(c, *addr))),
            _ => Err(self.type_error(
                "isinstance() arg 2 must be a type, a tuple of types, or a union",
            )),
        }
    }

    /// Resolve `import name`, creating the module on first use
    pub(crate) fn import_module(&mut self, name: &str) -> Result<Address, RuntimeError> {
        if let Some(&module) = self.modules.get(name) {
            return Ok(module);
        }
        if name != "math" {
            return Err(RuntimeError::ModuleNotFound {
                name: name.to_string(),
                location: self.current_location,
            });
        }

        let mut attrs = Namespace::new();
        attrs.set("pi", Value::Float(std::f64::consts::PI));
        attrs.set("e", Value::Float(std::f64::consts::E));
        attrs.set("tau", Value::Float(std::f64::consts::TAU));
        attrs.set("inf", Value::Float(f64::INFINITY));
        attrs.set("nan", Value::Float(f64::NAN));
        for function in MATH_FUNCTIONS {
            attrs.set(function.name(), Value::Builtin(*function));
        }
        let module = self.heap.alloc(HeapObject::Module(Module {
            name: name.to_string(),
            attrs,
        }));
        self.modules.insert(name.to_string(), module);
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_excludes_math_functions() {
        assert_eq!(Builtin::from_name("len"), Some(Builtin::Len));
        assert_eq!(Builtin::from_name("sqrt"), None);
        assert_eq!(Builtin::from_name("nope"), None);
    }

    #[test]
    fn test_purity() {
        assert!(Builtin::Len.is_pure());
        assert!(Builtin::Isinstance.is_pure());
        assert!(!Builtin::Print.is_pure());
        assert!(!Builtin::Setattr.is_pure());
    }

    #[test]
    fn test_types() {
        assert!(Builtin::Int.is_type());
        assert!(!Builtin::Len.is_type());
    }
}
