//! Dynamic values carried by struct codecs.

use std::collections::BTreeMap;
use std::fmt;

/// A value of any schema type. Enums travel as `I32`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Struct(StructValue),
    List(Vec<Value>),
    /// Elements in wire order; uniqueness is not enforced.
    Set(Vec<Value>),
    /// Entries in wire order; key uniqueness is not enforced.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_struct(self) -> Option<StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Value::Struct(v)
    }
}

/// An instance of a struct. A field is present exactly when its id has an
/// entry; required fields carry no separate presence state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    name: String,
    fields: BTreeMap<i16, Value>,
}

impl StructValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder form of [`StructValue::set`].
    pub fn with(mut self, id: i16, value: impl Into<Value>) -> Self {
        self.fields.insert(id, value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, id: i16, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(id, value.into())
    }

    pub fn get(&self, id: i16) -> Option<&Value> {
        self.fields.get(&id)
    }

    pub fn take(&mut self, id: i16) -> Option<Value> {
        self.fields.remove(&id)
    }

    pub fn is_set(&self, id: i16) -> bool {
        self.fields.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Present fields in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (i16, &Value)> {
        self.fields.iter().map(|(id, v)| (*id, v))
    }

    pub fn ids(&self) -> impl Iterator<Item = i16> + '_ {
        self.fields.keys().copied()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Struct(s) => write!(f, "{}", s),
            Value::List(items) | Value::Set(items) => {
                let open = if matches!(self, Value::List(_)) { '[' } else { '{' };
                let close = if open == '[' { ']' } else { '}' };
                write!(f, "{}", open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "{}", close)
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (id, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", id, v)?;
        }
        write!(f, ")")
    }
}
