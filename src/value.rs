use std::cmp::Ordering;
use std::fmt::{self, Display};

/// A dynamically typed argument or return value passing through the engine.
///
/// Equality is structural, with numeric widening: `Value::I32(7) == Value::I64(7)`.
#[derive(Clone, Debug)]
pub enum Value {
    /// The absence of a value (a null reference).
    Null,
    /// The value of a function that returns nothing.
    Unit,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

enum Numeric {
    Int(i128),
    Float(f64),
}

impl Value {
    fn numeric(&self) -> Option<Numeric> {
        Some(match self {
            Self::I8(v) => Numeric::Int(*v as i128),
            Self::I16(v) => Numeric::Int(*v as i128),
            Self::I32(v) => Numeric::Int(*v as i128),
            Self::I64(v) => Numeric::Int(*v as i128),
            Self::U8(v) => Numeric::Int(*v as i128),
            Self::U16(v) => Numeric::Int(*v as i128),
            Self::U32(v) => Numeric::Int(*v as i128),
            Self::U64(v) => Numeric::Int(*v as i128),
            Self::F32(v) => Numeric::Float(*v as f64),
            Self::F64(v) => Numeric::Float(*v),
            _ => return None,
        })
    }

    /// The value as `f64`, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        self.numeric().map(|numeric| match numeric {
            Numeric::Int(int) => int as f64,
            Numeric::Float(float) => float,
        })
    }

    /// The value as `i128`, if it is an integer.
    pub fn as_i128(&self) -> Option<i128> {
        match self.numeric() {
            Some(Numeric::Int(int)) => Some(int),
            _ => None,
        }
    }

    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(string) => Some(string.as_str()),
            _ => None,
        }
    }

    /// Whether this is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's type family, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unit => "()",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
        }
    }
}

fn cmp_numeric(a: Numeric, b: Numeric) -> Option<Ordering> {
    match (a, b) {
        (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
        (Numeric::Int(a), Numeric::Float(b)) => (a as f64).partial_cmp(&b),
        (Numeric::Float(a), Numeric::Int(b)) => a.partial_cmp(&(b as f64)),
        (Numeric::Float(a), Numeric::Float(b)) => a.partial_cmp(&b),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return cmp_numeric(a, b) == Some(Ordering::Equal);
        }

        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return cmp_numeric(a, b);
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Char(a), Self::Char(b)) => a.partial_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.partial_cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Unit => write!(f, "()"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v:?}"),
            Self::F64(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "b{v:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
    Vec<u8> => Bytes,
    Vec<Value> => List,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// The erased type of a parameter or return slot in a [Signature](crate::Signature).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Unit,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Bytes,
    List,
    /// Any reference type, identified by name. Its default value is [Value::Null].
    Object(String),
}

impl ValueType {
    /// The zero value returned for unmatched calls on lenient targets.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Unit => Value::Unit,
            Self::Bool => Value::Bool(false),
            Self::Char => Value::Char('\0'),
            Self::I8 => Value::I8(0),
            Self::I16 => Value::I16(0),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::U8 => Value::U8(0),
            Self::U16 => Value::U16(0),
            Self::U32 => Value::U32(0),
            Self::U64 => Value::U64(0),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
            Self::Str => Value::Str(String::new()),
            Self::Bytes => Value::Bytes(Vec::new()),
            Self::List => Value::List(Vec::new()),
            Self::Object(_) => Value::Null,
        }
    }

    fn int_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            Self::I8 => (i8::MIN as i128, i8::MAX as i128),
            Self::I16 => (i16::MIN as i128, i16::MAX as i128),
            Self::I32 => (i32::MIN as i128, i32::MAX as i128),
            Self::I64 => (i64::MIN as i128, i64::MAX as i128),
            Self::U8 => (0, u8::MAX as i128),
            Self::U16 => (0, u16::MAX as i128),
            Self::U32 => (0, u32::MAX as i128),
            Self::U64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }

    /// Whether a slot of this type can hold `value`.
    ///
    /// Integers are admitted by any numeric slot wide enough to hold them.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Object(_) | Self::Str | Self::Bytes | Self::List, Value::Null) => true,
            (Self::Object(_), _) => true,
            (Self::F32 | Self::F64, value) => value.as_f64().is_some(),
            (slot, value) => match (slot.int_range(), value.as_i128()) {
                (Some((min, max)), Some(int)) => min <= int && int <= max,
                (Some(_), None) => false,
                (None, _) => matches!(
                    (slot, value),
                    (Self::Unit, Value::Unit)
                        | (Self::Bool, Value::Bool(_))
                        | (Self::Char, Value::Char(_))
                        | (Self::Str, Value::Str(_))
                        | (Self::Bytes, Value::Bytes(_))
                        | (Self::List, Value::List(_))
                ),
            },
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool => write!(f, "bool"),
            Self::Char => write!(f, "char"),
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::Str => write!(f, "str"),
            Self::Bytes => write!(f, "bytes"),
            Self::List => write!(f, "list"),
            Self::Object(name) => write!(f, "{name}"),
        }
    }
}
