use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::str::from_utf8;

use crate::errors::{ErrorKind, RedisError, RedisResult, ServerError};

macro_rules! invalid_type_error {
    ($v:expr, $det:expr) => {{
        fail!(RedisError::from((
            ErrorKind::TypeError,
            "reply was of incompatible type",
            format!("{:?} (reply was {:?})", $det, $v),
        )))
    }};
}

/// A single decoded reply.
///
/// This is the exact shape of the wire protocol's reply grammar: the
/// tag determines which payload is meaningful, and only bulk and multi
/// replies have a null form.  A null bulk (`$-1`) is distinct from an
/// empty bulk, and a null multi (`*-1`) is distinct from an empty one.
#[derive(PartialEq, Eq, Clone)]
pub enum Value {
    /// An error reported by the server for the command just issued.
    Error(ServerError),
    /// A single line reply such as `OK`, `PONG` or `QUEUED`.
    Status(String),
    /// A signed 64-bit integer reply.
    Int(i64),
    /// A binary safe bulk reply; `None` is the null bulk.
    Data(Option<Vec<u8>>),
    /// An ordered, possibly nested sequence of replies; `None` is the
    /// null multi bulk.
    Bulk(Option<Vec<Value>>),
}

impl Value {
    /// Lifts a top-level server error out of the reply.  Errors nested
    /// inside a multi reply (EXEC results) are left in place for the
    /// caller to inspect.
    pub fn extract_error(self) -> RedisResult<Value> {
        match self {
            Value::Error(err) => Err(err.into()),
            other => Ok(other),
        }
    }

    /// Returns the elements if `self` is a sequence-shaped reply.  The
    /// null multi maps to the empty slice.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Bulk(Some(items)) => Some(&items[..]),
            Value::Bulk(None) => Some(&[]),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Error(ref err) => write!(fmt, "error({err})"),
            Value::Status(ref s) => write!(fmt, "status({s:?})"),
            Value::Int(val) => write!(fmt, "int({val:?})"),
            Value::Data(None) => write!(fmt, "nil-data"),
            Value::Data(Some(ref val)) => match from_utf8(val) {
                Ok(x) => write!(fmt, "data({x:?})"),
                Err(_) => write!(fmt, "binary-data({val:?})"),
            },
            Value::Bulk(None) => write!(fmt, "nil-bulk"),
            Value::Bulk(Some(ref values)) => {
                write!(fmt, "bulk(")?;
                let mut is_first = true;
                for val in values.iter() {
                    if !is_first {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{val:?}")?;
                    is_first = false;
                }
                write!(fmt, ")")
            }
        }
    }
}

/// Abstraction for sinks that accept encoded command arguments.
pub trait RedisWrite {
    /// Accepts one serialized argument.
    fn write_arg(&mut self, arg: &[u8]);

    /// Accepts one argument rendered through its `Display` impl.
    fn write_arg_fmt(&mut self, arg: impl fmt::Display) {
        self.write_arg(arg.to_string().as_bytes())
    }
}

impl RedisWrite for Vec<Vec<u8>> {
    fn write_arg(&mut self, arg: &[u8]) {
        self.push(arg.to_owned());
    }

    fn write_arg_fmt(&mut self, arg: impl fmt::Display) {
        self.push(arg.to_string().into_bytes())
    }
}

/// Converts a value into one or more command arguments.
///
/// Leaves are rendered to their canonical text (decimal for integers,
/// shortest round-trip for floats); byte slices pass through untouched.
/// Sequences flatten to their elements in order, maps flatten to
/// alternating key/value pairs, and `None` writes nothing, which is how
/// optional trailing arguments are expressed.
pub trait ToRedisArgs: Sized {
    /// Converts the value into a vector of byte arguments.
    fn to_redis_args(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        self.write_redis_args(&mut out);
        out
    }

    /// Writes the value into the given sink, one call per argument.
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite;

    /// Exists as a specialization workaround so `&[u8]` and friends
    /// can encode as a single binary argument.
    #[doc(hidden)]
    fn write_args_from_slice<W>(items: &[Self], out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        for item in items {
            item.write_redis_args(out);
        }
    }
}

macro_rules! itoa_based_to_redis_impl {
    ($t:ty) => {
        impl ToRedisArgs for $t {
            fn write_redis_args<W>(&self, out: &mut W)
            where
                W: ?Sized + RedisWrite,
            {
                let mut buf = ::itoa::Buffer::new();
                out.write_arg(buf.format(*self).as_bytes())
            }
        }
    };
}

macro_rules! ryu_based_to_redis_impl {
    ($t:ty) => {
        impl ToRedisArgs for $t {
            fn write_redis_args<W>(&self, out: &mut W)
            where
                W: ?Sized + RedisWrite,
            {
                let mut buf = ::ryu::Buffer::new();
                out.write_arg(buf.format(*self).as_bytes())
            }
        }
    };
}

itoa_based_to_redis_impl!(i8);
itoa_based_to_redis_impl!(i16);
itoa_based_to_redis_impl!(u16);
itoa_based_to_redis_impl!(i32);
itoa_based_to_redis_impl!(u32);
itoa_based_to_redis_impl!(i64);
itoa_based_to_redis_impl!(u64);
itoa_based_to_redis_impl!(isize);
itoa_based_to_redis_impl!(usize);

ryu_based_to_redis_impl!(f32);
ryu_based_to_redis_impl!(f64);

impl ToRedisArgs for u8 {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        let mut buf = ::itoa::Buffer::new();
        out.write_arg(buf.format(*self).as_bytes())
    }

    // A slice of bytes is one binary argument, not many numbers.
    fn write_args_from_slice<W>(items: &[u8], out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(items);
    }
}

impl ToRedisArgs for String {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.as_bytes())
    }
}

impl<'a> ToRedisArgs for &'a str {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.as_bytes())
    }
}

impl<T: ToRedisArgs> ToRedisArgs for Vec<T> {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        ToRedisArgs::write_args_from_slice(self, out)
    }
}

impl<'a, T: ToRedisArgs> ToRedisArgs for &'a [T] {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        ToRedisArgs::write_args_from_slice(self, out)
    }
}

impl<'a, T: ToRedisArgs, const N: usize> ToRedisArgs for &'a [T; N] {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        ToRedisArgs::write_args_from_slice(&self[..], out)
    }
}

impl<T: ToRedisArgs> ToRedisArgs for Option<T> {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        if let Some(ref x) = *self {
            x.write_redis_args(out);
        }
    }
}

impl<T: ToRedisArgs> ToRedisArgs for &T {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        (*self).write_redis_args(out)
    }
}

/// Flattens into alternating field/value pairs, the argument shape of
/// HMSET and MSET.  Iteration order is the map's own.
impl<K: ToRedisArgs + Eq + Hash, V: ToRedisArgs> ToRedisArgs for HashMap<K, V> {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        for (key, value) in self {
            key.write_redis_args(out);
            value.write_redis_args(out);
        }
    }
}

impl<K: ToRedisArgs + Ord, V: ToRedisArgs> ToRedisArgs for BTreeMap<K, V> {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        for (key, value) in self {
            key.write_redis_args(out);
            value.write_redis_args(out);
        }
    }
}

macro_rules! to_redis_args_for_tuple {
    () => ();
    ($($name:ident,)+) => (
        #[allow(non_snake_case)]
        impl<$($name: ToRedisArgs),*> ToRedisArgs for ($($name,)*) {
            fn write_redis_args<W>(&self, out: &mut W)
            where
                W: ?Sized + RedisWrite,
            {
                let ($(ref $name,)*) = *self;
                $($name.write_redis_args(out);)*
            }
        }
        to_redis_args_for_tuple_peel!($($name,)*);
    )
}

macro_rules! to_redis_args_for_tuple_peel {
    ($name:ident, $($other:ident,)*) => (to_redis_args_for_tuple!($($other,)*);)
}

to_redis_args_for_tuple! { T1, T2, T3, T4, }

// ── Argument option types ──────────────────────────────────────────────

/// Existence guard for `SET`: `NX` or `XX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExistenceCheck {
    /// Only set the key if it does not already exist.
    NX,
    /// Only set the key if it already exists.
    XX,
}

/// Optional modifiers for the `SET` command.
///
/// ```rust
/// use redlink::SetOptions;
///
/// let opts = SetOptions::default().with_expiration_secs(30).nx();
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SetOptions {
    ex: Option<u64>,
    px: Option<u64>,
    check: Option<ExistenceCheck>,
}

impl SetOptions {
    /// Expire the key after the given number of seconds (`EX`).
    pub fn with_expiration_secs(mut self, seconds: u64) -> Self {
        self.ex = Some(seconds);
        self
    }

    /// Expire the key after the given number of milliseconds (`PX`).
    pub fn with_expiration_millis(mut self, millis: u64) -> Self {
        self.px = Some(millis);
        self
    }

    /// Only set the key if it does not already exist (`NX`).
    pub fn nx(mut self) -> Self {
        self.check = Some(ExistenceCheck::NX);
        self
    }

    /// Only set the key if it already exists (`XX`).
    pub fn xx(mut self) -> Self {
        self.check = Some(ExistenceCheck::XX);
        self
    }
}

impl ToRedisArgs for SetOptions {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        if let Some(seconds) = self.ex {
            out.write_arg(b"EX");
            out.write_arg_fmt(seconds);
        }
        if let Some(millis) = self.px {
            out.write_arg(b"PX");
            out.write_arg_fmt(millis);
        }
        match self.check {
            Some(ExistenceCheck::NX) => out.write_arg(b"NX"),
            Some(ExistenceCheck::XX) => out.write_arg(b"XX"),
            None => {}
        }
    }
}

/// Where `LINSERT` places the new element relative to the pivot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPosition {
    /// Insert before the pivot element.
    Before,
    /// Insert after the pivot element.
    After,
}

impl ToRedisArgs for InsertPosition {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(match self {
            InsertPosition::Before => b"BEFORE",
            InsertPosition::After => b"AFTER",
        })
    }
}

/// Persistence behavior of `SHUTDOWN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Force a save of the dataset before shutting down.
    Save,
    /// Skip saving even if save points are configured.
    NoSave,
}

impl ToRedisArgs for ShutdownMode {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(match self {
            ShutdownMode::Save => b"SAVE",
            ShutdownMode::NoSave => b"NOSAVE",
        })
    }
}

/// Bitwise operation selector for `BITOP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOperation {
    /// Bitwise AND of all source keys.
    And,
    /// Bitwise OR of all source keys.
    Or,
    /// Bitwise XOR of all source keys.
    Xor,
    /// Bitwise NOT of a single source key.
    Not,
}

impl ToRedisArgs for BitOperation {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(match self {
            BitOperation::And => b"AND",
            BitOperation::Or => b"OR",
            BitOperation::Xor => b"XOR",
            BitOperation::Not => b"NOT",
        })
    }
}

// ── Reply projections ──────────────────────────────────────────────────

/// Converts a decoded reply into a concrete result type.
///
/// Every implementation is strict about which reply tags it accepts and
/// fails with `ErrorKind::TypeError` otherwise.  Null handling is part
/// of the target type: `Option<T>` maps the null bulk and null multi to
/// `None`, `String` collapses the null bulk to the empty string, and
/// `Vec<u8>` refuses it with `ErrorKind::NullBulk`.
pub trait FromRedisValue: Sized {
    /// Converts the reply, consuming it.
    fn from_redis_value(v: Value) -> RedisResult<Self>;
}

/// Shortcut function for projecting a reply into a target type.
pub fn from_redis_value<T: FromRedisValue>(v: Value) -> RedisResult<T> {
    T::from_redis_value(v)
}

impl FromRedisValue for Value {
    fn from_redis_value(v: Value) -> RedisResult<Value> {
        Ok(v)
    }
}

impl FromRedisValue for () {
    fn from_redis_value(v: Value) -> RedisResult<()> {
        match v {
            Value::Status(ref s) if s == "OK" => Ok(()),
            v => invalid_type_error!(v, "expected status OK"),
        }
    }
}

impl FromRedisValue for i64 {
    fn from_redis_value(v: Value) -> RedisResult<i64> {
        match v {
            Value::Int(i) => Ok(i),
            v => invalid_type_error!(v, "expected an integer reply"),
        }
    }
}

/// Unsigned counters also come back as decimal bulk text in the cursor
/// position of SCAN replies, so bulk data is accepted here.
impl FromRedisValue for u64 {
    fn from_redis_value(v: Value) -> RedisResult<u64> {
        match v {
            Value::Int(i) if i >= 0 => Ok(i as u64),
            Value::Data(Some(ref bytes)) => match from_utf8(bytes).ok().and_then(|s| s.parse().ok())
            {
                Some(n) => Ok(n),
                None => invalid_type_error!(v, "bulk data is not an unsigned decimal"),
            },
            v => invalid_type_error!(v, "expected an unsigned integer reply"),
        }
    }
}

impl FromRedisValue for bool {
    fn from_redis_value(v: Value) -> RedisResult<bool> {
        match v {
            Value::Int(i) => Ok(i != 0),
            v => invalid_type_error!(v, "expected an integer reply"),
        }
    }
}

/// Score replies carry a floating point number as bulk text.
impl FromRedisValue for f64 {
    fn from_redis_value(v: Value) -> RedisResult<f64> {
        match v {
            Value::Int(i) => Ok(i as f64),
            Value::Data(Some(ref bytes)) => match from_utf8(bytes).ok().and_then(|s| s.parse().ok())
            {
                Some(f) => Ok(f),
                None => invalid_type_error!(v, "bulk data is not a float"),
            },
            v => invalid_type_error!(v, "expected a float bulk reply"),
        }
    }
}

/// The string projection: bulk text, with the null bulk collapsing to
/// the empty string.  Status lines also project, so `PING` and `TYPE`
/// replies can be read as strings.
impl FromRedisValue for String {
    fn from_redis_value(v: Value) -> RedisResult<String> {
        match v {
            Value::Status(s) => Ok(s),
            Value::Data(None) => Ok(String::new()),
            Value::Data(Some(bytes)) => Ok(String::from_utf8(bytes)?),
            v => invalid_type_error!(v, "expected a bulk or status reply"),
        }
    }
}

/// The non-nullable bytes projection; a null bulk is an error here,
/// use `Option<Vec<u8>>` when absence is meaningful.
impl FromRedisValue for Vec<u8> {
    fn from_redis_value(v: Value) -> RedisResult<Vec<u8>> {
        match v {
            Value::Data(Some(bytes)) => Ok(bytes),
            Value::Data(None) => fail!(RedisError::from((
                ErrorKind::NullBulk,
                "null bulk reply where a value was required",
            ))),
            v => invalid_type_error!(v, "expected a bulk reply"),
        }
    }
}

impl<T: FromRedisValue> FromRedisValue for Option<T> {
    fn from_redis_value(v: Value) -> RedisResult<Option<T>> {
        match v {
            Value::Data(None) | Value::Bulk(None) => Ok(None),
            v => Ok(Some(from_redis_value(v)?)),
        }
    }
}

/// Sequence projection over any element projection.  The null multi is
/// treated as an empty sequence; element nulls follow the element type.
impl<T: FromRedisValue> FromRedisValue for Vec<T> {
    fn from_redis_value(v: Value) -> RedisResult<Vec<T>> {
        match v {
            Value::Bulk(Some(items)) => items.into_iter().map(from_redis_value).collect(),
            Value::Bulk(None) => Ok(vec![]),
            v => invalid_type_error!(v, "expected a multi bulk reply"),
        }
    }
}

/// Hash projection: pairs element `2i` with element `2i + 1`.  A reply
/// with an odd number of elements is malformed.
impl<K: FromRedisValue + Eq + Hash, V: FromRedisValue> FromRedisValue for HashMap<K, V> {
    fn from_redis_value(v: Value) -> RedisResult<HashMap<K, V>> {
        let items = match v {
            Value::Bulk(Some(items)) => items,
            Value::Bulk(None) => return Ok(HashMap::new()),
            v => invalid_type_error!(v, "expected a multi bulk reply"),
        };
        if items.len() % 2 != 0 {
            fail!(RedisError::from((
                ErrorKind::TypeError,
                "multi bulk reply with an odd number of elements cannot pair into a hash",
            )));
        }
        let mut map = HashMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            map.insert(from_redis_value(k)?, from_redis_value(v)?);
        }
        Ok(map)
    }
}

macro_rules! from_redis_value_for_tuple {
    ($count:tt; $($name:ident,)+) => (
        #[allow(non_snake_case)]
        impl<$($name: FromRedisValue),*> FromRedisValue for ($($name,)*) {
            fn from_redis_value(v: Value) -> RedisResult<($($name,)*)> {
                let items = match v {
                    Value::Bulk(Some(items)) if items.len() == $count => items,
                    v => invalid_type_error!(
                        v,
                        concat!("expected a multi bulk reply of length ", $count)
                    ),
                };
                let mut iter = items.into_iter();
                Ok(($({
                    let $name = iter.next().expect("length checked above");
                    from_redis_value($name)?
                },)*))
            }
        }
    )
}

from_redis_value_for_tuple! { 2; T1, T2, }
from_redis_value_for_tuple! { 3; T1, T2, T3, }
from_redis_value_for_tuple! { 4; T1, T2, T3, T4, }
