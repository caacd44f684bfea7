//! Conversions from ordinary Rust data into [`Value`]s.
//!
//! Scalars map directly onto their value kinds. Everything sequence-shaped
//! funnels through the list [`FromIterator`] impl and everything entry-shaped
//! through the map one, so a slice, an array and a `Vec` of the same elements
//! produce identical values, and any string-keyed map becomes a dictionary.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::value::IterValue;
use crate::{Template, Value};

macro_rules! impl_from_scalar {
    ($($ty:ty => |$v:ident| $body:expr;)+) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

impl_from_scalar! {
    () => |_unit| Value::Null;
    bool => |b| Value::Bool(b);
    i8 => |n| Value::Int(n.into());
    i16 => |n| Value::Int(n.into());
    i32 => |n| Value::Int(n.into());
    i64 => |n| Value::Int(n);
    u8 => |n| Value::Int(n.into());
    u16 => |n| Value::Int(n.into());
    u32 => |n| Value::Int(n.into());
    f32 => |x| Value::Float(x.into());
    f64 => |x| Value::Float(x);
    char => |c| Value::Str(c.to_string());
    String => |s| Value::Str(s);
    &str => |s| Value::Str(s.to_owned());
    Cow<'_, str> => |s| Value::Str(s.into_owned());
    Template => |t| Value::Template(t);
    IterValue => |it| Value::Iter(it);
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<V: Into<Value>> FromIterator<V> for Value {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Value::List(iter.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        items.into_iter().collect()
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Value {
    fn from(items: [V; N]) -> Self {
        items.into_iter().collect()
    }
}

impl<V: Into<Value> + Clone> From<&[V]> for Value {
    fn from(items: &[V]) -> Self {
        items.iter().cloned().collect()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Value {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

// Hash maps lose their iteration order on the way in; dictionaries always
// iterate in key order.
impl<K: Into<String>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(map: HashMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}
