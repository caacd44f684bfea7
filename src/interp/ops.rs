//! Value operations: iterator normalization, truthiness, and the sequence
//! transforms behind `first`, `last`, `rest`, `trunc`, `strip`, `reverse`
//! and `length`.
//!
//! The subtle part is that live iterators and materialized sequences behave
//! differently on purpose: `rest` of a list is a sub-list with nulls kept,
//! `rest` of an iterator copies the remaining non-null elements; `length` of
//! an iterator consumes it. Callers that need one behavior normalize first.

use crate::value::{IterValue, Value};

/// Turn anything iterable into an iterator value: lists iterate their
/// elements, maps their values. Everything else passes through unchanged.
pub(crate) fn normalize_to_iterator(v: Value) -> Value {
    match v {
        Value::List(items) => Value::Iter(IterValue::new(items)),
        Value::Map(map) => Value::Iter(IterValue::new(map.into_values().collect())),
        v => v,
    }
}

/// Like [`normalize_to_iterator`], but non-iterables become singleton
/// iterators.
pub(crate) fn force_iterator(v: Value) -> IterValue {
    match normalize_to_iterator(v) {
        Value::Iter(it) => it,
        v => IterValue::new(vec![v]),
    }
}

/// The truth of an attribute: null is false, booleans are themselves,
/// containers are non-emptiness, everything else present is true.
pub(crate) fn test_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Iter(it) => it.has_next(),
        _ => true,
    }
}

/// The first element if multi-valued, the value itself otherwise.
pub(crate) fn first(v: Value) -> Value {
    if v.is_null() {
        return Value::Null;
    }
    let original = v.clone();
    match normalize_to_iterator(v) {
        Value::Iter(it) => it.next().unwrap_or(original),
        _ => original,
    }
}

/// The last element if multi-valued, the value itself otherwise. O(1) for
/// lists; iterators are consumed to the end.
pub(crate) fn last(v: Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::List(items) => items.last().cloned().unwrap_or(Value::Null),
        v => {
            let mut result = v.clone();
            if let Value::Iter(it) = normalize_to_iterator(v) {
                while let Some(x) = it.next() {
                    result = x;
                }
            }
            result
        }
    }
}

/// Everything but the first element, or null for single-valued attributes.
/// Lists keep their nulls; iterators drop them.
pub(crate) fn rest(v: Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::List(items) => {
            if items.len() <= 1 {
                Value::Null
            } else {
                Value::List(items[1..].to_vec())
            }
        }
        v => match normalize_to_iterator(v) {
            Value::Iter(it) => {
                if it.next().is_none() {
                    return Value::Null;
                }
                let mut rest = Vec::new();
                while let Some(x) = it.next() {
                    if !x.is_null() {
                        rest.push(x);
                    }
                }
                Value::List(rest)
            }
            _ => Value::Null,
        },
    }
}

/// Everything but the last element, or null for single-valued attributes.
pub(crate) fn trunc(v: Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::List(mut items) => {
            if items.len() <= 1 {
                Value::Null
            } else {
                items.pop();
                Value::List(items)
            }
        }
        v => match normalize_to_iterator(v) {
            Value::Iter(it) => {
                let mut kept = Vec::new();
                while let Some(x) = it.next() {
                    if it.has_next() {
                        kept.push(x);
                    }
                }
                Value::List(kept)
            }
            _ => Value::Null,
        },
    }
}

/// A new sequence without the null elements; non-iterables pass through.
pub(crate) fn strip(v: Value) -> Value {
    if v.is_null() {
        return Value::Null;
    }
    match normalize_to_iterator(v) {
        Value::Iter(it) => {
            let mut kept = Vec::new();
            while let Some(x) = it.next() {
                if !x.is_null() {
                    kept.push(x);
                }
            }
            Value::List(kept)
        }
        v => v,
    }
}

/// A new sequence in reverse order; nulls are preserved.
pub(crate) fn reverse(v: Value) -> Value {
    if v.is_null() {
        return Value::Null;
    }
    match normalize_to_iterator(v) {
        Value::Iter(it) => {
            let mut items = Vec::new();
            while let Some(x) = it.next() {
                items.push(x);
            }
            items.reverse();
            Value::List(items)
        }
        v => v,
    }
}

/// Element count of multi-valued attributes, 1 for single values, 0 for
/// null. Iterators are consumed.
pub(crate) fn length(v: Value) -> Value {
    let n = match v {
        Value::Null => 0,
        Value::Map(map) => map.len(),
        Value::List(items) => items.len(),
        Value::Iter(it) => {
            let mut n = 0;
            while it.next().is_some() {
                n += 1;
            }
            n
        }
        _ => 1,
    };
    Value::Int(n as i64)
}

/// Append to a sequence under construction: nulls are dropped and iterables
/// are spread into their elements.
pub(crate) fn add_to_list(list: &mut Vec<Value>, v: Value) {
    if v.is_null() {
        return;
    }
    match normalize_to_iterator(v) {
        Value::Iter(it) => {
            while let Some(x) = it.next() {
                list.push(x);
            }
        }
        v => list.push(v),
    }
}
