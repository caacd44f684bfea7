use std::fmt;

use crate::Value;

/// Property access for host-defined values.
///
/// There is no reflection here: a type rendered by templates exposes its
/// properties through this protocol, and its [`Display`][fmt::Display] form is
/// what gets written when no attribute renderer is registered for objects.
///
/// # Examples
///
/// ```
/// use weft::{ObjectModel, Value};
///
/// #[derive(Debug)]
/// struct User {
///     name: String,
/// }
///
/// impl std::fmt::Display for User {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{}", self.name)
///     }
/// }
///
/// impl ObjectModel for User {
///     fn property(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(Value::from(self.name.clone())),
///             _ => None,
///         }
///     }
/// }
///
/// let value = Value::object(User { name: "Ada".into() });
/// ```
pub trait ObjectModel: fmt::Debug + fmt::Display {
    /// Look up a named property, or `None` if the type has no such property.
    fn property(&self, name: &str) -> Option<Value>;
}
