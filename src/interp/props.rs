//! Dynamic property access: `<attr.prop>` and `<attr.(expr)>`.

use crate::error::ErrorKind;
use crate::group::{DEFAULT_KEY, DICT_KEY};
use crate::interp::Interpreter;
use crate::template::Template;
use crate::value::{Map, Value};

impl Interpreter {
    /// Resolve `receiver.property`. Lookup failures are reported and resolve
    /// to null so rendering continues.
    pub(crate) fn get_object_property(
        &mut self,
        self_t: &Template,
        receiver: Value,
        property: Value,
    ) -> Value {
        if receiver.is_null() {
            self.report(self_t, ErrorKind::NoSuchProperty("null object".to_string()));
            return Value::Null;
        }
        if property.is_null() {
            self.report(
                self_t,
                ErrorKind::NoSuchProperty(format!(
                    "property name of {} is null",
                    receiver.kind()
                )),
            );
            return Value::Null;
        }

        match receiver {
            // A template's properties are its own attributes. No scope walk
            // here, unlike a direct attribute reference.
            Value::Template(st) => {
                let name = self.property_name(self_t, property);
                st.local_attribute(&name).unwrap_or(Value::Null)
            }

            Value::Map(map) => self.map_property(self_t, &map, property),

            Value::Object(obj) => {
                let name = self.property_name(self_t, property);
                match obj.property(&name) {
                    Some(value) => value,
                    None => {
                        self.report(
                            self_t,
                            ErrorKind::NoSuchProperty(format!("object.{name}")),
                        );
                        Value::Null
                    }
                }
            }

            receiver => {
                let name = self.property_name(self_t, property);
                self.report(
                    self_t,
                    ErrorKind::NoSuchProperty(format!("{}.{name}", receiver.kind())),
                );
                Value::Null
            }
        }
    }

    /// Dictionary lookup with the `keys`/`values` pseudo-properties, the
    /// stringified-key fallback, the default entry, and the key sentinel.
    fn map_property(&mut self, self_t: &Template, map: &Map<String, Value>, property: Value) -> Value {
        if matches!(&property, Value::Str(s) if s == DICT_KEY) {
            return property;
        }
        if matches!(&property, Value::Str(s) if s == "keys") {
            return Value::List(map.keys().cloned().map(Value::Str).collect());
        }
        if matches!(&property, Value::Str(s) if s == "values") {
            return Value::List(map.values().cloned().collect());
        }

        let value = match &property {
            Value::Str(key) if map.contains_key(key) => map[key].clone(),
            _ => {
                let key = self.property_name(self_t, property.clone());
                match map.get(&key) {
                    Some(value) => value.clone(),
                    // Key missing entirely: fall back to the default entry.
                    None => map.get(DEFAULT_KEY).cloned().unwrap_or(Value::Null),
                }
            }
        };

        // A value equal to the key sentinel resolves to the key itself.
        if matches!(&value, Value::Str(s) if s == DICT_KEY) {
            return property;
        }
        value
    }

    fn property_name(&mut self, self_t: &Template, property: Value) -> String {
        match property {
            Value::Str(s) => s,
            property => self.to_display(self_t, property).unwrap_or_default(),
        }
    }
}
