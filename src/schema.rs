//! Registration-time record introspection. Each registered type gets one
//! `RecordSchema` describing its addressable attributes; every later field
//! reference resolves against that table instead of inspecting live values.

use crate::error::RegistryError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Any admin-managed record type. `Default` supplies the prototype value the
/// schema is derived from; `serde` moves records across the store boundary.
pub trait Record: Serialize + DeserializeOwned + Default + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Default + Send + Sync + 'static {}

/// JSON-level kind of an attribute, captured once at registration and used
/// for form parsing and id coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Bool,
    String,
    Other,
}

impl FieldKind {
    fn of(value: &Value) -> FieldKind {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldKind::Integer,
            Value::Number(_) => FieldKind::Float,
            Value::Bool(_) => FieldKind::Bool,
            Value::String(_) => FieldKind::String,
            _ => FieldKind::Other,
        }
    }
}

/// Schema-bound accessor table for one record type: attribute name -> kind,
/// in declaration order, plus the zero-value prototype new records start from.
#[derive(Clone, Debug)]
pub struct RecordSchema {
    type_name: String,
    attributes: Vec<String>,
    kinds: HashMap<String, FieldKind>,
    prototype: Value,
}

impl RecordSchema {
    /// Introspect a record type by serializing its default value. Fails if
    /// the type is not a struct-like object or lacks an `id` attribute.
    pub fn of<T: Record>() -> Result<RecordSchema, RegistryError> {
        let type_name = short_type_name::<T>();
        let prototype = serde_json::to_value(T::default()).map_err(|_| RegistryError::NotARecord {
            type_name: type_name.clone(),
        })?;
        let obj = match prototype {
            Value::Object(obj) => obj,
            _ => {
                return Err(RegistryError::NotARecord { type_name });
            }
        };
        if !obj.contains_key(crate::store::KEY_ATTR) {
            return Err(RegistryError::MissingKey {
                type_name,
                key: crate::store::KEY_ATTR,
            });
        }
        let mut attributes = Vec::with_capacity(obj.len());
        let mut kinds = HashMap::with_capacity(obj.len());
        for (name, value) in &obj {
            kinds.insert(name.clone(), FieldKind::of(value));
            attributes.push(name.clone());
        }
        Ok(RecordSchema {
            type_name,
            attributes,
            kinds,
            prototype: Value::Object(obj),
        })
    }

    /// Zero-value record the save path starts from when no row exists yet.
    pub fn prototype(&self) -> Value {
        self.prototype.clone()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.kinds.get(name).copied()
    }

    /// Coerce a path-segment id into the key's stored representation:
    /// integer keys parse, everything else stays text. A malformed integer
    /// id coerces to a key that matches nothing.
    pub fn coerce_id(&self, id: &str) -> Value {
        match self.kind_of(crate::store::KEY_ATTR) {
            Some(FieldKind::Integer) => id
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(id.to_string())),
            _ => Value::String(id.to_string()),
        }
    }
}

/// Last path segment of `std::any::type_name`, generics stripped.
fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Default)]
    struct Gadget {
        id: u64,
        name: String,
        price: f64,
        in_stock: bool,
    }

    #[derive(Serialize, Deserialize, Default)]
    struct Keyless {
        name: String,
    }

    #[test]
    fn introspection_captures_attributes_in_order() {
        let schema = RecordSchema::of::<Gadget>().unwrap();
        assert_eq!(schema.type_name(), "Gadget");
        assert_eq!(schema.attributes(), ["id", "name", "price", "in_stock"]);
        assert_eq!(schema.kind_of("id"), Some(FieldKind::Integer));
        assert_eq!(schema.kind_of("price"), Some(FieldKind::Float));
        assert_eq!(schema.kind_of("in_stock"), Some(FieldKind::Bool));
        assert_eq!(schema.kind_of("name"), Some(FieldKind::String));
    }

    #[test]
    fn keyless_types_are_rejected() {
        assert!(matches!(
            RecordSchema::of::<Keyless>(),
            Err(RegistryError::MissingKey { .. })
        ));
    }

    #[test]
    fn id_coercion_follows_key_kind() {
        let schema = RecordSchema::of::<Gadget>().unwrap();
        assert_eq!(schema.coerce_id("42"), serde_json::json!(42));
        assert_eq!(schema.coerce_id("nope"), serde_json::json!("nope"));
    }
}
