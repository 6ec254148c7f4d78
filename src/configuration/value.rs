//! Parameter values and type hints

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::component::Component;
use crate::registry::key::RegistrationKey;

/// A parameter value.
///
/// Child parameters hold a [`RegistrationKey`] (or a list of keys) until
/// `post_build` replaces them with built components.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Key(RegistrationKey),
    Component(Arc<dyn Component>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, with integers widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&RegistrationKey> {
        match self {
            Value::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&Arc<dyn Component>> {
        match self {
            Value::Component(component) => Some(component),
            _ => None,
        }
    }

    /// Keys held by a key or a list made only of keys
    pub fn keys(&self) -> Option<Vec<&RegistrationKey>> {
        match self {
            Value::Key(key) => Some(vec![key]),
            Value::List(items) => items.iter().map(Value::as_key).collect(),
            _ => None,
        }
    }

    /// Copy that shares no built component with `self`
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::deep_clone).collect()),
            Value::Component(component) => Value::Component(Arc::from(component.clone_box())),
            other => other.clone(),
        }
    }

    /// JSON rendering; built components render as their configuration
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Key(key) => serde_json::Value::String(key.to_string()),
            Value::Component(component) => component.config().to_value_map(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Key(a), Value::Key(b)) => a == b,
            // identity: two builds of the same key are distinct components
            (Value::Component(a), Value::Component(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Key(key) => write!(f, "{}", key),
            Value::Component(component) => write!(f, "<{}>", component.component_type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<RegistrationKey> for Value {
    fn from(key: RegistrationKey) -> Self {
        Value::Key(key)
    }
}

impl From<&RegistrationKey> for Value {
    fn from(key: &RegistrationKey) -> Self {
        Value::Key(key.clone())
    }
}

impl From<Arc<dyn Component>> for Value {
    fn from(component: Arc<dyn Component>) -> Self {
        Value::Component(component)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Runtime identity of a component type, used by [`TypeHint::Component`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `component` is an instance of this type
    pub fn matches(&self, component: &dyn Component) -> bool {
        component.as_any().type_id() == self.id
    }
}

/// Closed set of parameter kinds checked by the derived typecheck conditions
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    Any,
    Bool,
    Int,
    /// Accepts integers too
    Float,
    Str,
    List(Box<TypeHint>),
    /// One of an explicit set of values
    OneOf(Vec<Value>),
    Key,
    Optional(Box<TypeHint>),
    AnyComponent,
    Component(ComponentType),
}

impl TypeHint {
    pub fn list(inner: TypeHint) -> Self {
        TypeHint::List(Box::new(inner))
    }

    pub fn optional(inner: TypeHint) -> Self {
        TypeHint::Optional(Box::new(inner))
    }

    pub fn key_list() -> Self {
        TypeHint::list(TypeHint::Key)
    }

    pub fn component<T: Component>() -> Self {
        TypeHint::Component(ComponentType::of::<T>())
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        TypeHint::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Whether `value` conforms to this hint
    pub fn check(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeHint::Any, _) => true,
            (TypeHint::Optional(_), Value::Null) => true,
            (TypeHint::Optional(inner), value) => inner.check(value),
            (TypeHint::Bool, Value::Bool(_)) => true,
            (TypeHint::Int, Value::Int(_)) => true,
            (TypeHint::Float, Value::Float(_) | Value::Int(_)) => true,
            (TypeHint::Str, Value::Str(_)) => true,
            (TypeHint::List(inner), Value::List(items)) => items.iter().all(|v| inner.check(v)),
            (TypeHint::OneOf(options), value) => options.contains(value),
            (TypeHint::Key, Value::Key(_)) => true,
            (TypeHint::AnyComponent, Value::Component(_)) => true,
            (TypeHint::Component(ty), Value::Component(component)) => ty.matches(component.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Any => write!(f, "any"),
            TypeHint::Bool => write!(f, "bool"),
            TypeHint::Int => write!(f, "int"),
            TypeHint::Float => write!(f, "float"),
            TypeHint::Str => write!(f, "str"),
            TypeHint::List(inner) => write!(f, "list[{}]", inner),
            TypeHint::OneOf(options) => write!(f, "one_of{}", Value::List(options.clone())),
            TypeHint::Key => write!(f, "key"),
            TypeHint::Optional(inner) => write!(f, "optional[{}]", inner),
            TypeHint::AnyComponent => write!(f, "component"),
            TypeHint::Component(ty) => write!(f, "{}", ty.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_hints() {
        assert!(TypeHint::Int.check(&Value::from(3)));
        assert!(!TypeHint::Int.check(&Value::from(3.0)));
        assert!(TypeHint::Float.check(&Value::from(3)));
        assert!(TypeHint::Bool.check(&Value::from(false)));
        assert!(!TypeHint::Str.check(&Value::Null));
        assert!(TypeHint::optional(TypeHint::Str).check(&Value::Null));
    }

    #[test]
    fn test_list_and_one_of_hints() {
        let keys = Value::from(vec![
            RegistrationKey::named("a"),
            RegistrationKey::named("b"),
        ]);
        assert!(TypeHint::key_list().check(&keys));
        assert!(!TypeHint::key_list().check(&Value::from(vec![1, 2])));

        let hint = TypeHint::one_of(["adam", "sgd"]);
        assert!(hint.check(&Value::from("sgd")));
        assert!(!hint.check(&Value::from("rmsprop")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(2.0).to_string(), "2.0");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_keys_rejects_mixed_lists() {
        let mixed = Value::List(vec![Value::from(RegistrationKey::named("a")), Value::from(1)]);
        assert!(mixed.keys().is_none());
        assert_eq!(Value::from(RegistrationKey::named("a")).keys().map(|k| k.len()), Some(1));
    }

    #[test]
    fn test_to_json() {
        let value = Value::from(vec![Value::from(1), Value::from("a"), Value::Null]);
        assert_eq!(value.to_json(), serde_json::json!([1, "a", null]));
    }
}
