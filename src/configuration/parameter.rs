//! Configuration parameters
//!
//! [`Parameter`] is the stored value cell; [`Param`] is the builder passed to
//! [`Configuration::add`](crate::configuration::Configuration::add). Fields
//! left unset on a [`Param`] keep their previous value when a parameter is
//! re-added.

use std::fmt;
use std::sync::Arc;

use crate::configuration::value::{TypeHint, Value};
use crate::error::{Error, Result};
use crate::registry::key::Tags;

/// Allowed-range predicate over a parameter value
pub type RangePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A named, typed, optionally constrained value
#[derive(Clone)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub type_hint: Option<TypeHint>,
    pub description: Option<String>,
    pub tags: Tags,
    pub allowed_range: Option<RangePredicate>,
    /// Changes how the owning component serializes its state
    pub affects_serialization: bool,
    pub is_required: bool,
    /// Value is a registration key (or keys) resolved by `post_build`
    pub is_child: bool,
    /// When false, `post_build` leaves a child's key in place
    pub build_from_registration: bool,
    /// Expected type of the built child component
    pub build_type_hint: Option<TypeHint>,
    /// Candidate values enumerated by variant expansion
    pub variants: Option<Vec<Value>>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::Null,
            type_hint: None,
            description: None,
            tags: Tags::new(),
            allowed_range: None,
            affects_serialization: false,
            is_required: false,
            is_child: false,
            build_from_registration: true,
            build_type_hint: None,
            variants: None,
        }
    }

    /// Null values are always in range
    pub fn in_allowed_range(&self) -> bool {
        match &self.allowed_range {
            Some(range) if !self.value.is_null() => range(&self.value),
            _ => true,
        }
    }

    pub(crate) fn check_range(&self) -> Result<()> {
        if self.in_allowed_range() {
            Ok(())
        } else {
            Err(Error::OutOfRangeValue {
                parameter: self.name.clone(),
                value: self.value.to_string(),
            })
        }
    }

    pub fn short_repr(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }

    pub fn long_repr(&self) -> String {
        let opt = |hint: &Option<TypeHint>| {
            hint.as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        };
        let variants = self
            .variants
            .as_ref()
            .map(|v| Value::List(v.clone()).to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "name: {} | value: {} | type_hint: {} | description: {} | tags: {:?} | \
             affects_serialization: {} | is_required: {} | is_child: {} | \
             build_from_registration: {} | build_type_hint: {} | variants: {}",
            self.name,
            self.value,
            opt(&self.type_hint),
            self.description.as_deref().unwrap_or("-"),
            self.tags,
            self.affects_serialization,
            self.is_required,
            self.is_child,
            self.build_from_registration,
            opt(&self.build_type_hint),
            variants,
        )
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("type_hint", &self.type_hint)
            .field("tags", &self.tags)
            .field("is_required", &self.is_required)
            .field("is_child", &self.is_child)
            .field("variants", &self.variants)
            .finish_non_exhaustive()
    }
}

/// Parameter declaration passed to `Configuration::add`
#[derive(Clone, Default)]
pub struct Param {
    name: String,
    value: Option<Value>,
    type_hint: Option<TypeHint>,
    description: Option<String>,
    tags: Option<Tags>,
    allowed_range: Option<RangePredicate>,
    affects_serialization: Option<bool>,
    is_required: Option<bool>,
    is_child: Option<bool>,
    build_from_registration: Option<bool>,
    build_type_hint: Option<TypeHint>,
    variants: Option<Vec<Value>>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn type_hint(mut self, type_hint: TypeHint) -> Self {
        self.type_hint = Some(type_hint);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn allowed_range<F>(mut self, range: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.allowed_range = Some(Arc::new(range));
        self
    }

    pub fn affects_serialization(mut self) -> Self {
        self.affects_serialization = Some(true);
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = Some(true);
        self
    }

    pub fn child(mut self) -> Self {
        self.is_child = Some(true);
        self
    }

    pub fn build_from_registration(mut self, build: bool) -> Self {
        self.build_from_registration = Some(build);
        self
    }

    pub fn build_type_hint(mut self, type_hint: TypeHint) -> Self {
        self.build_type_hint = Some(type_hint);
        self
    }

    pub fn variants<I, V>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.variants = Some(variants.into_iter().map(Into::into).collect());
        self
    }

    /// Apply the declared fields on top of `existing` (or a fresh parameter)
    pub(crate) fn merge_into(self, existing: Option<Parameter>) -> Parameter {
        let mut param = existing.unwrap_or_else(|| Parameter::new(self.name.clone()));
        if let Some(value) = self.value {
            param.value = value;
        }
        if let Some(type_hint) = self.type_hint {
            param.type_hint = Some(type_hint);
        }
        if let Some(description) = self.description {
            param.description = Some(description);
        }
        if let Some(tags) = self.tags {
            param.tags = tags;
        }
        if let Some(range) = self.allowed_range {
            param.allowed_range = Some(range);
        }
        if let Some(flag) = self.affects_serialization {
            param.affects_serialization = flag;
        }
        if let Some(flag) = self.is_required {
            param.is_required = flag;
        }
        if let Some(flag) = self.is_child {
            param.is_child = flag;
        }
        if let Some(flag) = self.build_from_registration {
            param.build_from_registration = flag;
        }
        if let Some(type_hint) = self.build_type_hint {
            param.build_type_hint = Some(type_hint);
        }
        if let Some(variants) = self.variants {
            param.variants = Some(variants);
        }
        param
    }
}
