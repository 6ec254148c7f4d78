//! Configurations
//!
//! A [`Configuration`] is an insertion-ordered set of [`Parameter`]s plus
//! named [`Condition`]s evaluated in two stages. Before `post_build` child
//! parameters hold registration keys; `post_build` swaps them for built
//! components through the [`Registry`] exactly once.
//!
//! A [`ConfigClass`] names a family of configurations and carries the default
//! [`Constructor`] plus an explicit table of named alternative constructors.

pub mod condition;
pub mod parameter;
pub mod value;

pub use condition::{Condition, Predicate, Stage, ValidationResult};
pub use parameter::{Param, Parameter, RangePredicate};
pub use value::{ComponentType, TypeHint, Value};

use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::component::BuildArgs;
use crate::error::{Error, Result};
use crate::registry::key::Tags;
use crate::registry::Registry;

/// Named arguments: constructor kwargs, overrides and variant combinations
pub type Kwargs = IndexMap<String, Value>;

/// Builds a fresh configuration from keyword arguments
pub type Constructor = Arc<dyn Fn(&Kwargs) -> Result<Configuration> + Send + Sync>;

/// Collect `(name, value)` pairs into [`Kwargs`]
pub fn kwargs<I, K, V>(pairs: I) -> Kwargs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Parameters and conditions describing how to build a component
pub struct Configuration {
    class_name: String,
    parameters: IndexMap<String, Parameter>,
    conditions: IndexMap<String, Condition>,
    built: bool,
}

impl Configuration {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            parameters: IndexMap::new(),
            conditions: IndexMap::new(),
            built: false,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// True once `post_build` has run
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Insert or update a parameter and regenerate its derived conditions.
    ///
    /// Fails with [`Error::OutOfRangeValue`] if the resulting value is outside
    /// the parameter's allowed range; the configuration is left unchanged.
    pub fn add(&mut self, param: Param) -> Result<()> {
        let name = param.name().to_string();
        let parameter = param.merge_into(self.parameters.get(&name).cloned());
        parameter.check_range()?;
        self.parameters.insert(name.clone(), parameter);
        self.sync_derived_conditions(&name);
        Ok(())
    }

    fn sync_derived_conditions(&mut self, name: &str) {
        let Some(param) = self.parameters.get(name) else {
            return;
        };
        let is_required = param.is_required;
        let is_child = param.is_child;
        let type_hint = param.type_hint.clone();
        let build_type_hint = param
            .build_type_hint
            .clone()
            .filter(|_| param.is_child && param.build_from_registration);
        let has_range = param.allowed_range.is_some();
        let has_variants = param.variants.is_some();

        let required = is_required.then(|| {
            let n = name.to_string();
            predicate(move |c| Ok(c.get(&n).map(|v| !v.is_null()).unwrap_or(false)))
        });
        self.set_derived(format!("{}_is_required", name), Stage::Always, required);

        // children are type-checked on their keys, before they get built
        let (typecheck_name, stale_name, typecheck_stage) = if is_child {
            (format!("pre_{}_typecheck", name), format!("{}_typecheck", name), Stage::Pre)
        } else {
            (format!("{}_typecheck", name), format!("pre_{}_typecheck", name), Stage::Always)
        };
        self.conditions.shift_remove(&stale_name);
        let typecheck = type_hint.map(|hint| typecheck_predicate(name, hint));
        self.set_derived(typecheck_name, typecheck_stage, typecheck);

        let build_typecheck = build_type_hint.map(|hint| typecheck_predicate(name, hint));
        self.set_derived(
            format!("post_{}_build_typecheck", name),
            Stage::Post,
            build_typecheck,
        );

        let range = has_range.then(|| {
            let n = name.to_string();
            predicate(move |c| Ok(c.param(&n).map(Parameter::in_allowed_range).unwrap_or(false)))
        });
        self.set_derived(format!("{}_allowed_range", name), Stage::Always, range);

        let variants = has_variants.then(|| {
            let n = name.to_string();
            predicate(move |c| {
                Ok(c.param(&n)
                    .and_then(|p| p.variants.as_ref())
                    .map(|v| !v.is_empty())
                    .unwrap_or(false))
            })
        });
        self.set_derived(format!("{}_valid_variants", name), Stage::Always, variants);
    }

    fn set_derived(&mut self, name: String, stage: Stage, predicate: Option<Predicate>) {
        match predicate {
            Some(predicate) => {
                self.conditions
                    .insert(name.clone(), Condition::new(name, stage, predicate));
            }
            None => {
                self.conditions.shift_remove(&name);
            }
        }
    }

    /// Add a condition. The stage follows the name (`pre_*`, `post_*`,
    /// otherwise always). Unnamed conditions are called `condition_<n>`.
    /// An existing condition with the same name is kept.
    pub fn add_condition<F>(&mut self, name: Option<&str>, predicate: F) -> String
    where
        F: Fn(&Configuration) -> Result<bool> + Send + Sync + 'static,
    {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("condition_{}", self.conditions.len() + 1));
        let stage = Stage::from_name(&name);
        self.add_staged_condition(&name, stage, predicate);
        name
    }

    /// Add a condition with an explicit stage
    pub fn add_staged_condition<F>(&mut self, name: &str, stage: Stage, predicate: F)
    where
        F: Fn(&Configuration) -> Result<bool> + Send + Sync + 'static,
    {
        self.conditions
            .entry(name.to_string())
            .or_insert_with(|| Condition::new(name, stage, Arc::new(predicate)));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name).map(|p| &p.value)
    }

    /// Like [`get`](Self::get) but fails with [`Error::UnknownParameter`]
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Replace a parameter's value, enforcing its allowed range
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let param = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        let previous = std::mem::replace(&mut param.value, value.into());
        if let Err(e) = param.check_range() {
            param.value = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Replace a parameter's declared variants
    pub fn set_variants(&mut self, name: &str, variants: Vec<Value>) -> Result<()> {
        let param = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        param.variants = Some(variants);
        Ok(())
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values()
    }

    pub fn condition(&self, name: &str) -> Option<&Condition> {
        self.conditions.get(name)
    }

    /// Child parameters, in declaration order
    pub fn children(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values().filter(|p| p.is_child)
    }

    /// Parameters whose tags equal `tags` (`exact`) or contain all of them
    pub fn search_by_tag(&self, tags: &Tags, exact: bool) -> IndexMap<String, Value> {
        self.parameters
            .values()
            .filter(|p| {
                if exact {
                    &p.tags == tags
                } else {
                    tags.is_subset(&p.tags)
                }
            })
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// Parameters that change how the owning component serializes its state
    pub fn serialization_parameters(&self) -> Vec<&Parameter> {
        self.parameters
            .values()
            .filter(|p| p.affects_serialization)
            .collect()
    }

    /// Evaluate the conditions of the current stage in insertion order.
    ///
    /// The first failing condition decides the result. With `strict` it is
    /// returned as [`Error::ValidationFailure`]; otherwise as a failed
    /// [`ValidationResult`]. Errors raised by a condition itself are
    /// propagated when `strict` and folded into the result otherwise.
    pub fn validate(&self, strict: bool) -> Result<ValidationResult> {
        let stage = if self.built { Stage::Post } else { Stage::Pre };
        for condition in self.conditions.values() {
            if !condition.stage().applies(self.built) {
                continue;
            }
            let holds = match condition.evaluate(self) {
                Ok(holds) => holds,
                Err(e) if strict => return Err(e),
                Err(e) => {
                    return Ok(ValidationResult::failed(format!(
                        "Condition {} failed! ({})",
                        condition.name(),
                        e
                    )))
                }
            };
            if !holds {
                if strict {
                    return Err(Error::ValidationFailure {
                        config_class: self.class_name.clone(),
                        stage,
                        condition: condition.name().to_string(),
                    });
                }
                return Ok(ValidationResult::failed(format!(
                    "Condition {} failed!",
                    condition.name()
                )));
            }
        }
        Ok(ValidationResult::passed())
    }

    /// Validate both stages: pre-validate, `post_build`, post-validate.
    ///
    /// Mutates the configuration; run it on a copy when the original must
    /// stay unbuilt.
    pub fn fully_validate(&mut self, registry: &mut Registry, strict: bool) -> Result<ValidationResult> {
        if !self.built {
            let pre = self.validate(strict)?;
            if !pre.passed {
                return Ok(pre);
            }
            if let Err(e) = self.post_build(registry) {
                if strict {
                    return Err(e);
                }
                return Ok(ValidationResult::failed(e.to_string()));
            }
        }
        self.validate(strict)
    }

    /// Resolve child registration keys into built components.
    ///
    /// Runs once; later calls are no-ops. If any child fails to build, no
    /// parameter is touched and the configuration stays unbuilt.
    pub fn post_build(&mut self, registry: &mut Registry) -> Result<()> {
        if self.built {
            return Ok(());
        }

        let mut resolved = Vec::new();
        for param in self.parameters.values() {
            if !param.is_child || !param.build_from_registration {
                continue;
            }
            let value = match &param.value {
                Value::Null | Value::Component(_) => continue,
                Value::Key(key) => {
                    Value::Component(registry.build_component_from_key(key, false, &BuildArgs::new())?)
                }
                Value::List(items) if items.iter().all(|v| v.as_component().is_some()) => continue,
                Value::List(_) => {
                    let keys = param.value.keys().ok_or_else(|| Error::InvalidChildValue {
                        parameter: param.name.clone(),
                    })?;
                    let mut components = Vec::with_capacity(keys.len());
                    for key in keys {
                        components.push(Value::Component(registry.build_component_from_key(
                            key,
                            false,
                            &BuildArgs::new(),
                        )?));
                    }
                    Value::List(components)
                }
                _ => {
                    return Err(Error::InvalidChildValue {
                        parameter: param.name.clone(),
                    })
                }
            };
            resolved.push((param.name.clone(), value));
        }

        for (name, value) in resolved {
            if let Some(param) = self.parameters.get_mut(&name) {
                param.value = value;
            }
        }
        self.built = true;
        debug!("Built children of {}", self.class_name);
        Ok(())
    }

    /// Deep copy with `overrides` applied.
    ///
    /// Keys naming a direct parameter are set on the copy without range
    /// enforcement (the `*_allowed_range` condition catches violations at
    /// validation). Remaining keys of the form `child.rest` are forwarded as
    /// `rest` to the child's built component. Keys matching nothing fail with
    /// [`Error::UnmatchedOverrides`]; nested keys for a child that is not yet
    /// built fail with [`Error::UnbuiltChildOverride`].
    pub fn get_delta_copy(&self, overrides: &Kwargs) -> Result<Configuration> {
        let mut copy = self.clone();
        let mut remaining = Kwargs::new();
        for (name, value) in overrides {
            match copy.parameters.get_mut(name) {
                Some(param) => param.value = value.deep_clone(),
                None => {
                    remaining.insert(name.clone(), value.clone());
                }
            }
        }
        if remaining.is_empty() {
            return Ok(copy);
        }

        let child_names: Vec<String> = copy.children().map(|p| p.name.clone()).collect();
        for child_name in child_names {
            let prefix = format!("{}.", child_name);
            let mut nested = Kwargs::new();
            remaining.retain(|key, value| match key.strip_prefix(&prefix) {
                Some(rest) => {
                    nested.insert(rest.to_string(), value.clone());
                    false
                }
                None => true,
            });
            if nested.is_empty() {
                continue;
            }

            let Some(param) = copy.parameters.get_mut(&child_name) else {
                continue;
            };
            let updated = match &param.value {
                Value::Component(component) => Value::Component(component.delta_copy(&nested)?),
                Value::List(items) if !items.is_empty() && items.iter().all(|v| v.as_component().is_some()) => {
                    let mut copies = Vec::with_capacity(items.len());
                    for item in items {
                        if let Value::Component(component) = item {
                            copies.push(Value::Component(component.delta_copy(&nested)?));
                        }
                    }
                    Value::List(copies)
                }
                _ => return Err(Error::UnbuiltChildOverride(child_name)),
            };
            param.value = updated;
        }

        if !remaining.is_empty() {
            return Err(Error::UnmatchedOverrides(remaining.into_keys().collect()));
        }
        Ok(copy)
    }

    /// Cross product of every non-empty `variants` list.
    ///
    /// Parameter names are sorted, then combinations are enumerated in
    /// odometer order over their variant lists. Empty when no parameter
    /// declares variants.
    pub fn variant_combinations(&self) -> Vec<Kwargs> {
        let mut declared: Vec<(&String, &Vec<Value>)> = self
            .parameters
            .iter()
            .filter_map(|(name, p)| {
                p.variants
                    .as_ref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v))
            })
            .collect();
        if declared.is_empty() {
            return Vec::new();
        }
        declared.sort_by(|a, b| a.0.cmp(b.0));

        declared
            .iter()
            .map(|(_, variants)| variants.iter().cloned())
            .multi_cartesian_product()
            .map(|values| {
                declared
                    .iter()
                    .map(|(name, _)| (*name).clone())
                    .zip(values)
                    .collect()
            })
            .collect()
    }

    /// [`variant_combinations`](Self::variant_combinations), keeping only
    /// those whose delta copy fully validates (non-strict) when `validate`.
    /// Any error while checking a combination marks it invalid.
    pub fn get_variants_combinations(&self, registry: &mut Registry, validate: bool) -> Vec<Kwargs> {
        let combinations = self.variant_combinations();
        if !validate {
            return combinations;
        }
        combinations
            .into_iter()
            .filter(|combination| {
                let outcome = self
                    .get_delta_copy(combination)
                    .and_then(|mut copy| copy.fully_validate(registry, false));
                match outcome {
                    Ok(result) if result.passed => true,
                    Ok(result) => {
                        debug!(
                            "Discarding {} combination {:?}: {}",
                            self.class_name,
                            combination,
                            result.error_message.unwrap_or_default()
                        );
                        false
                    }
                    Err(e) => {
                        debug!(
                            "Discarding {} combination {:?}: {}",
                            self.class_name, combination, e
                        );
                        false
                    }
                }
            })
            .collect()
    }

    /// Parameter values as a JSON object, recursing into built children
    pub fn to_value_map(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.parameters
                .iter()
                .map(|(name, p)| (name.clone(), p.value.to_json()))
                .collect(),
        )
    }

    /// Non-child parameter values, for persisting component state
    pub fn snapshot(&self) -> Kwargs {
        self.parameters
            .values()
            .filter(|p| !p.is_child && p.value.as_component().is_none())
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// One line per parameter
    pub fn describe(&self, full: bool) -> String {
        self.parameters
            .values()
            .map(|p| if full { p.long_repr() } else { p.short_repr() })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Log [`describe`](Self::describe) at info level
    pub fn show(&self, full: bool) {
        info!("Displaying {} parameters...", self.class_name);
        info!("{}", self.describe(full));
    }
}

fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Configuration) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn typecheck_predicate(name: &str, hint: TypeHint) -> Predicate {
    let name = name.to_string();
    predicate(move |c| Ok(c.get(&name).map(|v| hint.check(v)).unwrap_or(false)))
}

/// Cloning copies built children as well, so the clone shares no
/// component with the original.
impl Clone for Configuration {
    fn clone(&self) -> Self {
        Self {
            class_name: self.class_name.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|(name, p)| {
                    let mut param = p.clone();
                    param.value = p.value.deep_clone();
                    (name.clone(), param)
                })
                .collect(),
            conditions: self.conditions.clone(),
            built: self.built,
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("class_name", &self.class_name)
            .field("parameters", &self.parameters)
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .field("built", &self.built)
            .finish()
    }
}

/// Named alternative constructor of a [`ConfigClass`]
#[derive(Clone)]
pub struct ClassVariant {
    pub constructor: Constructor,
    /// Register under this namespace instead of the class's
    pub namespace: Option<String>,
    /// Extra key tags (the variant's name is always added)
    pub tags: Tags,
    pub kwargs: Kwargs,
}

impl ClassVariant {
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&Kwargs) -> Result<Configuration> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
            namespace: None,
            tags: Tags::new(),
            kwargs: Kwargs::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }
}

impl fmt::Debug for ClassVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassVariant")
            .field("namespace", &self.namespace)
            .field("tags", &self.tags)
            .field("kwargs", &self.kwargs)
            .finish_non_exhaustive()
    }
}

/// A configuration family: its name, default constructor and named variants
#[derive(Clone)]
pub struct ConfigClass {
    name: String,
    constructor: Constructor,
    variants: IndexMap<String, ClassVariant>,
}

impl ConfigClass {
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Kwargs) -> Result<Configuration> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Arc::new(constructor),
            variants: IndexMap::new(),
        }
    }

    /// Class whose default configuration has no parameters
    pub fn generic(name: impl Into<String>) -> Self {
        let name = name.into();
        let class_name = name.clone();
        Self::new(name, move |_| Ok(Configuration::new(class_name.clone())))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructor(&self) -> Constructor {
        Arc::clone(&self.constructor)
    }

    pub fn default_configuration(&self, kwargs: &Kwargs) -> Result<Configuration> {
        (self.constructor)(kwargs)
    }

    /// Declare a named alternative constructor
    pub fn with_variant(mut self, name: impl Into<String>, variant: ClassVariant) -> Self {
        self.variants.insert(name.into(), variant);
        self
    }

    pub fn variants(&self) -> impl Iterator<Item = (&str, &ClassVariant)> {
        self.variants.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Same class with the variant table dropped
    pub fn without_variants(&self) -> Self {
        Self {
            name: self.name.clone(),
            constructor: Arc::clone(&self.constructor),
            variants: IndexMap::new(),
        }
    }

    /// Constructor that builds `base(base_kwargs)` and applies its own
    /// kwargs as a delta copy
    pub fn delta_constructor(base: Constructor, base_kwargs: Kwargs) -> Constructor {
        Arc::new(move |overrides: &Kwargs| -> Result<Configuration> {
            base(&base_kwargs)?.get_delta_copy(overrides)
        })
    }
}

impl fmt::Debug for ConfigClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigClass")
            .field("name", &self.name)
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
