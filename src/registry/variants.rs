//! Variant expansion
//!
//! Expanding a configuration registers one configuration per valid
//! combination of its parameters' declared variants. Children are expanded
//! first, and the variant keys they produce become candidate values of the
//! parent's child parameter, so the parent's combination space covers every
//! child variant. Each combination is registered under the base key's name
//! and namespace with tags derived from the combination.

use indexmap::IndexSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::component::ComponentClass;
use crate::configuration::{ConfigClass, Kwargs, Value};
use crate::error::{Error, Result};
use crate::registry::key::{IntoKey, RegistrationKey, Tags};
use crate::registry::{ConfigurationInfo, PendingRegistration, Registry};

/// Keys produced by expanding one configuration
#[derive(Debug, Default)]
struct Expansion {
    /// Variants of the expanded configuration itself: its new base key, its
    /// combination keys and its named variants. Only these become candidates
    /// of a parent's child parameter.
    own: Vec<RegistrationKey>,
    /// `own` plus everything discovered while expanding children
    all: IndexSet<RegistrationKey>,
}

impl Expansion {
    fn push_own(&mut self, key: RegistrationKey) {
        if !self.own.contains(&key) {
            self.own.push(key.clone());
        }
        self.all.insert(key);
    }

    fn absorb_child(&mut self, child: Expansion) {
        self.all.extend(child.all);
    }

    fn absorb_named_variant(&mut self, variant: Expansion) {
        for key in variant.own {
            self.push_own(key);
        }
        self.all.extend(variant.all);
    }
}

/// Key of one combination: the base key plus one tag per overridden value.
///
/// Scalars give `param=value`. Keys give `param.tag` for each of their tags,
/// and `param.namespace` when their namespace differs from the base key's.
pub fn combination_key(base: &RegistrationKey, combination: &Kwargs) -> RegistrationKey {
    let mut tags: Tags = base.tags().clone();
    for (param, value) in combination {
        match value.keys() {
            Some(keys) => {
                for key in keys {
                    tags.extend(key.tags().iter().map(|tag| format!("{}.{}", param, tag)));
                    if key.namespace() != base.namespace() {
                        tags.insert(format!("{}.{}", param, key.namespace()));
                    }
                }
            }
            None => {
                tags.insert(format!("{}={}", param, value));
            }
        }
    }
    RegistrationKey::new(base.name(), base.namespace()).with_tags(tags)
}

impl Registry {
    /// Register and bind `key` together with every valid variant of it.
    ///
    /// The base key is registered and bound unless already registered.
    /// Child parameters are expanded first: the keys in their declared
    /// variants and the key they hold must already be registered and bound.
    /// Returns the base key (when newly registered), the key of every valid
    /// combination and every key discovered while expanding children,
    /// without duplicates.
    pub fn register_and_bind_variants(
        &mut self,
        key: impl IntoKey,
        info: impl Into<ConfigurationInfo>,
        component_class: ComponentClass,
    ) -> Result<Vec<RegistrationKey>> {
        let key = key.into_key()?;
        let expansion = self.expand_variants(&key, info.into(), &component_class)?;
        info!(
            "Expanded {} into {} registrations",
            key,
            expansion.all.len()
        );
        Ok(expansion.all.into_iter().collect())
    }

    /// Deferred [`register_and_bind_variants`](Self::register_and_bind_variants).
    ///
    /// The graph node of `key` is annotated with the keys of all its
    /// combinations, before any validation.
    pub fn add_and_bind_variants(
        &mut self,
        key: impl IntoKey,
        info: impl Into<ConfigurationInfo>,
        component_class: ComponentClass,
    ) -> Result<RegistrationKey> {
        let key = key.into_key()?;
        let info = info.into();
        let registration: PendingRegistration = {
            let key = key.clone();
            let info = info.clone();
            Arc::new(move |registry: &mut Registry| -> Result<()> {
                registry.register_and_bind_variants(key.clone(), info.clone(), component_class.clone())?;
                Ok(())
            })
        };
        let config = self.defer(&key, &info, registration)?;

        let variants = config
            .variant_combinations()
            .iter()
            .map(|combination| combination_key(&key, combination).to_string())
            .collect();
        self.graph.set_variants(&key, variants);
        Ok(key)
    }

    fn expand_variants(
        &mut self,
        key: &RegistrationKey,
        info: ConfigurationInfo,
        component_class: &ComponentClass,
    ) -> Result<Expansion> {
        let mut expansion = Expansion::default();
        self.resolve_namespace_of(key)?;
        if !self.contains(key) {
            self.register_and_bind(key.clone(), info.clone(), component_class.clone())?;
            expansion.push_own(key.clone());
        }
        self.graph.add_top_level(key);

        let mut config = info.build()?;

        let children: Vec<(String, Value, Option<Vec<Value>>)> = config
            .children()
            .map(|p| (p.name.clone(), p.value.clone(), p.variants.clone()))
            .collect();
        for (param, value, declared) in children {
            let mut candidates: Vec<RegistrationKey> = declared
                .iter()
                .flatten()
                .filter_map(Value::as_key)
                .cloned()
                .collect();
            if let Some(child_key) = value.as_key() {
                candidates.push(child_key.clone());
            }

            let mut discovered = Vec::new();
            for child_key in candidates {
                let child = self.expand_child(&child_key)?;
                self.graph.add_dependency(key, &child_key);
                discovered.extend(child.own.iter().cloned());
                expansion.absorb_child(child);
            }
            if discovered.is_empty() {
                continue;
            }

            let mut merged: Vec<Value> = declared.unwrap_or_default();
            for child_key in discovered {
                let candidate = Value::Key(child_key);
                if !merged.contains(&candidate) {
                    merged.push(candidate);
                }
            }
            if let Some(child_key) = value.as_key() {
                let mirrored = merged.iter().map(ToString::to_string).collect();
                self.graph.set_variants(child_key, mirrored);
            }
            debug!("{}: {} has {} candidate values", key, param, merged.len());
            config.set_variants(&param, merged)?;
        }

        let combinations = config.get_variants_combinations(self, true);
        let mut combination_keys = Vec::with_capacity(combinations.len());
        for combination in combinations {
            let variant_key = combination_key(key, &combination);
            if !self.contains(&variant_key) {
                let combination_info = ConfigurationInfo {
                    class: info.class.clone(),
                    constructor: ConfigClass::delta_constructor(
                        Arc::clone(&info.constructor),
                        info.kwargs.clone(),
                    ),
                    kwargs: combination,
                };
                self.register_and_bind(
                    variant_key.clone(),
                    combination_info,
                    component_class.clone(),
                )?;
            }
            combination_keys.push(variant_key.to_string());
            expansion.push_own(variant_key);
        }
        self.graph.set_variants(key, combination_keys);

        let named: Vec<(String, RegistrationKey, ConfigurationInfo)> = info
            .class
            .variants()
            .map(|(name, variant)| {
                let namespace = variant
                    .namespace
                    .clone()
                    .unwrap_or_else(|| key.namespace().to_string());
                let mut tags = key.tags().clone();
                tags.extend(variant.tags.iter().cloned());
                tags.insert(name.to_string());
                let variant_key = RegistrationKey::new(key.name(), namespace).with_tags(tags);
                let variant_info = ConfigurationInfo {
                    class: info.class.without_variants(),
                    constructor: Arc::clone(&variant.constructor),
                    kwargs: variant.kwargs.clone(),
                };
                (name.to_string(), variant_key, variant_info)
            })
            .collect();
        for (name, variant_key, variant_info) in named {
            debug!("Expanding named variant {} of {}", name, key);
            let nested = self.expand_variants(&variant_key, variant_info, component_class)?;
            expansion.absorb_named_variant(nested);
        }

        Ok(expansion)
    }

    /// Expand an already registered and bound child
    fn expand_child(&mut self, child_key: &RegistrationKey) -> Result<Expansion> {
        self.resolve_namespace_of(child_key)?;
        let info = self
            .configurations
            .get(child_key)
            .cloned()
            .ok_or_else(|| Error::NotRegistered(child_key.clone()))?;
        let component_class = self
            .bindings
            .get(child_key)
            .cloned()
            .ok_or_else(|| Error::NotBound(child_key.clone()))?;
        self.expand_variants(child_key, info, &component_class)
    }
}
