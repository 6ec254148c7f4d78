//! Registration registry
//!
//! The [`Registry`] maps registration keys to configuration constructors,
//! binds them to component classes and builds wired component trees from a
//! single key. Registrations can be deferred: `add_*` operations only record
//! the dependency graph and a pending closure, and
//! [`Registry::expand_and_resolve_registration`] later runs the closures so
//! that children are registered before their parents.
//!
//! A registry is plain owned state. It does no locking; callers run one
//! registration/build pipeline at a time.

pub mod graph;
pub mod key;
pub mod resolver;
pub mod variants;

pub use graph::DependencyGraph;
pub use key::{IntoKey, RegistrationKey, Tags, DEFAULT_NAMESPACE, DEFAULT_TAG};
pub use resolver::{DirectoryResolver, NamespaceResolver};

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::component::{BuildArgs, Component, ComponentClass};
use crate::config::RegistryConfig;
use crate::configuration::{ConfigClass, Configuration, Constructor, Kwargs};
use crate::error::{Error, Result};

/// How to create a registered configuration: its class plus the constructor
/// and keyword arguments to call it with
#[derive(Clone)]
pub struct ConfigurationInfo {
    pub class: ConfigClass,
    pub constructor: Constructor,
    pub kwargs: Kwargs,
}

impl ConfigurationInfo {
    /// The class's default constructor with no arguments
    pub fn new(class: ConfigClass) -> Self {
        let constructor = class.constructor();
        Self {
            class,
            constructor,
            kwargs: Kwargs::new(),
        }
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = constructor;
        self
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Fresh, unbuilt configuration
    pub fn build(&self) -> Result<Configuration> {
        (self.constructor)(&self.kwargs)
    }
}

impl From<ConfigClass> for ConfigurationInfo {
    fn from(class: ConfigClass) -> Self {
        Self::new(class)
    }
}

impl fmt::Debug for ConfigurationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationInfo")
            .field("class", &self.class.name())
            .field("kwargs", &self.kwargs)
            .finish_non_exhaustive()
    }
}

/// Deferred registration run by [`Registry::expand_and_resolve_registration`]
pub type PendingRegistration = Arc<dyn Fn(&mut Registry) -> Result<()> + Send + Sync>;

/// Registered configurations, bindings, built instances and the dependency
/// graph of deferred registrations
pub struct Registry {
    config: RegistryConfig,
    configurations: IndexMap<RegistrationKey, ConfigurationInfo>,
    bindings: HashMap<RegistrationKey, ComponentClass>,
    built: HashMap<RegistrationKey, Arc<dyn Component>>,
    graph: DependencyGraph,
    pending: HashMap<RegistrationKey, PendingRegistration>,
    resolver: Option<Box<dyn NamespaceResolver>>,
    resolved_namespaces: HashSet<String>,
    resolving: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            configurations: IndexMap::new(),
            bindings: HashMap::new(),
            built: HashMap::new(),
            graph: DependencyGraph::new(),
            pending: HashMap::new(),
            resolver: None,
            resolved_namespaces: HashSet::new(),
            resolving: false,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Install the resolver consulted when a lookup misses
    pub fn set_resolver<R: NamespaceResolver + 'static>(&mut self, resolver: R) {
        self.resolver = Some(Box::new(resolver));
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Number of registered configurations
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &RegistrationKey> {
        self.configurations.keys()
    }

    /// Exact lookup without namespace resolution
    pub fn contains(&self, key: &RegistrationKey) -> bool {
        self.configurations.contains_key(key)
    }

    pub fn is_bound(&self, key: &RegistrationKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Exact lookup, resolving the key's namespace on a miss
    pub fn is_in_registry(&mut self, key: impl IntoKey) -> Result<bool> {
        let key = key.into_key()?;
        self.resolve_namespace_of(&key)?;
        Ok(self.contains(&key))
    }

    pub fn is_in_graph(&self, key: impl IntoKey) -> Result<bool> {
        Ok(self.graph.contains(&key.into_key()?))
    }

    /// Load the key's namespace through the resolver if the key is missing.
    ///
    /// Each namespace is attempted at most once, and lookups made while a
    /// resolution is in progress do not trigger another one.
    fn resolve_namespace_of(&mut self, key: &RegistrationKey) -> Result<()> {
        if self.contains(key) || self.resolving {
            return Ok(());
        }
        let namespace = key.namespace().to_string();
        let Some(package) = self.config.package_for(&namespace).map(str::to_string) else {
            return Ok(());
        };
        if self.resolved_namespaces.contains(&namespace) {
            return Ok(());
        }
        let Some(mut resolver) = self.resolver.take() else {
            return Ok(());
        };

        info!("Resolving namespace {} from package {}", namespace, package);
        self.resolved_namespaces.insert(namespace.clone());
        self.resolving = true;
        let result = resolver
            .resolve(&namespace, &package, self)
            .and_then(|()| self.finish_resolution(&namespace));
        self.resolving = false;
        self.resolver = Some(resolver);
        result
    }

    /// Check the graph and run the pending registrations of a freshly
    /// loaded namespace
    fn finish_resolution(&mut self, namespace: &str) -> Result<()> {
        if self.config.check_graph_on_resolve {
            self.check_registration_graph()?;
        }
        self.expand_and_resolve_registration(Some(namespace))
    }

    /// Validate the dependency graph.
    ///
    /// Root edges of nodes that also have a real parent are pruned first.
    /// Fails with [`Error::NotADag`] on a cycle and with
    /// [`Error::DisconnectedGraph`] if a non-root node has no parent.
    pub fn check_registration_graph(&mut self) -> Result<()> {
        self.graph.check()
    }

    /// Register a configuration under `key`
    pub fn register_configuration(
        &mut self,
        key: impl IntoKey,
        info: impl Into<ConfigurationInfo>,
    ) -> Result<RegistrationKey> {
        let key = key.into_key()?;
        if self.contains(&key) {
            return Err(Error::AlreadyRegistered(key));
        }
        let info = info.into();
        info!("Registered {} ({})", key, info.class.name());
        self.configurations.insert(key.clone(), info);
        Ok(key)
    }

    /// Bind a registered key to a component class. Bindings are write-once.
    pub fn bind(&mut self, key: impl IntoKey, component_class: ComponentClass) -> Result<()> {
        let key = key.into_key()?;
        if !self.contains(&key) {
            return Err(Error::NotRegistered(key));
        }
        if self.bindings.contains_key(&key) {
            return Err(Error::AlreadyBound(key));
        }
        debug!("Bound {} to {}", key, component_class.name());
        self.bindings.insert(key, component_class);
        Ok(())
    }

    pub fn register_and_bind(
        &mut self,
        key: impl IntoKey,
        info: impl Into<ConfigurationInfo>,
        component_class: ComponentClass,
    ) -> Result<RegistrationKey> {
        let key = self.register_configuration(key, info)?;
        self.bind(&key, component_class)?;
        Ok(key)
    }

    /// Record `key` and its child dependencies in the graph and defer its
    /// registration until [`expand_and_resolve_registration`](Self::expand_and_resolve_registration)
    pub fn add_configuration(
        &mut self,
        key: impl IntoKey,
        info: impl Into<ConfigurationInfo>,
    ) -> Result<RegistrationKey> {
        let key = key.into_key()?;
        let info = info.into();
        let registration: PendingRegistration = {
            let key = key.clone();
            let info = info.clone();
            Arc::new(move |registry: &mut Registry| -> Result<()> {
                registry.register_configuration(key.clone(), info.clone())?;
                Ok(())
            })
        };
        self.defer(&key, &info, registration)?;
        Ok(key)
    }

    /// Deferred [`register_and_bind`](Self::register_and_bind)
    pub fn add_and_bind(
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
                registry.register_and_bind(key.clone(), info.clone(), component_class.clone())?;
                Ok(())
            })
        };
        self.defer(&key, &info, registration)?;
        Ok(key)
    }

    /// Add `key` and its child edges to the graph and store `registration`
    /// unless one is already pending for `key`. Returns the unbuilt default
    /// configuration it inspected.
    fn defer(
        &mut self,
        key: &RegistrationKey,
        info: &ConfigurationInfo,
        registration: PendingRegistration,
    ) -> Result<Configuration> {
        let config = info.build()?;
        self.graph.add_top_level(key);
        for child in child_dependencies(&config) {
            self.graph.add_dependency(key, &child);
            debug!("Added dependency {} -> {}", key, child);
        }

        self.pending.entry(key.clone()).or_insert(registration);
        Ok(config)
    }

    /// Run pending registrations, most depended-upon first.
    ///
    /// With `namespace`, only nodes of that namespace are resolved. A
    /// registration shared by several keys runs once.
    pub fn expand_and_resolve_registration(&mut self, namespace: Option<&str>) -> Result<()> {
        let order = self.graph.topological_order()?;
        for key in order.into_iter().rev() {
            if namespace.is_some_and(|ns| key.namespace() != ns) {
                continue;
            }
            let Some(registration) = self.pending.remove(&key) else {
                continue;
            };
            self.pending
                .retain(|_, other| !Arc::ptr_eq(other, &registration));
            debug!("Resolving pending registration of {}", key);
            registration(self)?;
        }
        Ok(())
    }

    /// Fresh configuration for `key`, not built.
    ///
    /// Fails with [`Error::InvalidConfigurationType`] if the constructor
    /// returns a configuration of another class than the registered one.
    pub fn build_configuration_from_key(&mut self, key: impl IntoKey) -> Result<Configuration> {
        let key = key.into_key()?;
        self.resolve_namespace_of(&key)?;
        let info = self
            .configurations
            .get(&key)
            .ok_or_else(|| Error::NotRegistered(key.clone()))?;

        let config = info.build()?;
        if config.class_name() != info.class.name() {
            return Err(Error::InvalidConfigurationType {
                expected: info.class.name().to_string(),
                actual: config.class_name().to_string(),
            });
        }
        Ok(config)
    }

    /// Build the component registered under `key`: construct its
    /// configuration, build its children, validate the post-build stage and
    /// instantiate the bound component class. With `register`, the
    /// component is also stored as the built instance of `key`.
    pub fn build_component_from_key(
        &mut self,
        key: impl IntoKey,
        register: bool,
        build_args: &BuildArgs,
    ) -> Result<Arc<dyn Component>> {
        let key = key.into_key()?;
        let mut config = self.build_configuration_from_key(&key)?;
        let component_class = self
            .bindings
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotBound(key.clone()))?;

        config.post_build(self)?;
        config.validate(true)?;

        let component = component_class.build(config, build_args)?;
        if register && self.built.insert(key.clone(), Arc::clone(&component)).is_some() {
            warn!("Replaced built instance of {}", key);
        }
        debug!("Built {} from {}", component_class.name(), key);
        Ok(component)
    }

    /// Build and store the component of `key`
    pub fn register_built_component_from_key(
        &mut self,
        key: impl IntoKey,
        build_args: &BuildArgs,
    ) -> Result<Arc<dyn Component>> {
        self.build_component_from_key(key, true, build_args)
    }

    /// Built instance stored for `key`
    pub fn retrieve_component_instance_from_key(
        &self,
        key: impl IntoKey,
    ) -> Result<Arc<dyn Component>> {
        let key = key.into_key()?;
        self.built
            .get(&key)
            .cloned()
            .ok_or(Error::NotBuilt(key))
    }

    /// Component class bound to `key`
    pub fn retrieve_component_from_key(&mut self, key: impl IntoKey) -> Result<ComponentClass> {
        let key = key.into_key()?;
        self.resolve_namespace_of(&key)?;
        if !self.contains(&key) {
            return Err(Error::NotRegistered(key));
        }
        self.bindings
            .get(&key)
            .cloned()
            .ok_or(Error::NotBound(key))
    }

    /// Registered configurations matching `key`.
    ///
    /// `exact` does a direct lookup; otherwise every registered key is
    /// tested with [`RegistrationKey::partial_match`]. With `strict`, finding
    /// nothing fails with [`Error::NotRegistered`].
    pub fn retrieve_configurations_from_key(
        &mut self,
        key: impl IntoKey,
        exact: bool,
        strict: bool,
    ) -> Result<Vec<ConfigurationInfo>> {
        let key = key.into_key()?;
        self.resolve_namespace_of(&key)?;

        let found: Vec<ConfigurationInfo> = if exact {
            self.configurations.get(&key).cloned().into_iter().collect()
        } else {
            self.configurations
                .iter()
                .filter(|(registered, _)| registered.partial_match(&key))
                .map(|(_, info)| info.clone())
                .collect()
        };

        if strict && found.is_empty() {
            return Err(Error::NotRegistered(key));
        }
        Ok(found)
    }

    /// Keys matching `key` partially, in registration order
    pub fn retrieve_keys_from_key(&self, key: &RegistrationKey) -> Vec<RegistrationKey> {
        self.configurations
            .keys()
            .filter(|registered| registered.partial_match(key))
            .cloned()
            .collect()
    }

    /// Drop every registration, binding, built instance, pending closure and
    /// graph node
    pub fn clear(&mut self) {
        self.configurations.clear();
        self.bindings.clear();
        self.built.clear();
        self.graph.clear();
        self.pending.clear();
        self.resolved_namespaces.clear();
        self.resolving = false;
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.reset();
        }
        debug!("Cleared registry");
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("configurations", &self.configurations.len())
            .field("bindings", &self.bindings.len())
            .field("built", &self.built.len())
            .field("pending", &self.pending.len())
            .field("graph_nodes", &self.graph.node_count())
            .finish_non_exhaustive()
    }
}

/// Keys a configuration depends on: the keys held by its child parameters
/// and the keys among their declared variants
pub(crate) fn child_dependencies(config: &Configuration) -> Vec<RegistrationKey> {
    let mut keys = Vec::new();
    for param in config.children() {
        if let Some(held) = param.value.keys() {
            keys.extend(held.into_iter().cloned());
        }
        for variant in param.variants.iter().flatten() {
            if let Some(held) = variant.keys() {
                keys.extend(held.into_iter().cloned());
            }
        }
    }
    keys
}
