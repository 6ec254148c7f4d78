//! Cinnamon Core - declarative registration and variant expansion
//!
//! This crate composes configurable software out of registered
//! configurations and the components built from them. Configurations are
//! registered under compound [`RegistrationKey`]s, may reference each other
//! as children, and are materialized into wired component trees from a
//! single key.
//!
//! ## Building blocks
//!
//! 1. [`Configuration`]: ordered parameters plus staged (pre/post build) conditions
//! 2. [`Registry`]: registrations, bindings, built instances and the dependency graph
//! 3. Variant expansion: one registration per valid combination of declared variants
//! 4. [`loader`]: manifest-driven registration trees resolved per namespace
//!
//! ## Example
//!
//! ```no_run
//! use cinnamon_core::{ComponentClass, ConfigClass, Configuration, Param, Registry, RegistrationKey};
//!
//! # fn main() -> cinnamon_core::Result<()> {
//! let class = ConfigClass::new("Encoder", |_| {
//!     let mut config = Configuration::new("Encoder");
//!     config.add(Param::new("hidden").value(64).variants([32, 64]))?;
//!     Ok(config)
//! });
//!
//! let mut registry = Registry::new();
//! let keys = registry.register_and_bind_variants(
//!     RegistrationKey::new("encoder", "testing"),
//!     class,
//!     ComponentClass::generic(),
//! )?;
//! let encoder = registry.build_component_from_key(&keys[1], false, &Default::default())?;
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod config;
pub mod configuration;
pub mod error;
pub mod loader;
pub mod registry;
pub mod utils;

pub use component::{BuildArgs, Component, ComponentClass, GenericComponent};
pub use config::{LoggingConfig, RegistryConfig};
pub use configuration::{
    kwargs, ClassVariant, ConfigClass, Configuration, Constructor, Kwargs, Param, Parameter,
    Stage, TypeHint, ValidationResult, Value,
};
pub use error::{Error, Result};
pub use loader::RegistrationLoader;
pub use registry::{
    ConfigurationInfo, DependencyGraph, DirectoryResolver, IntoKey, NamespaceResolver,
    RegistrationKey, Registry, Tags,
};
