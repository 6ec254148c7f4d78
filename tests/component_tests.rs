//! Custom component types built through the registry

use std::sync::Arc;

use cinnamon_core::{
    BuildArgs, Component, ComponentClass, ConfigClass, Configuration, Error, Kwargs, Param,
    Registry, Result, TypeHint, Value,
};
mod common;
use common::*;

/// Component that reads its typed fields out of the configuration
#[derive(Debug, Clone)]
struct Encoder {
    config: Configuration,
    hidden: i64,
}

impl Component for Encoder {
    fn build(config: Configuration, _args: &BuildArgs) -> Result<Self> {
        let hidden = config
            .value("hidden")?
            .as_int()
            .ok_or_else(|| Error::UnknownParameter("hidden".to_string()))?;
        Ok(Self { config, hidden })
    }

    fn config(&self) -> &Configuration {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    fn run(&self, args: &Kwargs) -> Result<Value> {
        let scale = args.get("scale").and_then(Value::as_int).unwrap_or(1);
        Ok(Value::Int(self.hidden * scale))
    }
}

fn encoder_class() -> ConfigClass {
    ConfigClass::new("EncoderConfig", |_: &Kwargs| {
        let mut config = Configuration::new("EncoderConfig");
        config.add(
            Param::new("hidden")
                .value(64)
                .type_hint(TypeHint::Int)
                .allowed_range(|v| v.as_int().is_some_and(|h| h > 0))
                .variants([32, 64, 128]),
        )?;
        Ok(config)
    })
}

fn model_class() -> ConfigClass {
    ConfigClass::new("ModelConfig", |_: &Kwargs| {
        let mut config = Configuration::new("ModelConfig");
        config.add(
            Param::new("encoder")
                .value(key("encoder"))
                .type_hint(TypeHint::Key)
                .child()
                .build_type_hint(TypeHint::component::<Encoder>()),
        )?;
        Ok(config)
    })
}

#[test]
fn test_custom_component_is_built() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("encoder"), encoder_class(), ComponentClass::of::<Encoder>())
        .unwrap();

    let component = registry
        .build_component_from_key(key("encoder"), false, &BuildArgs::new())
        .unwrap();
    let encoder = component.downcast_ref::<Encoder>().unwrap();
    assert_eq!(encoder.hidden, 64);
    assert_eq!(
        component.run(&cinnamon_core::kwargs([("scale", 2)])).unwrap(),
        Value::Int(128)
    );
}

#[test]
fn test_parent_checks_child_component_type() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("encoder"), encoder_class(), ComponentClass::of::<Encoder>())
        .unwrap();
    registry
        .register_and_bind(key("model"), model_class(), ComponentClass::generic())
        .unwrap();
    registry
        .build_component_from_key(key("model"), false, &BuildArgs::new())
        .unwrap();

    // rebinding the child to another component type breaks the parent's check
    let mut other = Registry::new();
    other
        .register_and_bind(key("encoder"), encoder_class(), ComponentClass::generic())
        .unwrap();
    other
        .register_and_bind(key("model"), model_class(), ComponentClass::generic())
        .unwrap();
    assert!(matches!(
        other.build_component_from_key(key("model"), false, &BuildArgs::new()),
        Err(Error::ValidationFailure { condition, .. }) if condition == "post_encoder_build_typecheck"
    ));
}

#[test]
fn test_variants_build_typed_components() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("encoder"), encoder_class(), ComponentClass::of::<Encoder>())
        .unwrap();
    let keys = registry
        .register_and_bind_variants(key("model"), model_class(), ComponentClass::generic())
        .unwrap();
    // model base, 3 encoder combinations, 3 model combinations
    assert_eq!(keys.len(), 7);

    let model = registry
        .build_component_from_key(
            key("model").with_tag("encoder.hidden=128"),
            false,
            &BuildArgs::new(),
        )
        .unwrap();
    let encoder = model
        .config()
        .get("encoder")
        .and_then(Value::as_component)
        .and_then(|c| c.downcast_ref::<Encoder>())
        .unwrap();
    assert_eq!(encoder.hidden, 128);
}

#[test]
fn test_delta_copy_keeps_component_type() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("encoder"), encoder_class(), ComponentClass::of::<Encoder>())
        .unwrap();
    let component = registry
        .build_component_from_key(key("encoder"), false, &BuildArgs::new())
        .unwrap();

    let copy: Arc<dyn Component> = component
        .delta_copy(&cinnamon_core::kwargs([("hidden", 32)]))
        .unwrap();
    assert!(copy.is::<Encoder>());
    assert_eq!(copy.config().get("hidden"), Some(&Value::Int(32)));
    assert!(matches!(
        copy.delta_copy(&cinnamon_core::kwargs([("depth", 2)])),
        Err(Error::UnmatchedOverrides(_))
    ));
}

#[test]
fn test_out_of_range_value_rejected() {
    let mut config = encoder_class().default_configuration(&Kwargs::new()).unwrap();
    assert!(matches!(
        config.set("hidden", -1),
        Err(Error::OutOfRangeValue { .. })
    ));
    assert_eq!(config.get("hidden"), Some(&Value::Int(64)));
}
