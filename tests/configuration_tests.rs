//! Configuration validation, build and delta copy tests

use cinnamon_core::{
    kwargs, BuildArgs, ComponentClass, Configuration, Error, Param, Registry, Stage, TypeHint,
    Value,
};
mod common;
use common::*;

fn two_flags() -> Configuration {
    let mut config = Configuration::new("Flags");
    config
        .add(Param::new("param1").value(false).variants([false, true]))
        .unwrap();
    config
        .add(Param::new("param2").value(false).variants([false, true]))
        .unwrap();
    config
}

#[test]
fn test_two_flags_give_four_combinations() {
    let mut registry = Registry::new();
    let config = two_flags();
    assert_eq!(config.get_variants_combinations(&mut registry, true).len(), 4);
}

#[test]
fn test_equality_condition_keeps_two_combinations() {
    let mut registry = Registry::new();
    let mut config = two_flags();
    config.add_condition(None, |c| Ok(c.value("param1")? == c.value("param2")?));

    let combinations = config.get_variants_combinations(&mut registry, true);
    assert_eq!(combinations.len(), 2);
    for combination in &combinations {
        assert_eq!(combination["param1"], combination["param2"]);
    }
    // unvalidated enumeration keeps everything
    assert_eq!(config.get_variants_combinations(&mut registry, false).len(), 4);
}

#[test]
fn test_failing_condition_error_filters_combination() {
    let mut registry = Registry::new();
    let mut config = two_flags();
    config.add_condition(Some("lookup"), |c| {
        c.value("missing")?;
        Ok(true)
    });
    assert!(config.get_variants_combinations(&mut registry, true).is_empty());
    assert!(matches!(config.validate(true), Err(Error::UnknownParameter(_))));
    assert!(!config.validate(false).unwrap().passed);
}

#[test]
fn test_delta_copy_into_built_child() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("leaf"), config_e(), ComponentClass::generic())
        .unwrap();

    let mut config = Configuration::new("Parent");
    config.add(Param::new("x").value(10)).unwrap();
    config.add(Param::new("w").value("keep")).unwrap();
    config
        .add(Param::new("child").value(key("leaf")).child())
        .unwrap();
    config.post_build(&mut registry).unwrap();

    let copy = config.get_delta_copy(&kwargs([("x", 15)])).unwrap();
    assert_eq!(copy.get("x"), Some(&Value::Int(15)));
    assert_eq!(config.get("x"), Some(&Value::Int(10)));

    let nested = copy
        .get_delta_copy(&kwargs([("child.z", 25)]))
        .unwrap();
    let child = nested.get("child").and_then(Value::as_component).unwrap();
    assert_eq!(child.config().get("z"), Some(&Value::Int(25)));
    assert_eq!(nested.get("x"), Some(&Value::Int(15)));
    assert_eq!(nested.get("w"), Some(&Value::from("keep")));

    // the source's child is a different component and keeps its value
    let original_child = copy.get("child").and_then(Value::as_component).unwrap();
    assert_eq!(original_child.config().get("z"), Some(&Value::Int(5)));
}

#[test]
fn test_delta_copy_reaches_every_child_in_list() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("leaf"), config_e(), ComponentClass::generic())
        .unwrap();
    registry
        .register_and_bind(key("other"), config_e(), ComponentClass::generic())
        .unwrap();

    let mut config = Configuration::new("Ensemble");
    config
        .add(
            Param::new("members")
                .value(vec![key("leaf"), key("other")])
                .type_hint(TypeHint::key_list())
                .child(),
        )
        .unwrap();
    config.post_build(&mut registry).unwrap();

    let copy = config.get_delta_copy(&kwargs([("members.z", 1)])).unwrap();
    let members = copy.get("members").and_then(Value::as_list).unwrap();
    assert_eq!(members.len(), 2);
    for member in members {
        let component = member.as_component().unwrap();
        assert_eq!(component.config().get("z"), Some(&Value::Int(1)));
    }
}

#[test]
fn test_post_build_is_all_or_nothing() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("leaf"), config_e(), ComponentClass::generic())
        .unwrap();

    let mut config = Configuration::new("Parent");
    config
        .add(Param::new("first").value(key("leaf")).child())
        .unwrap();
    config
        .add(Param::new("second").value(key("missing")).child())
        .unwrap();

    assert!(matches!(
        config.post_build(&mut registry),
        Err(Error::NotRegistered(_))
    ));
    assert!(!config.is_built());
    assert_eq!(config.get("first"), Some(&Value::Key(key("leaf"))));
}

#[test]
fn test_post_build_leaves_unbuildable_children() {
    let mut registry = Registry::new();
    let mut config = Configuration::new("Parent");
    config
        .add(
            Param::new("reference")
                .value(key("missing"))
                .child()
                .build_from_registration(false),
        )
        .unwrap();
    config.post_build(&mut registry).unwrap();
    assert!(config.is_built());
    assert_eq!(config.get("reference"), Some(&Value::Key(key("missing"))));
}

#[test]
fn test_post_build_rejects_non_key_child() {
    let mut registry = Registry::new();
    let mut config = Configuration::new("Parent");
    config.add(Param::new("child").value(3).child()).unwrap();
    assert!(matches!(
        config.post_build(&mut registry),
        Err(Error::InvalidChildValue { parameter }) if parameter == "child"
    ));
}

#[test]
fn test_stages_follow_build_state() {
    let mut registry = Registry::new();
    let mut config = Configuration::new("Staged");
    config.add(Param::new("n").value(1)).unwrap();
    config.add_condition(Some("pre_only"), |c| Ok(!c.is_built()));
    config.add_condition(Some("post_only"), |c| Ok(c.is_built()));

    assert!(config.validate(true).unwrap().passed);
    let result = config.fully_validate(&mut registry, true).unwrap();
    assert!(result.passed);
    assert!(config.is_built());
}

#[test]
fn test_fully_validate_reports_stage() {
    let mut registry = Registry::new();
    let mut config = Configuration::new("Staged");
    config.add_staged_condition("late", Stage::Post, |_| Ok(false));

    match config.clone().fully_validate(&mut registry, true) {
        Err(Error::ValidationFailure { stage, condition, .. }) => {
            assert_eq!(stage, Stage::Post);
            assert_eq!(condition, "late");
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    let result = config.fully_validate(&mut registry, false).unwrap();
    assert_eq!(result.error_message.as_deref(), Some("Condition late failed!"));
}

#[test]
fn test_required_child_missing() {
    let mut config = Configuration::new("Parent");
    config
        .add(Param::new("child").child().required())
        .unwrap();
    let result = config.validate(false).unwrap();
    assert_eq!(
        result.error_message.as_deref(),
        Some("Condition child_is_required failed!")
    );
}

#[test]
fn test_built_child_type_is_checked() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("leaf"), config_e(), ComponentClass::generic())
        .unwrap();

    let mut config = Configuration::new("Parent");
    config
        .add(
            Param::new("child")
                .value(key("leaf"))
                .type_hint(TypeHint::Key)
                .child()
                .build_type_hint(TypeHint::Int),
        )
        .unwrap();

    let result = config.fully_validate(&mut registry, false).unwrap();
    assert_eq!(
        result.error_message.as_deref(),
        Some("Condition post_child_build_typecheck failed!")
    );
}

#[test]
fn test_build_args_reach_component() {
    let mut registry = Registry::new();
    registry
        .register_and_bind(key("leaf"), config_e(), ComponentClass::generic())
        .unwrap();
    let component = registry
        .build_component_from_key(key("leaf"), false, &BuildArgs::from_iter([(
            cinnamon_core::component::SERIALIZATION_ID_ARG.to_string(),
            Value::Int(9),
        )]))
        .unwrap();
    assert_eq!(component.serialization_id(), 9);
}

#[test]
fn test_describe_lists_parameters() {
    let mut config = Configuration::new("Described");
    config.add(Param::new("x").value(1).description("counter")).unwrap();
    config.add(Param::new("name").value("abc")).unwrap();

    assert_eq!(config.describe(false), "x: 1\nname: abc");
    assert!(config.describe(true).contains("description: counter"));
}
