#![allow(dead_code)]

use cinnamon_core::{
    kwargs, ClassVariant, ConfigClass, Configuration, Kwargs, Param, RegistrationKey, TypeHint,
    Value,
};

pub const NAMESPACE: &str = "testing";

pub fn key(name: &str) -> RegistrationKey {
    RegistrationKey::new(name, NAMESPACE)
}

/// `param = 5`, variants `[10, 15, 20]`
pub fn config_a() -> ConfigClass {
    ConfigClass::new("ConfigA", |_: &Kwargs| {
        let mut config = Configuration::new("ConfigA");
        config.add(
            Param::new("param")
                .value(5)
                .type_hint(TypeHint::Int)
                .variants([10, 15, 20]),
        )?;
        Ok(config)
    })
}

/// `config_a` plus a named variant `small` that fixes `param = 1`
pub fn config_a_with_small_variant() -> ConfigClass {
    config_a().with_variant(
        "small",
        ClassVariant::new(|_: &Kwargs| {
            let mut config = Configuration::new("ConfigA");
            config.add(Param::new("param").value(1).type_hint(TypeHint::Int))?;
            Ok(config)
        }),
    )
}

/// Leaf: `z = 5`, variants `[5, 25, 100]`
pub fn config_e() -> ConfigClass {
    ConfigClass::new("ConfigE", |kw: &Kwargs| {
        let mut config = Configuration::new("ConfigE");
        let z = kw.get("z").cloned().unwrap_or(Value::Int(5));
        config.add(
            Param::new("z")
                .value(z)
                .type_hint(TypeHint::Int)
                .variants([5, 25, 100]),
        )?;
        Ok(config)
    })
}

/// `y = false`, variants `[false, true]`, child `config_e`
pub fn config_d() -> ConfigClass {
    ConfigClass::new("ConfigD", |_: &Kwargs| {
        let mut config = Configuration::new("ConfigD");
        config.add(
            Param::new("y")
                .value(false)
                .type_hint(TypeHint::Bool)
                .variants([false, true]),
        )?;
        config.add(
            Param::new("child")
                .value(key("config_e"))
                .type_hint(TypeHint::Key)
                .child()
                .required(),
        )?;
        Ok(config)
    })
}

/// `x = 1`, variants `[1, 2, 3, 4]`, child `config_d`
pub fn config_c() -> ConfigClass {
    ConfigClass::new("ConfigC", |_: &Kwargs| {
        let mut config = Configuration::new("ConfigC");
        config.add(
            Param::new("x")
                .value(1)
                .type_hint(TypeHint::Int)
                .variants([1, 2, 3, 4]),
        )?;
        config.add(
            Param::new("child")
                .value(key("config_d"))
                .type_hint(TypeHint::Key)
                .child()
                .required(),
        )?;
        Ok(config)
    })
}

/// `param` variants `[10, 15, 20]` and a plain (non-child) parameter whose
/// variants are two keys
pub fn config_b() -> ConfigClass {
    ConfigClass::new("ConfigB", |_: &Kwargs| {
        let mut config = Configuration::new("ConfigB");
        config.add(Param::new("param").value(10).variants([10, 15, 20]))?;
        config.add(Param::new("child").value(Value::Null).variants([
            key("config_c").with_tag("var1"),
            key("config_c").with_tag("var2"),
        ]))?;
        Ok(config)
    })
}

/// Two booleans with variants `[false, true]`; when `tied`, a condition
/// requires them to be equal
pub fn config_f(tied: bool) -> ConfigClass {
    ConfigClass::new("ConfigF", move |_: &Kwargs| {
        let mut config = Configuration::new("ConfigF");
        config.add(Param::new("p1").value(false).variants([false, true]))?;
        config.add(Param::new("p2").value(false).variants([false, true]))?;
        if tied {
            config.add_condition(Some("tied"), |c| Ok(c.value("p1")? == c.value("p2")?));
        }
        Ok(config)
    })
}

/// Configuration with a single child pointing at `child`
pub fn parent_of(class_name: &'static str, child: RegistrationKey) -> ConfigClass {
    ConfigClass::new(class_name, move |_: &Kwargs| {
        let mut config = Configuration::new(class_name);
        config.add(Param::new("child").value(child.clone()).child())?;
        Ok(config)
    })
}

pub fn z_override(z: i64) -> Kwargs {
    kwargs([("z", z)])
}
