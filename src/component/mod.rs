//! Components
//!
//! A component is the runtime object built from a validated configuration.
//! It exclusively owns that configuration; built children are reachable
//! through the configuration's child parameters.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::configuration::{ComponentType, Configuration, Kwargs, Value};
use crate::error::Result;

/// Extra arguments forwarded to [`Component::build`]
pub type BuildArgs = Kwargs;

/// Build argument read by [`GenericComponent`]
pub const SERIALIZATION_ID_ARG: &str = "serialization_id";

/// Object-safe plumbing implemented for every `Component + Clone`
pub trait ComponentBase {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn Component>;
    fn component_type_name(&self) -> &'static str;
}

impl<T: Component + Clone> ComponentBase for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn component_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Runtime object built from a bound configuration
pub trait Component: ComponentBase + Any + fmt::Debug + Send + Sync {
    /// Construct from a built, validated configuration
    fn build(config: Configuration, args: &BuildArgs) -> Result<Self>
    where
        Self: Sized;

    fn config(&self) -> &Configuration;

    fn config_mut(&mut self) -> &mut Configuration;

    /// Identifier used when persisting state
    fn serialization_id(&self) -> i64 {
        0
    }

    /// General execution entry point
    fn run(&self, _args: &Kwargs) -> Result<Value> {
        Ok(Value::Null)
    }
}

impl dyn Component {
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Look `name` up in this component's configuration, then depth-first
    /// in built children
    pub fn find(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.config().get(name) {
            return Some(value.clone());
        }
        for param in self.config().parameters() {
            let found = match &param.value {
                Value::Component(child) => child.find(name),
                Value::List(items) => items
                    .iter()
                    .filter_map(Value::as_component)
                    .find_map(|child| child.find(name)),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Copy of this component whose configuration is a delta copy with
    /// `overrides` applied
    pub fn delta_copy(&self, overrides: &Kwargs) -> Result<Arc<dyn Component>> {
        let config = self.config().get_delta_copy(overrides)?;
        let mut copy = self.clone_box();
        *copy.config_mut() = config;
        Ok(Arc::from(copy))
    }

    /// Non-child configuration values, for persisting state
    pub fn snapshot(&self) -> Kwargs {
        self.config().snapshot()
    }
}

/// Factory building a component of one concrete type
pub type ComponentFactory =
    Arc<dyn Fn(Configuration, &BuildArgs) -> Result<Arc<dyn Component>> + Send + Sync>;

/// A bindable component type
#[derive(Clone)]
pub struct ComponentClass {
    component_type: ComponentType,
    factory: ComponentFactory,
}

impl ComponentClass {
    pub fn of<T: Component>() -> Self {
        Self {
            component_type: ComponentType::of::<T>(),
            factory: Arc::new(|config: Configuration, args: &BuildArgs| -> Result<Arc<dyn Component>> {
                let component: Arc<dyn Component> = Arc::new(T::build(config, args)?);
                Ok(component)
            }),
        }
    }

    /// [`GenericComponent`]
    pub fn generic() -> Self {
        Self::of::<GenericComponent>()
    }

    pub fn name(&self) -> &'static str {
        self.component_type.name()
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn build(&self, config: Configuration, args: &BuildArgs) -> Result<Arc<dyn Component>> {
        (self.factory)(config, args)
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentClass").field(&self.name()).finish()
    }
}

/// Component with no behaviour beyond holding its configuration
#[derive(Debug, Clone)]
pub struct GenericComponent {
    config: Configuration,
    serialization_id: i64,
}

impl Component for GenericComponent {
    fn build(config: Configuration, args: &BuildArgs) -> Result<Self> {
        let serialization_id = args
            .get(SERIALIZATION_ID_ARG)
            .and_then(Value::as_int)
            .unwrap_or(0);
        Ok(Self {
            config,
            serialization_id,
        })
    }

    fn config(&self) -> &Configuration {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    fn serialization_id(&self) -> i64 {
        self.serialization_id
    }
}
