//! Registry and configuration errors
//!
//! A single error type is shared by every layer of the engine: key parsing,
//! parameter validation, graph checks, component building and loading.

use thiserror::Error;

use crate::configuration::condition::Stage;
use crate::registry::key::RegistrationKey;

/// Crate-wide result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Registration, validation and build errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("A configuration has already been registered with the same key! Got: {0}")]
    AlreadyRegistered(RegistrationKey),

    #[error("Could not find registered configuration {0}. Did you register it?")]
    NotRegistered(RegistrationKey),

    #[error("Registered configuration {0} is not bound to any component. Did you bind it?")]
    NotBound(RegistrationKey),

    #[error("The given registration key was already used to bind to a component! Got: {0}")]
    AlreadyBound(RegistrationKey),

    #[error("No built component instance is stored under {0}")]
    NotBuilt(RegistrationKey),

    #[error("Expected to build configuration of type {expected} but got {actual}")]
    InvalidConfigurationType { expected: String, actual: String },

    #[error("Disconnected graph! Nodes {0:?} are not connected!")]
    DisconnectedGraph(Vec<RegistrationKey>),

    #[error("The built registration graph is not a DAG!")]
    NotADag,

    #[error("Validation of {config_class} failed at {stage} stage: condition {condition} failed")]
    ValidationFailure {
        config_class: String,
        stage: Stage,
        condition: String,
    },

    #[error("Parameter {parameter} value {value} not in allowed range")]
    OutOfRangeValue { parameter: String, value: String },

    #[error("Failed parsing registration key: {0}")]
    Parse(String),

    #[error("Cannot find or update a non-existing parameter: {0}")]
    UnknownParameter(String),

    #[error("Delta copy overrides did not match any parameter: {0:?}")]
    UnmatchedOverrides(Vec<String>),

    #[error("Cannot apply nested overrides to child {0}: it has not been built to a component")]
    UnbuiltChildOverride(String),

    #[error("Child parameter {parameter} must hold a registration key, a list of keys or built components")]
    InvalidChildValue { parameter: String },

    #[error("Unknown class in catalog: {0}")]
    UnknownClass(String),

    #[error("Unknown registration entry point: {0}")]
    UnknownEntryPoint(String),

    #[error("Invalid registration manifest: {0}")]
    Manifest(String),

    #[error("Failed to resolve namespace {namespace}: {reason}")]
    Resolution { namespace: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Manifest(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
