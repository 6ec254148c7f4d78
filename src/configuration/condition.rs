//! Validation conditions
//!
//! A condition is a named predicate over a whole [`Configuration`], tagged
//! with the build [`Stage`] at which it applies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::configuration::Configuration;
use crate::error::Result;

/// Predicate evaluated against a configuration
pub type Predicate = Arc<dyn Fn(&Configuration) -> Result<bool> + Send + Sync>;

/// Build stage at which a condition is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Only before `post_build`
    Pre,
    /// Only after `post_build`
    Post,
    /// In both stages
    Always,
}

impl Stage {
    /// Stage implied by a condition name: `pre_*` and `post_*` are staged,
    /// everything else always applies.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("pre_") {
            Stage::Pre
        } else if name.starts_with("post_") {
            Stage::Post
        } else {
            Stage::Always
        }
    }

    /// Whether a condition of this stage runs for a configuration whose
    /// `built` flag is `built`
    pub fn applies(self, built: bool) -> bool {
        match self {
            Stage::Pre => !built,
            Stage::Post => built,
            Stage::Always => true,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pre => write!(f, "pre"),
            Stage::Post => write!(f, "post"),
            Stage::Always => write!(f, "always"),
        }
    }
}

/// Named, staged predicate
#[derive(Clone)]
pub struct Condition {
    name: String,
    stage: Stage,
    predicate: Predicate,
}

impl Condition {
    pub fn new(name: impl Into<String>, stage: Stage, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            stage,
            predicate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn evaluate(&self, config: &Configuration) -> Result<bool> {
        (self.predicate)(config)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// True if every applicable condition held
    pub passed: bool,
    /// Which condition failed, if any
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            passed: true,
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            passed: false,
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_name() {
        assert_eq!(Stage::from_name("pre_child_typecheck"), Stage::Pre);
        assert_eq!(Stage::from_name("post_child_build_typecheck"), Stage::Post);
        assert_eq!(Stage::from_name("x_is_required"), Stage::Always);
        assert_eq!(Stage::from_name("precision_check"), Stage::Always);
    }

    #[test]
    fn test_stage_applies() {
        assert!(Stage::Pre.applies(false));
        assert!(!Stage::Pre.applies(true));
        assert!(!Stage::Post.applies(false));
        assert!(Stage::Post.applies(true));
        assert!(Stage::Always.applies(false) && Stage::Always.applies(true));
    }
}
