// SPDX-License-Identifier: MIT

//! Typed error handling for flowgate
//!
//! Every failure that can end a flow chain is expressed as a [`GatewayError`].
//! Interruptions are errors too: they carry the [`ExecutionFailure`] that the
//! request pipeline turns into the client-visible response.

use thiserror::Error;

use super::context::ExecutionFailure;

/// Top-level error type for flowgate
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Execution was interrupted with a failure (e.g. no matching flow)
    #[error("Execution interrupted: {0}")]
    Interrupted(ExecutionFailure),

    /// The request was cancelled upstream (client disconnect, timeout)
    #[error("Execution cancelled")]
    Cancelled,

    /// Condition parsing or evaluation failed
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    /// A policy step failed
    #[error("Policy '{policy}' failed: {message}")]
    Policy { policy: String, message: String },

    /// Policy referenced by a step is not registered
    #[error("Policy '{0}' not found")]
    PolicyNotFound(String),

    /// Invalid API, plan or organization definition
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// Configuration errors (invalid env value, unreadable config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the expression engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConditionError {
    /// The expression could not be parsed
    #[error("Could not parse condition '{expression}': {reason}")]
    Parse { expression: String, reason: String },

    /// A `matches` operand is not a valid regular expression
    #[error("Invalid pattern '{0}'")]
    InvalidPattern(String),

    /// Evaluation failed at runtime
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

/// Errors found while loading or deploying definitions
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Two plans of the same API share an id
    #[error("Duplicate plan '{plan}' in API '{api}'")]
    DuplicatePlan { api: String, plan: String },

    /// The API is already deployed
    #[error("API '{0}' is already deployed")]
    AlreadyDeployed(String),

    /// The API is not deployed
    #[error("API '{0}' is not deployed")]
    NotDeployed(String),

    /// A path selector carries an unusable template
    #[error("Invalid path template '{template}': {reason}")]
    InvalidPath { template: String, reason: String },

    /// Definition file not found
    #[error("Definition file not found: {0}")]
    FileNotFound(String),
}

impl GatewayError {
    /// Create a policy failure
    pub fn policy(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Policy {
            policy: policy.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// The failure carried by an interruption, if any
    pub fn failure(&self) -> Option<&ExecutionFailure> {
        match self {
            Self::Interrupted(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether this error ends the request rather than reporting a fault
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted(_) | Self::Cancelled)
    }
}

impl From<&str> for GatewayError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for GatewayError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
