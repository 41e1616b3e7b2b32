// SPDX-License-Identifier: MIT

//! Definition types for flows, plans, APIs and organizations
//!
//! These are the deserialized shapes of deployed definitions. Once loaded
//! they are never mutated: deployment wraps flows in `Arc` and shares them
//! between every request of the owning definition.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::sdk::context::{HttpMethod, Operation};

/// A stage of request processing during which a subset of steps run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionPhase {
    Request,
    Response,
    MessageRequest,
    MessageResponse,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionPhase::Request => "REQUEST",
            ExecutionPhase::Response => "RESPONSE",
            ExecutionPhase::MessageRequest => "MESSAGE_REQUEST",
            ExecutionPhase::MessageResponse => "MESSAGE_RESPONSE",
        };
        f.write_str(s)
    }
}

/// Resolution policy of a scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowMode {
    /// Every matching flow runs
    #[default]
    #[serde(alias = "DEFAULT")]
    All,
    /// Only the most path-specific matching flow(s) run
    BestMatch,
}

/// The level a flow collection is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionScope {
    Platform,
    Api,
    Plan,
}

impl ResolutionScope {
    /// Chain id used to key per-request internal attributes
    pub fn id(&self) -> &'static str {
        match self {
            ResolutionScope::Platform => "platform",
            ResolutionScope::Api => "api",
            ResolutionScope::Plan => "plan",
        }
    }
}

impl fmt::Display for ResolutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How a path template is compared with the request path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathOperator {
    Equals,
    #[default]
    StartsWith,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PathSelector {
    /// Template such as `/books/:id`
    pub path: String,
    #[serde(default, alias = "pathOperator")]
    pub operator: PathOperator,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MethodSelector {
    /// Empty matches any method
    #[serde(default)]
    pub methods: HashSet<HttpMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChannelSelector {
    /// Entrypoint connector ids; empty matches any entrypoint
    #[serde(default)]
    pub entrypoints: HashSet<String>,
    /// Operation modes; empty matches any mode
    #[serde(default)]
    pub operations: HashSet<Operation>,
}

/// A predicate a flow must satisfy to be a candidate
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Selector {
    Path(PathSelector),
    Method(MethodSelector),
    Channel(ChannelSelector),
}

/// A policy reference bound to an execution phase
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    #[serde(default)]
    pub name: String,
    /// Id of the policy to execute
    pub policy: String,
    pub phase: ExecutionPhase,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub configuration: serde_json::Value,
    /// Evaluated right before the step; a false result skips the step
    pub condition: Option<String>,
}

/// A named, ordered set of policy steps gated by selectors and a condition
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Flow {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub selectors: Vec<Selector>,
    pub condition: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Flow {
    pub fn path_selector(&self) -> Option<&PathSelector> {
        self.selectors.iter().find_map(|s| match s {
            Selector::Path(p) => Some(p),
            _ => None,
        })
    }

    pub fn method_selector(&self) -> Option<&MethodSelector> {
        self.selectors.iter().find_map(|s| match s {
            Selector::Method(m) => Some(m),
            _ => None,
        })
    }

    pub fn channel_selector(&self) -> Option<&ChannelSelector> {
        self.selectors.iter().find_map(|s| match s {
            Selector::Channel(c) => Some(c),
            _ => None,
        })
    }

    /// Enabled steps of the given phase, in declaration order
    pub fn steps_for(&self, phase: ExecutionPhase) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(move |s| s.enabled && s.phase == phase)
    }
}

/// Kind of API, deciding which phases the reactor runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    #[default]
    Proxy,
    Message,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

/// Top-level API definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub api_type: ApiType,
    /// Flow mode applied to API and plan flows
    #[serde(default)]
    pub flow_mode: FlowMode,
    /// Organization whose platform flows apply to this API
    pub organization: Option<String>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub plans: Vec<PlanDefinition>,
}

/// Organization-level (platform) flow definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrganizationDefinition {
    pub id: String,
    #[serde(default)]
    pub flow_mode: FlowMode,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

fn default_enabled() -> bool {
    true
}
