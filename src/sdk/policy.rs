// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use super::context::ExecutionContext;
use super::error::GatewayResult;
use crate::gateway::flow::types::{ExecutionPhase, Step};

/// A policy implementation that a flow step can reference.
///
/// Implementations should store their id in a struct field so `id()` does
/// not allocate on the hot path.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Returns the policy id referenced by steps (must be unique in a registry)
    fn id(&self) -> &str;

    /// Execute the policy for the given phase with the step's configuration
    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
        configuration: &Value,
    ) -> GatewayResult<()>;
}

/// Executes the policy referenced by a step.
///
/// The flow chain only relies on sequencing: `execute` resolves once the
/// step is done, or returns the error that stops the chain.
#[async_trait]
pub trait PolicyExecutor: Send + Sync {
    async fn execute(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
    ) -> GatewayResult<()>;
}
