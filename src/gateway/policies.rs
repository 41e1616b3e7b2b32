// SPDX-License-Identifier: MIT

//! Dry-run policy execution used by the command line

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::gateway::flow::chain::ATTR_FLOW_STAGE;
use crate::gateway::flow::types::{ExecutionPhase, Step};
use crate::sdk::context::ExecutionContext;
use crate::sdk::error::GatewayResult;
use crate::sdk::policy::PolicyExecutor;

/// Public attribute listing the steps a dry run went through
pub const ATTR_DRY_RUN_STEPS: &str = "dry-run.steps";

/// Executes nothing; logs each step and records it in the context
#[derive(Debug, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Steps recorded so far, as `<flow stage>/<policy>@<phase>`
    pub fn recorded(ctx: &ExecutionContext) -> Vec<String> {
        ctx.get_attribute(ATTR_DRY_RUN_STEPS)
            .and_then(Value::as_array)
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|s| s.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl PolicyExecutor for DryRunExecutor {
    async fn execute(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
    ) -> GatewayResult<()> {
        let stage = ctx
            .get_internal_attribute::<String>(ATTR_FLOW_STAGE)
            .cloned()
            .unwrap_or_default();
        let entry = format!("{}/{}@{}", stage, step.policy, phase);
        log::info!("[{}] dry-run {}", ctx.id(), entry);

        let mut steps = Self::recorded(ctx);
        steps.push(entry);
        ctx.set_attribute(ATTR_DRY_RUN_STEPS, json!(steps));
        Ok(())
    }
}
