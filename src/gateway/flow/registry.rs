// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::{ExecutionPhase, Step};
use crate::sdk::context::ExecutionContext;
use crate::sdk::error::{GatewayError, GatewayResult};
use crate::sdk::policy::{Policy, PolicyExecutor};

/// Policies available to flow steps, by id
#[derive(Clone)]
pub struct PolicyRegistry {
    policies: Arc<RwLock<HashMap<String, Arc<dyn Policy>>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self {
            policies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, policy: Arc<dyn Policy>) {
        let mut policies = self.policies.write().await;
        policies.insert(policy.id().to_string(), policy);
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn Policy>> {
        let policies = self.policies.read().await;
        policies.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let policies = self.policies.read().await;
        let mut ids: Vec<String> = policies.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyExecutor for PolicyRegistry {
    async fn execute(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        phase: ExecutionPhase,
    ) -> GatewayResult<()> {
        // The lock is released before the policy runs
        let policy = self
            .get(&step.policy)
            .await
            .ok_or_else(|| GatewayError::PolicyNotFound(step.policy.clone()))?;

        log::debug!("[{}] executing policy '{}' ({})", ctx.id(), step.policy, phase);
        policy.execute(ctx, phase, &step.configuration).await
    }
}
