// SPDX-License-Identifier: MIT

//! The gateway dispatch core: flows, chains and deployed APIs

pub mod config;
pub mod flow;
pub mod manager;
pub mod organization;
pub mod policies;
pub mod reactor;

pub use config::{FlowsConfig, GatewayConfig};
pub use manager::ApiManager;
pub use organization::{Organization, OrganizationManager};
pub use policies::DryRunExecutor;
pub use reactor::{ApiReactor, RequestOutcome};
