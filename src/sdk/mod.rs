// SPDX-License-Identifier: MIT

//! Execution primitives shared by every flow chain: the request context,
//! attribute stores, errors, and the policy and hook seams.

pub mod attributes;
pub mod context;
pub mod error;
pub mod hook;
pub mod policy;

pub use context::{
    CancelHandle, ExecutionContext, ExecutionFailure, HttpMethod, Operation, Request,
};
pub use error::{ConditionError, DefinitionError, GatewayError, GatewayResult};
pub use hook::{FlowHook, LoggingFlowHook};
pub use policy::{Policy, PolicyExecutor};
