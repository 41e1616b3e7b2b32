// SPDX-License-Identifier: MIT

//! Flow model, resolution and execution

pub mod chain;
pub mod condition;
pub mod filter;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod types;

pub use chain::{FlowChain, FlowChainFactory};
pub use loader::DefinitionLoader;
pub use registry::PolicyRegistry;
pub use resolver::{FlowResolver, FlowResolverFactory};
pub use types::{
    ApiDefinition, ApiType, ExecutionPhase, Flow, FlowMode, OrganizationDefinition,
    PlanDefinition, ResolutionScope, Selector, Step,
};
