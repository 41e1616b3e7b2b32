// SPDX-License-Identifier: MIT

//! Per-request execution context
//!
//! The context is the only mutable state a request carries through the flow
//! chains. It owns the public and internal attribute stores, the interruption
//! state and a cancellation flag that can be triggered from outside the
//! request (client disconnect, timeout).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::attributes::{Attributes, InternalAttributes};
use super::error::GatewayError;

/// Public attribute holding the id of the plan bound to the request
pub const ATTR_PLAN: &str = "plan";
/// Public attribute holding the id of the API serving the request
pub const ATTR_API: &str = "api";

/// HTTP methods a method selector can match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            "CONNECT" => Ok(HttpMethod::Connect),
            other => Err(GatewayError::other(format!("Unknown HTTP method: {}", other))),
        }
    }
}

/// Operation mode of a message entrypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[serde(alias = "PUBLISH")]
    Publish,
    #[serde(alias = "SUBSCRIBE")]
    Subscribe,
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "publish" => Ok(Operation::Publish),
            "subscribe" => Ok(Operation::Subscribe),
            other => Err(GatewayError::other(format!("Unknown operation: {}", other))),
        }
    }
}

/// The inbound request as seen by the flow engine
#[derive(Debug, Clone)]
pub struct Request {
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    /// Header names are stored lower-cased
    pub headers: HashMap<String, String>,
    pub params: HashMap<String, String>,
    /// Entrypoint connector that accepted the request (message APIs)
    pub entrypoint: Option<String>,
    pub operation: Option<Operation>,
}

impl Request {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            headers: HashMap::new(),
            params: HashMap::new(),
            entrypoint: None,
            operation: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>, operation: Operation) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self.operation = Some(operation);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A terminal failure the pipeline turns into a response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionFailure {
    pub status_code: u16,
    pub key: Option<String>,
    pub message: Option<String>,
}

impl ExecutionFailure {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            key: None,
            message: None,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code)?;
        if let Some(key) = &self.key {
            write!(f, " [{}]", key)?;
        }
        if let Some(message) = &self.message {
            write!(f, " {}", message)?;
        }
        Ok(())
    }
}

/// Cloneable handle used to cancel a request from another task
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Execution context of a single request
#[derive(Debug)]
pub struct ExecutionContext {
    request: Request,
    timestamp: DateTime<Utc>,
    attributes: Attributes,
    internal: InternalAttributes,
    failure: Option<ExecutionFailure>,
    cancel: CancelHandle,
}

impl ExecutionContext {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            timestamp: Utc::now(),
            attributes: Attributes::new(),
            internal: InternalAttributes::new(),
            failure: None,
            cancel: CancelHandle::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.request.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// When the request entered the gateway
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.timestamp).num_milliseconds()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.set(key, value);
    }

    pub fn get_attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Id of the plan the current subscription is bound to
    pub fn plan_id(&self) -> Option<&str> {
        self.attributes.get_str(ATTR_PLAN)
    }

    pub fn get_internal_attribute<T: std::any::Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.internal.get(key)
    }

    pub fn set_internal_attribute<T: std::any::Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) {
        self.internal.set(key, value);
    }

    pub fn remove_internal_attribute(&mut self, key: &str) -> bool {
        self.internal.remove(key)
    }

    /// Record the failure and return the terminal signal to propagate
    pub fn interrupt_with(&mut self, failure: ExecutionFailure) -> GatewayError {
        log::debug!("Request {} interrupted with {}", self.request.id, failure);
        self.failure = Some(failure.clone());
        GatewayError::Interrupted(failure)
    }

    pub fn is_interrupted(&self) -> bool {
        self.failure.is_some() || self.cancel.is_cancelled()
    }

    pub fn failure(&self) -> Option<&ExecutionFailure> {
        self.failure.as_ref()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        let request = Request::new(HttpMethod::Get, "/books/42")
            .with_header("X-Tier", "gold")
            .with_param("page", "2");
        ExecutionContext::new(request)
    }

    #[test]
    fn test_timestamp_set_on_creation() {
        let before = Utc::now();
        let ctx = ctx();
        assert!(ctx.timestamp() >= before);
        assert!(ctx.timestamp() <= Utc::now());
        assert!(ctx.elapsed_ms() >= 0);
    }

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_operation_deserialize_either_case() {
        let op: Operation = serde_yaml::from_str("SUBSCRIBE").unwrap();
        assert_eq!(op, Operation::Subscribe);
        let op: Operation = serde_yaml::from_str("publish").unwrap();
        assert_eq!(op, Operation::Publish);
    }

    #[test]
    fn test_plan_id() {
        let mut ctx = ctx();
        assert!(ctx.plan_id().is_none());
        ctx.set_attribute(ATTR_PLAN, json!("gold-plan"));
        assert_eq!(ctx.plan_id(), Some("gold-plan"));
    }

    #[test]
    fn test_interrupt_with_records_failure() {
        let mut ctx = ctx();
        assert!(!ctx.is_interrupted());

        let err = ctx.interrupt_with(ExecutionFailure::new(404).key("NOT_HERE"));
        assert!(matches!(err, GatewayError::Interrupted(_)));
        assert!(ctx.is_interrupted());
        assert_eq!(ctx.failure().unwrap().status_code, 404);
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let ctx = ctx();
        let handle = ctx.cancel_handle();
        assert!(!ctx.is_cancelled());
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(ctx.is_interrupted());
    }

    #[test]
    fn test_failure_display() {
        let failure = ExecutionFailure::new(404)
            .key("GATEWAY_NO_MATCHING_FLOW")
            .message("nothing");
        assert_eq!(failure.to_string(), "404 [GATEWAY_NO_MATCHING_FLOW] nothing");
    }
}
