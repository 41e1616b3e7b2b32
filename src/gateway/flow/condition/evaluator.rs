// SPDX-License-Identifier: MIT

//! Condition expression evaluator

use super::ast::{CompareOp, Condition, Lookup, Operand, RequestField};
use crate::sdk::context::ExecutionContext;
use serde_json::{json, Value};

/// Evaluate a condition against the request context.
///
/// Evaluation only reads the context; lookups that resolve to nothing
/// compare as `null`.
pub fn evaluate(condition: &Condition, ctx: &ExecutionContext) -> bool {
    match condition {
        Condition::Const(value) => *value,
        Condition::Compare {
            lookup,
            op,
            operand,
        } => compare(read(lookup, ctx).as_ref(), *op, operand),
        Condition::Present(lookup) => is_truthy(read(lookup, ctx).as_ref()),
        Condition::And(left, right) => evaluate(left, ctx) && evaluate(right, ctx),
        Condition::Or(left, right) => evaluate(left, ctx) || evaluate(right, ctx),
        Condition::Not(inner) => !evaluate(inner, ctx),
    }
}

/// Current value behind a lookup
fn read(lookup: &Lookup, ctx: &ExecutionContext) -> Option<Value> {
    let request = ctx.request();
    match lookup {
        Lookup::Request(field) => match field {
            RequestField::Id => Some(json!(request.id)),
            RequestField::Path => Some(json!(request.path)),
            RequestField::Method => Some(json!(request.method.as_str())),
            RequestField::Entrypoint => request.entrypoint.as_ref().map(|e| json!(e)),
            RequestField::Operation => request.operation.map(|o| json!(o)),
            RequestField::Headers => Some(json!(request.headers)),
            RequestField::Params => Some(json!(request.params)),
        },
        Lookup::Header(name) => request.header(name).map(|h| json!(h)),
        Lookup::Param(name) => request.params.get(name).map(|p| json!(p)),
        Lookup::Attribute(path) => ctx.attributes().get_path(path).cloned(),
    }
}

fn compare(value: Option<&Value>, op: CompareOp, operand: &Operand) -> bool {
    match op {
        CompareOp::Eq => values_equal(value, operand),
        CompareOp::NotEq => !values_equal(value, operand),
        CompareOp::Gt => compare_numbers(value, operand, |a, b| a > b),
        CompareOp::Gte => compare_numbers(value, operand, |a, b| a >= b),
        CompareOp::Lt => compare_numbers(value, operand, |a, b| a < b),
        CompareOp::Lte => compare_numbers(value, operand, |a, b| a <= b),
        CompareOp::Contains => check_contains(value, operand),
        CompareOp::Matches => check_matches(value, operand),
    }
}

fn values_equal(left: Option<&Value>, right: &Operand) -> bool {
    match (left, right) {
        (None, Operand::Null) => true,
        (None, _) => false,
        (Some(Value::Null), Operand::Null) => true,
        (Some(Value::String(s)), Operand::Text(rs)) => s == rs,
        (Some(Value::String(s)), Operand::Bool(rb)) => s.parse::<bool>().ok() == Some(*rb),
        (Some(value), Operand::Number(rn)) => as_number(value)
            .map(|f| (f - rn).abs() < f64::EPSILON)
            .unwrap_or(false),
        (Some(Value::Bool(b)), Operand::Bool(rb)) => b == rb,
        _ => false,
    }
}

/// Numbers, and strings holding numbers (headers, query params)
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn compare_numbers<F>(left: Option<&Value>, right: &Operand, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (left.and_then(as_number), right) {
        (Some(l), Operand::Number(rn)) => cmp(l, *rn),
        _ => false,
    }
}

fn check_contains(left: Option<&Value>, right: &Operand) -> bool {
    match (left, right) {
        // String contains substring
        (Some(Value::String(s)), Operand::Text(substr)) => s.contains(substr.as_str()),
        // Array contains value
        (Some(Value::Array(arr)), Operand::Text(val)) => {
            arr.iter().any(|v| v.as_str() == Some(val.as_str()))
        }
        (Some(Value::Array(arr)), Operand::Number(val)) => arr.iter().any(|v| {
            v.as_f64()
                .map(|f| (f - val).abs() < f64::EPSILON)
                .unwrap_or(false)
        }),
        (Some(Value::Array(arr)), Operand::Bool(val)) => {
            arr.iter().any(|v| v.as_bool() == Some(*val))
        }
        // Object contains key
        (Some(Value::Object(obj)), Operand::Text(key)) => obj.contains_key(key),
        _ => false,
    }
}

fn check_matches(left: Option<&Value>, right: &Operand) -> bool {
    match (left, right) {
        (Some(Value::String(s)), Operand::Pattern(p)) => p.is_match(s),
        _ => false,
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "false",
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
