//! Response normalization
//!
//! The backend names the same logical fields differently depending on the
//! endpoint (`id` vs `generation_id`, `model` vs `model_slug`). Everything
//! returned from this crate goes through one of these functions first, so
//! callers only ever see the canonical shapes.

use crate::error::{SdkError, SdkResult};
use crate::resources::generations::Generation;
use serde_json::Value;
use tracing::warn;

/// Fields consulted for a generation id, in priority order.
pub const ID_FIELDS: [&str; 3] = ["id", "generation_id", "pk"];

const CANDIDATE_FIELDS: [&str; 4] = ["output", "text", "completion", "response"];
const NESTED_CANDIDATE_FIELDS: [&str; 2] = ["output", "text"];

/// Resolve the numeric generation id from any generation-like object.
///
/// The first of `id`, `generation_id`, `pk` that is present and non-null is
/// the source of truth; it must be an integer. A missing id, or one that is
/// a string or fractional number, is a contract violation.
pub fn resolve_generation_id(value: &Value) -> SdkResult<i64> {
    let (field, raw) = ID_FIELDS
        .iter()
        .find_map(|f| value.get(*f).filter(|v| !v.is_null()).map(|v| (*f, v)))
        .ok_or_else(|| {
            SdkError::ContractViolation(format!(
                "unable to resolve generation id: none of {} present in response",
                ID_FIELDS.join(", ")
            ))
        })?;

    raw.as_i64().ok_or_else(|| {
        SdkError::ContractViolation(format!(
            "unable to resolve generation id: `{}` is {} rather than an integer",
            field, raw
        ))
    })
}

/// Best-effort candidate text from a generation-like object.
///
/// Looks at `output`, `text`, `completion`, `response`, then `data.output`
/// and `data.text`. Returns `None` when no such string exists; an empty
/// string is returned as `Some("")`.
pub fn extract_candidate(value: &Value) -> Option<String> {
    let top = CANDIDATE_FIELDS
        .iter()
        .find_map(|f| value.get(*f).and_then(Value::as_str));

    top.or_else(|| {
        let data = value.get("data")?;
        NESTED_CANDIDATE_FIELDS
            .iter()
            .find_map(|f| data.get(*f).and_then(Value::as_str))
    })
    .map(str::to_string)
}

/// Map any backend generation shape onto [`Generation`].
///
/// A generation with no candidate text (still running, or failed) keeps an
/// empty `output`; that case is logged.
pub fn normalize_generation(value: &Value) -> SdkResult<Generation> {
    if !value.is_object() {
        return Err(SdkError::ContractViolation(format!(
            "expected a generation object, got {}",
            value
        )));
    }

    let id = resolve_generation_id(value)?;
    let string = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    let output = extract_candidate(value).unwrap_or_else(|| {
        warn!(generation_id = id, "generation has no output text");
        String::new()
    });

    Ok(Generation {
        id,
        output,
        prompt: string("prompt"),
        model: string("model").or_else(|| string("model_slug")),
        created_at: string("created_at"),
        latency_ms: value.get("latency_ms").and_then(Value::as_u64),
        finish_reason: string("finish_reason"),
        usage: value.get("usage").filter(|v| !v.is_null()).cloned(),
    })
}
