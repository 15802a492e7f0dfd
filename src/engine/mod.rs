//! Engine operations
//!
//! One module per externally-served operation. Every function here is pure
//! orchestration over the storage trait and the graph algorithms, takes an
//! explicit tenant/principal context, and is unit-tested without the MCP
//! layer on top.

pub mod artifact;
pub mod community;
pub mod search;
pub mod system;
pub mod topology;

use rmcp::model::{CallToolResult, Content};
use serde_json::json;

// ============================================================================
// Logic Constants & Helpers
// ============================================================================

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

pub fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// ============================================================================
// Response Helpers (deduplication)
// ============================================================================

/// Create error response from any Display type
pub fn error_response(e: impl std::fmt::Display) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        json!({ "error": e.to_string() }).to_string(),
    )])
}

/// Create success response from JSON value
pub fn success_json(value: serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(value.to_string())])
}

/// Create success response from serializable value
pub fn success_serialize<T: serde::Serialize>(value: &T) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string(value).unwrap_or_default(),
    )])
}
