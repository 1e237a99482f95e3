//! Function-calling loop plumbing (spec §4.3, §9 "Dynamic dispatch on
//! tool calls").
//!
//! The gateway itself only shuttles function calls and responses back and
//! forth; dispatch to host code is the caller's responsibility, passed in
//! as a [`ToolDispatcher`].

use serde_json::Value;

use crate::provider::FunctionCall;

/// Outcome of dispatching one function call to host code.
pub struct ToolResponse {
    pub name: String,
    pub response: Value,
}

/// Implemented by C5 (Animation Agent) to route `write_manim_code`,
/// `patch_manim_code`, and `apply_surgical_edit` to host handlers keyed by
/// name — a static table, not reflection.
pub trait ToolDispatcher {
    fn dispatch(&mut self, call: &FunctionCall) -> ToolResponse;
}

/// Maximum turns in the function-calling loop, independent of
/// `max_retries` on the outer generate loop.
pub const MAX_ITERATIONS: u32 = 8;
