//! LLM Gateway (C3): uniform call interface over a configured model,
//! with retries, JSON-schema enforcement, cost accounting, and an
//! optional function-calling loop (spec §4.3).

pub mod error;
pub mod function_calling;
pub mod gateway;
pub mod provider;
pub mod schema_cache;

pub use error::{GatewayError, GatewayResult};
pub use function_calling::{ToolDispatcher, ToolResponse, MAX_ITERATIONS};
pub use gateway::{Gateway, GenerateConfig, GenerateOpts, GenerateResult, ResponseFormat};
pub use provider::{ContentPart, FunctionCall, ProviderClient, ToolDeclaration, Turn, Usage};
pub use schema_cache::SchemaCompatibilityCache;
