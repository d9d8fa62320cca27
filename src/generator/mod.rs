//! The external SQL generation boundary.
//!
//! Generation is the only I/O in a translation. The model runs out of
//! process as a worker speaking NDJSON over stdin/stdout, so the repair
//! pipeline stays synchronous and database-agnostic.
//!
//! ```text
//! ┌──────────────────────────────┐   stdin (NDJSON)   ┌─────────────────────┐
//! │  sqlmend (Rust + Tokio)      │ ─────────────────▶ │  generator worker   │
//! │  WorkerGenerator             │ ◀───────────────── │  (long-lived child) │
//! └──────────────────────────────┘   stdout (NDJSON)  └─────────────────────┘
//! ```

mod client;
mod error;
mod prompt;
pub mod protocol;

pub use client::WorkerGenerator;
pub use error::{GenerationError, GenerationResult};
pub use prompt::build_prompt;
pub use protocol::GenerateParams;

use async_trait::async_trait;

/// Produces raw SQL text for a question.
///
/// Implementations must tolerate concurrent calls through `&self`.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, params: &GenerateParams) -> GenerationResult<String>;
}

/// Generator that always answers with the same text. Used to run the
/// repair pipeline over SQL obtained elsewhere.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    sql: String,
}

impl FixedGenerator {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl SqlGenerator for FixedGenerator {
    async fn generate(&self, _params: &GenerateParams) -> GenerationResult<String> {
        if self.sql.trim().is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(self.sql.clone())
    }
}
