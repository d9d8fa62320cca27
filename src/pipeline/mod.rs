//! End-to-end translation: question in, repaired and validated SQL out.
//!
//! ```text
//! Request ──▶ schema parse ──▶ shortcut? ──yes──▶ canned SQL
//!                                 │ no
//!                                 ▼
//!                            generator (I/O)
//!                                 │ raw text
//!                                 ▼
//!   parse ─▶ normalize ─▶ joins ─▶ ambiguity ─▶ intent ─▶ validate ─▶ SQL
//! ```
//!
//! Everything after generation is synchronous and pure.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{PipelineSettings, SAMPLE_SCHEMA};
use crate::generator::{build_prompt, GenerateParams, GenerationError, SqlGenerator};
use crate::intent::{self, find_shortcut};
use crate::profile::{resolve_profile, Profile};
use crate::repair::{self, RepairContext};
use crate::schema::{Schema, SchemaParseError};
use crate::sql::{clean_generated, parse};
use crate::validation::{validate, Diagnostic, ValidationError};

/// A translation request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Request {
    #[serde(default)]
    pub question: String,
    /// Schema text; the configured default when absent or blank.
    #[serde(default)]
    pub schema: Option<String>,
    /// Relationship profile hint ("RetailDB", "HospitalDB").
    #[serde(default)]
    pub db_name: Option<String>,
}

impl Request {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = Some(db_name.into());
        self
    }
}

/// Successful translation envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Response {
    pub sql_query: String,
}

/// Why a translation failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please provide the 'question' field.")]
    MissingQuestion,

    #[error(transparent)]
    Schema(#[from] SchemaParseError),

    /// The repaired query still fails validation.
    #[error("{0}")]
    Invalid(Diagnostic),

    #[error("Failed to generate SQL query: {0}")]
    Generation(#[from] GenerationError),
}

impl PipelineError {
    /// True for failures caused by the request rather than the generator.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PipelineError::Generation(_))
    }
}

impl From<Diagnostic> for PipelineError {
    fn from(diag: Diagnostic) -> Self {
        PipelineError::Invalid(diag)
    }
}

/// The translation pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    default_schema: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(SAMPLE_SCHEMA)
    }
}

impl Pipeline {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(settings.default_schema.clone())
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Check the question, parse the schema and pick a profile.
    pub fn prepare(&self, request: &Request) -> Result<PreparedRequest, PipelineError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(PipelineError::MissingQuestion);
        }

        let schema_text = request
            .schema
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.default_schema);
        let schema = Schema::parse(schema_text)?;
        let profile = resolve_profile(request.db_name.as_deref(), &schema);

        Ok(PreparedRequest {
            question: question.to_string(),
            schema_text: schema_text.to_string(),
            schema,
            profile,
        })
    }

    /// Translate a question, consulting the generator unless a shortcut
    /// answers it.
    pub async fn translate(
        &self,
        request: &Request,
        generator: &dyn SqlGenerator,
    ) -> Result<String, PipelineError> {
        let prepared = self.prepare(request)?;
        if let Some(sql) = prepared.shortcut() {
            return Ok(sql);
        }

        let raw = generator.generate(&prepared.generate_params()).await.map_err(|e| {
            warn!(error = %e, "generation failed");
            PipelineError::Generation(e)
        })?;
        Ok(prepared.repair(&raw)?)
    }

    /// Same as [`Pipeline::translate`] with the generator's output supplied
    /// directly.
    pub fn run(&self, request: &Request, raw_sql: &str) -> Result<String, PipelineError> {
        let prepared = self.prepare(request)?;
        if let Some(sql) = prepared.shortcut() {
            return Ok(sql);
        }
        Ok(prepared.repair(raw_sql)?)
    }
}

/// A request whose schema parsed and whose profile is known.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub question: String,
    pub schema_text: String,
    pub schema: Schema,
    pub profile: Option<&'static Profile>,
}

impl PreparedRequest {
    /// Metadata listing or canned template, if one answers the question.
    pub fn shortcut(&self) -> Option<String> {
        let shortcut = find_shortcut(&self.question, &self.schema)?;
        info!(kind = shortcut.kind(), "answered without generation");
        Some(shortcut.into_sql())
    }

    pub fn generate_params(&self) -> GenerateParams {
        GenerateParams {
            prompt: build_prompt(&self.question, &self.schema_text),
            question: self.question.clone(),
            schema: self.schema_text.clone(),
        }
    }

    /// Repair and validate raw generator output.
    pub fn repair(&self, raw: &str) -> Result<String, Diagnostic> {
        let cleaned = clean_generated(raw);
        let mut query = parse(&cleaned).map_err(|e| {
            Diagnostic::new(ValidationError::Unparseable(e.to_string()), cleaned.trim())
        })?;

        let ctx = RepairContext::new(&self.schema, &self.question, self.profile);
        repair::normalize(&mut query, &self.schema);
        repair::resolve_joins(&mut query, &ctx);
        repair::resolve_ambiguity(&mut query, &self.schema);
        intent::postprocess(&mut query, &self.question, &self.schema);

        let sql = query.to_sql();
        match validate(&query, &self.schema) {
            Ok(()) => {
                info!(profile = self.profile.map(|p| p.name), sql = %sql, "query corrected");
                Ok(sql)
            }
            Err(error) => {
                info!(error = %error, sql = %sql, "query invalid");
                Err(Diagnostic::new(error, sql))
            }
        }
    }
}

/// Translate with the built-in sample schema as the default.
pub async fn translate(request: &Request, generator: &dyn SqlGenerator) -> Result<String, PipelineError> {
    Pipeline::default().translate(request, generator).await
}
