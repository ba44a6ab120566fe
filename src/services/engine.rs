use futures::future::BoxFuture;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// How the external analysis engine is located and run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name used in error messages (e.g. "python").
    pub name: String,
    /// Executables tried in order; the first that runs to completion wins.
    pub candidates: Vec<String>,
    /// Optional script placed before the video path on the command line.
    pub script: Option<PathBuf>,
    pub timeout: Duration,
}

/// Anything that can turn a video file into raw engine output.
pub trait Extractor: Send + Sync {
    fn extract<'a>(&'a self, video: &'a Path) -> BoxFuture<'a, Result<RawEngineOutput, InvocationError>>;
}

/// Fields reported by the engine, kept only when they have the expected type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEngineOutput {
    pub brand: Option<String>,
    pub year: Option<i32>,
    pub raw_text: Option<String>,
    pub best_0_60_s: Option<f64>,
    pub best_0_100_s: Option<f64>,
    pub best_100_200_s: Option<f64>,
    pub quarter_mile_s: Option<f64>,
    /// Failure reported by the engine itself.
    pub error: Option<String>,
}

impl RawEngineOutput {
    /// Read the engine's document. Non-object documents carry no fields.
    pub fn from_document(doc: &Value) -> Self {
        let field = |name: &str| doc.get(name).filter(|v| !v.is_null());

        Self {
            brand: field("brand")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            year: field("year").and_then(parse_year),
            raw_text: field("raw_text").and_then(Value::as_str).map(str::to_string),
            best_0_60_s: field("best_0_60_s").and_then(Value::as_f64),
            best_0_100_s: field("best_0_100_s").and_then(Value::as_f64),
            best_100_200_s: field("best_100_200_s").and_then(Value::as_f64),
            quarter_mile_s: field("quarter_mile_s").and_then(Value::as_f64),
            error: field("error").and_then(|v| match v {
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(s.clone()),
                Value::Bool(false) => None,
                Value::Number(n) if n.as_f64() == Some(0.0) => None,
                other => Some(other.to_string()),
            }),
        }
    }

    /// Parse a complete stdout capture.
    pub fn parse(stdout: &str) -> Result<Self, InvocationError> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Err(InvocationError::EmptyOutput);
        }
        let doc: Value = serde_json::from_str(trimmed).map_err(|e| InvocationError::InvalidOutput {
            reason: e.to_string(),
            stdout: stdout.to_string(),
        })?;
        Ok(Self::from_document(&doc))
    }
}

/// Years arrive as numbers or numeric strings; anything else, and zero, is dropped.
fn parse_year(value: &Value) -> Option<i32> {
    let year = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .enumerate()
                .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
                .map(|(_, c)| c)
                .collect();
            digits.parse().ok()
        }
        _ => None,
    };
    year.filter(|year| *year != 0)
}

/// Runs the engine as a child process, trying each configured candidate in turn.
pub struct ProcessEngine {
    config: EngineConfig,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the engine against a video and parse its document.
    pub async fn invoke(&self, video: &Path) -> Result<RawEngineOutput, InvocationError> {
        tracing::debug!(candidates = ?self.config.candidates, "Resolving engine executable");

        for program in &self.config.candidates {
            let mut command = Command::new(program);
            if let Some(script) = &self.config.script {
                command.arg(script);
            }
            command
                .arg(video)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            tracing::info!(program = %program, video = %video.display(), "Starting engine");
            let start = Instant::now();

            let output = match tokio::time::timeout(self.config.timeout, command.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    tracing::debug!(program = %program, error = %e, "Engine candidate could not be started");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(
                        program = %program,
                        timeout_secs = self.config.timeout.as_secs(),
                        "Engine run timed out"
                    );
                    return Err(InvocationError::Timeout(self.config.timeout));
                }
            };

            metrics::histogram!("engine_invocation_seconds").record(start.elapsed().as_secs_f64());

            if !output.status.success() {
                tracing::warn!(
                    program = %program,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Engine candidate exited abnormally"
                );
                continue;
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            if !output.stderr.is_empty() {
                tracing::debug!(
                    program = %program,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Engine diagnostics"
                );
            }

            return match RawEngineOutput::parse(&stdout) {
                Ok(parsed) => {
                    tracing::info!(
                        program = %program,
                        duration_ms = start.elapsed().as_millis() as u64,
                        engine_error = parsed.error.as_deref().unwrap_or(""),
                        "Engine output parsed"
                    );
                    Ok(parsed)
                }
                Err(InvocationError::EmptyOutput) => Err(InvocationError::EmptyOutput),
                Err(e) => {
                    tracing::warn!(program = %program, stdout = %stdout, "Engine emitted invalid output");
                    Err(e)
                }
            };
        }

        Err(InvocationError::ExecutableNotFound(self.config.name.clone()))
    }
}

impl Extractor for ProcessEngine {
    fn extract<'a>(&'a self, video: &'a Path) -> BoxFuture<'a, Result<RawEngineOutput, InvocationError>> {
        Box::pin(self.invoke(video))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("No {0} executable found")]
    ExecutableNotFound(String),

    #[error("Empty output from engine")]
    EmptyOutput,

    #[error("Invalid JSON from engine: {reason}")]
    InvalidOutput { reason: String, stdout: String },

    #[error("Engine did not finish within {0:?}")]
    Timeout(Duration),
}
