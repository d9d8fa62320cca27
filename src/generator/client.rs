//! Async client for the generator worker process.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use super::error::{GenerationError, GenerationResult};
use super::protocol::{
    methods, ErrorInfo, GenerateParams, GenerateResponse, RequestEnvelope, ResponseEnvelope,
};
use super::SqlGenerator;
use crate::config::{expand_env_vars, GeneratorSettings};

/// Default timeout for requests (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Generator backed by a long-lived child process.
///
/// The worker hosts the generation model and speaks NDJSON over
/// stdin/stdout. Each request carries a unique ID so concurrent requests
/// can share one worker; only the write of a request line is serialized.
///
/// # Example
///
/// ```ignore
/// use sqlmend::generator::{WorkerGenerator, SqlGenerator};
///
/// let worker = WorkerGenerator::spawn("python3", &["generate_worker.py".into()]).await?;
/// let sql = worker.generate(&params).await?;
/// ```
pub struct WorkerGenerator {
    /// Writer for sending requests to worker stdin.
    stdin: Arc<Mutex<BufWriter<ChildStdin>>>,

    /// Pending request IDs and their response channels.
    pending: PendingMap,

    _child: Child,

    /// Background reader task.
    reader_task: tokio::task::JoinHandle<()>,

    timeout: Duration,
}

impl WorkerGenerator {
    /// Spawn a worker with the default timeout.
    pub async fn spawn(command: &str, args: &[String]) -> GenerationResult<Self> {
        Self::spawn_with_timeout(command, args, Duration::from_secs(DEFAULT_TIMEOUT_SECS)).await
    }

    /// Spawn the worker described by `[generator]` settings. Environment
    /// variables in the command and arguments are expanded first.
    pub async fn spawn_with_settings(settings: &GeneratorSettings) -> GenerationResult<Self> {
        let command = settings
            .command
            .as_deref()
            .ok_or(GenerationError::NotConfigured)?;
        let expand = |s: &str| {
            expand_env_vars(s).map_err(|e| {
                GenerationError::SpawnFailed(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
            })
        };
        let command = expand(command)?;
        let args = settings
            .args
            .iter()
            .map(|a| expand(a))
            .collect::<GenerationResult<Vec<_>>>()?;

        Self::spawn_with_timeout(&command, &args, Duration::from_secs(settings.timeout_secs)).await
    }

    /// Spawn a worker with a custom timeout.
    pub async fn spawn_with_timeout(
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> GenerationResult<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(GenerationError::SpawnFailed)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            GenerationError::SpawnFailed(io::Error::other("worker stdin not captured"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            GenerationError::SpawnFailed(io::Error::other("worker stdout not captured"))
        })?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());
        debug!(command, "generator worker spawned");

        Ok(Self {
            stdin: Arc::new(Mutex::new(BufWriter::new(stdin))),
            pending,
            _child: child,
            reader_task,
            timeout,
        })
    }

    /// Read response lines and hand each to its waiting caller.
    fn spawn_reader_task(stdout: ChildStdout, pending: PendingMap) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => match serde_json::from_str::<ResponseEnvelope>(&line) {
                        Ok(resp) => {
                            let mut pending = pending.lock().await;
                            if let Some(tx) = pending.remove(&resp.id) {
                                let _ = tx.send(resp);
                            }
                        }
                        // Workers print model-loading chatter; skip it.
                        Err(e) => warn!(error = %e, "generator worker: unparseable line"),
                    },
                    Err(e) => {
                        warn!(error = %e, "generator worker: read error");
                        break;
                    }
                }
            }

            // Worker gone: fail everything still waiting.
            let mut pending = pending.lock().await;
            for (id, tx) in pending.drain() {
                let _ = tx.send(ResponseEnvelope {
                    id,
                    success: false,
                    result: None,
                    error: Some(ErrorInfo {
                        code: "WORKER_EXITED".to_string(),
                        message: "Worker process exited unexpectedly".to_string(),
                    }),
                });
            }
        })
    }

    /// Send a request and wait for its response.
    pub async fn request<P, R>(&self, method: &str, params: P) -> GenerationResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();

        let request = RequestEnvelope {
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params).map_err(GenerationError::SerializeFailed)?,
        };

        let line = serde_json::to_string(&request).map_err(GenerationError::SerializeFailed)? + "\n";

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().await.remove(&id);
            return Err(GenerationError::WriteFailed(e));
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(resp) => resp?,
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(GenerationError::Timeout(self.timeout.as_secs()));
            }
        };

        if response.success {
            let result = response.result.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(result).map_err(GenerationError::DeserializeFailed)
        } else {
            let error = response.error.unwrap_or_else(|| ErrorInfo {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(Self::classify_error(&error.code, &error.message))
        }
    }

    async fn write_line(&self, line: &str) -> io::Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await
    }

    fn classify_error(code: &str, message: &str) -> GenerationError {
        match code {
            "WORKER_EXITED" => GenerationError::WorkerExited,
            _ => GenerationError::remote(code, message),
        }
    }

    /// True until the worker's stdout closes.
    pub fn is_alive(&self) -> bool {
        !self.reader_task.is_finished()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl SqlGenerator for WorkerGenerator {
    async fn generate(&self, params: &GenerateParams) -> GenerationResult<String> {
        let response: GenerateResponse = self.request(methods::GENERATE, params).await?;
        if response.sql.trim().is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(response.sql)
    }
}
