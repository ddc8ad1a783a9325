//! Local invocation strategy
//!
//! Runs the function as a local process instead of calling the remote
//! endpoint, which keeps development free of a network dependency. A
//! function named `merge-videos` maps to
//! `{functions_dir}/merge-videos/{entrypoint}`, started as
//! `{runtime} {entrypoint_path} {payload_json}`.
//!
//! The result is read from standard output. Standard error is diagnostics
//! only: it is logged, never parsed.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::response::{normalize, parse_output, truncate};
use crate::Invoker;

/// Invokes functions as local processes
#[derive(Debug, Clone)]
pub struct LocalInvoker {
    /// Interpreter used to run entrypoints (e.g., "node")
    runtime: String,
    /// Directory holding one subdirectory per function
    functions_dir: PathBuf,
    /// Entrypoint file name inside each function directory
    entrypoint: String,
}

impl LocalInvoker {
    pub fn new(
        runtime: impl Into<String>,
        functions_dir: impl Into<PathBuf>,
        entrypoint: impl Into<String>,
    ) -> Self {
        Self {
            runtime: runtime.into(),
            functions_dir: functions_dir.into(),
            entrypoint: entrypoint.into(),
        }
    }

    pub fn functions_dir(&self) -> &Path {
        &self.functions_dir
    }

    /// Path of the runnable unit for `function`
    pub fn entrypoint_for(&self, function: &str) -> PathBuf {
        self.functions_dir.join(function).join(&self.entrypoint)
    }
}

#[async_trait]
impl Invoker for LocalInvoker {
    async fn invoke(&self, function: &str, payload: &Value) -> Result<Value> {
        let entrypoint = self.entrypoint_for(function);
        if !entrypoint.is_file() {
            return Err(GatewayError::NotFound {
                function: function.to_string(),
                message: format!("no entrypoint at {}", entrypoint.display()),
            });
        }

        debug!(
            "Invoking local function {} via {} {}",
            function,
            self.runtime,
            entrypoint.display()
        );

        let mut command = Command::new(&self.runtime);
        command
            .arg(&entrypoint)
            .arg(payload.to_string())
            .kill_on_drop(true);
        if let Some(dir) = entrypoint.parent() {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| GatewayError::Spawn {
            function: function.to_string(),
            source,
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!("[{}] {}", function, line);
        }

        if !output.status.success() {
            warn!("Local function {} exited with {}", function, output.status);
            return Err(GatewayError::Invocation {
                function: function.to_string(),
                message: format!(
                    "process exited with {}: {}",
                    output.status,
                    truncate(stderr.trim(), 500)
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw = parse_output(function, &stdout)?;
        normalize(function, raw)
    }

    fn strategy(&self) -> &'static str {
        "local"
    }
}
