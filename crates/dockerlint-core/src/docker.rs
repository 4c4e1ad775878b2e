//! Runs linters inside docker containers.

use crate::collect::{OutputChunk, RunCollector, RunOutcome, Stream};
use crate::profile::ResolvedProfile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{OnceLock, RwLock};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Log target for runtime operations.
const RUNTIME_TARGET: &str = "dockerlint_core::docker";

const READ_BUFFER_SIZE: usize = 8 * 1024;

static MACHINE_EXPORT_PATTERN: OnceLock<Regex> = OnceLock::new();

fn machine_export_pattern() -> &'static Regex {
    MACHINE_EXPORT_PATTERN.get_or_init(|| Regex::new(r#"(?mR)^export (\w+)="(.*)"$"#).unwrap())
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker executable '{program}' was not found")]
    DockerNotFound { program: String },

    #[error("failed to prepare the docker environment: {message}")]
    Environment { message: String },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running the linter: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Whether the failure is about the host environment and may clear up
    /// once the user starts docker or fixes their machine settings.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RuntimeError::DockerNotFound { .. } | RuntimeError::Environment { .. }
        )
    }
}

/// Where to find docker and which docker-machine, if any, to target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentOptions {
    #[serde(default)]
    pub docker_path: Option<PathBuf>,
    #[serde(default)]
    pub machine: Option<String>,
}

/// A container engine able to run a linter over piped input.
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Establish the environment later runs will use.
    fn prepare(
        &self,
        options: &EnvironmentOptions,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Run `profile` with `input` on stdin, sending output chunks to `sink`
    /// as they arrive. Resolves to the exit code, `None` if killed by a signal.
    fn exec(
        &self,
        profile: &ResolvedProfile,
        input: String,
        sink: mpsc::UnboundedSender<OutputChunk>,
    ) -> impl Future<Output = Result<Option<i32>, RuntimeError>> + Send;
}

#[derive(Debug, Clone)]
struct DockerEnvironment {
    program: PathBuf,
    envs: Vec<(String, String)>,
}

impl Default for DockerEnvironment {
    fn default() -> Self {
        Self {
            program: PathBuf::from("docker"),
            envs: Vec::new(),
        }
    }
}

/// [`ContainerRuntime`] backed by the `docker` CLI.
#[derive(Debug, Default)]
pub struct DockerRuntime {
    environment: RwLock<DockerEnvironment>,
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn environment(&self) -> DockerEnvironment {
        self.environment
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ContainerRuntime for DockerRuntime {
    async fn prepare(&self, options: &EnvironmentOptions) -> Result<(), RuntimeError> {
        let program = options
            .docker_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("docker"));

        let envs = match options.machine.as_deref() {
            Some(machine) => machine_env(machine).await?,
            None => Vec::new(),
        };

        probe(&program, &envs).await?;

        *self
            .environment
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = DockerEnvironment { program, envs };
        Ok(())
    }

    async fn exec(
        &self,
        profile: &ResolvedProfile,
        input: String,
        sink: mpsc::UnboundedSender<OutputChunk>,
    ) -> Result<Option<i32>, RuntimeError> {
        let env = self.environment();

        debug!(
            target: RUNTIME_TARGET,
            profile = %profile.name,
            container = %profile.container,
            command = ?profile.command,
            "spawning linter"
        );

        let mut command = Command::new(&env.program);
        command
            .arg("exec")
            .arg("-i")
            .arg(&profile.container)
            .args(&profile.command)
            .envs(env.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| spawn_error(&env.program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });
        let stdout_reader = tokio::spawn(forward(stdout, Stream::Stdout, sink.clone()));
        let stderr_reader = tokio::spawn(forward(stderr, Stream::Stderr, sink));

        for reader in [stdout_reader, stderr_reader] {
            reader.await.map_err(std::io::Error::other)??;
        }

        match writer.await.map_err(std::io::Error::other)? {
            Ok(()) => {}
            // The linter may exit without reading all of its input
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Err(e) => warn!(target: RUNTIME_TARGET, error = %e, "failed to write linter input"),
        }

        let status = child.wait().await?;
        debug!(target: RUNTIME_TARGET, status = %status, "linter exited");
        Ok(status.code())
    }
}

async fn forward<R>(
    mut reader: R,
    stream: Stream,
    sink: mpsc::UnboundedSender<OutputChunk>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let chunk = OutputChunk {
            stream,
            bytes: buf[..n].to_vec(),
        };
        if sink.send(chunk).is_err() {
            // Receiver gone; nobody wants the rest
            return Ok(());
        }
    }
}

fn spawn_error(program: &std::path::Path, error: std::io::Error) -> RuntimeError {
    if error.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::DockerNotFound {
            program: program.display().to_string(),
        }
    } else {
        RuntimeError::Spawn {
            program: program.display().to_string(),
            source: error,
        }
    }
}

/// Parse the `export KEY="VALUE"` lines printed by `docker-machine env`.
pub fn parse_machine_env(output: &str) -> Vec<(String, String)> {
    machine_export_pattern()
        .captures_iter(output)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

async fn machine_env(machine: &str) -> Result<Vec<(String, String)>, RuntimeError> {
    debug!(target: RUNTIME_TARGET, machine, "loading docker-machine environment");

    let output = Command::new("docker-machine")
        .args(["env", "--shell", "bash", machine])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| RuntimeError::Environment {
            message: format!("could not run docker-machine: {e}"),
        })?;

    if !output.status.success() {
        return Err(RuntimeError::Environment {
            message: failure_message("docker-machine env", &output),
        });
    }

    let envs = parse_machine_env(&String::from_utf8_lossy(&output.stdout));
    if envs.is_empty() {
        return Err(RuntimeError::Environment {
            message: format!("docker-machine env {machine} printed no variables"),
        });
    }
    Ok(envs)
}

async fn probe(program: &std::path::Path, envs: &[(String, String)]) -> Result<(), RuntimeError> {
    let output = Command::new(program)
        .args(["version", "--format", "{{.Server.Version}}"])
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| spawn_error(program, e))?;

    if !output.status.success() {
        return Err(RuntimeError::Environment {
            message: failure_message("docker version", &output),
        });
    }

    debug!(
        target: RUNTIME_TARGET,
        server = %String::from_utf8_lossy(&output.stdout).trim(),
        "docker daemon reachable"
    );
    Ok(())
}

fn failure_message(what: &str, output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{what} failed ({})", output.status)
    } else {
        stderr.to_string()
    }
}

/// Run `profile` over `input` and collect everything it reports.
pub async fn run_linter<R>(
    runtime: &R,
    profile: &ResolvedProfile,
    input: String,
) -> Result<RunOutcome, RuntimeError>
where
    R: ContainerRuntime,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut collector = RunCollector::new(profile);

    let exec = runtime.exec(profile, input, tx);
    let collect = async {
        while let Some(chunk) = rx.recv().await {
            collector.push(&chunk);
        }
    };
    let (exit_code, ()) = tokio::join!(exec, collect);

    Ok(collector.finish(exit_code?))
}
