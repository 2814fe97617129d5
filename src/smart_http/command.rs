//! One git subprocess per request, with stdout exposed as a byte stream.
//!
//! The child is spawned with `kill_on_drop`, and the stream returned by
//! [`GitCommand::spawn`] owns it. Dropping the stream before EOF (a client
//! disconnect) therefore kills the process; reaching EOF waits for it.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use axum::body::Bytes;
use futures_util::{stream, Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, Result};

pub struct GitCommand {
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(String, String)>,
    input: Option<Bytes>,
}

impl GitCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            input: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Bytes written to the child's stdin, after which stdin is closed.
    pub fn input(mut self, input: Bytes) -> Self {
        self.input = Some(input);
        self
    }

    fn describe(&self) -> String {
        let mut description = self.program.display().to_string();
        for arg in &self.args {
            description.push(' ');
            description.push_str(&arg.to_string_lossy());
        }
        description
    }

    /// Start the process and return its stdout as a stream of chunks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static> {
        let description = self.describe();

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if self.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| AppError::Subprocess(format!("failed to spawn {}: {}", description, e)))?;
        tracing::debug!("Spawned {}", description);

        if let (Some(input), Some(mut stdin)) = (self.input, child.stdin.take()) {
            let label = description.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::warn!("Writing request body to {} failed: {}", label, e);
                }
                // stdin is dropped here, closing the pipe
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let label = description.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("{}: {}", label, line);
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Subprocess(format!("{}: missing stdout pipe", description)))?;

        Ok(relay(child, stdout, description))
    }
}

struct Relay {
    child: Child,
    reader: ReaderStream<ChildStdout>,
    description: String,
    bytes: u64,
    finished: bool,
}

impl Relay {
    async fn finish(mut self) {
        self.finished = true;
        match self.child.wait().await {
            Ok(status) => tracing::info!(
                "{} exited with {} after relaying {} bytes",
                self.description,
                status,
                self.bytes
            ),
            Err(e) => tracing::warn!("Waiting for {} failed: {}", self.description, e),
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                "Client went away after {} bytes; killing {}",
                self.bytes,
                self.description
            );
        }
    }
}

fn relay(
    child: Child,
    stdout: ChildStdout,
    description: String,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    let state = Relay {
        child,
        reader: ReaderStream::new(stdout),
        description,
        bytes: 0,
        finished: false,
    };

    stream::unfold(Some(state), |state| async move {
        let Some(mut relay) = state else {
            return None;
        };
        match relay.reader.next().await {
            Some(Ok(chunk)) => {
                relay.bytes += chunk.len() as u64;
                Some((Ok(chunk), Some(relay)))
            }
            Some(Err(e)) => {
                tracing::warn!("Reading stdout of {} failed: {}", relay.description, e);
                relay.finished = true;
                Some((Err(e), None))
            }
            None => {
                relay.finish().await;
                None
            }
        }
    })
}
