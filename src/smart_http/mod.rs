//! Git Smart HTTP bridge.
//!
//! The pack protocol itself is left to the `git` executable: each request
//! runs `git upload-pack` or `git receive-pack` in stateless RPC mode with
//! fixed arguments, the request body goes to its stdin and its stdout is
//! streamed back unchanged. The only bytes produced here are the
//! `# service=...` preamble of the ref advertisement.

mod command;
mod pkt;

use std::path::{Path, PathBuf};

use axum::body::{Body, Bytes};
use futures_util::{stream, StreamExt};

use crate::error::{AppError, Result};

pub use command::GitCommand;
use pkt::advertisement_preamble;
#[cfg(test)]
pub use pkt::{encode_pkt_line, FLUSH_PKT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    UploadPack,
    ReceivePack,
}

impl Service {
    /// Parse the `service` query value of an `info/refs` request.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "git-upload-pack" => Ok(Service::UploadPack),
            "git-receive-pack" => Ok(Service::ReceivePack),
            other => Err(AppError::InvalidService(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Service::UploadPack => "git-upload-pack",
            Service::ReceivePack => "git-receive-pack",
        }
    }

    /// Subcommand passed to the git executable.
    pub fn verb(self) -> &'static str {
        match self {
            Service::UploadPack => "upload-pack",
            Service::ReceivePack => "receive-pack",
        }
    }

    pub fn advertisement_content_type(self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-advertisement",
            Service::ReceivePack => "application/x-git-receive-pack-advertisement",
        }
    }

    pub fn result_content_type(self) -> &'static str {
        match self {
            Service::UploadPack => "application/x-git-upload-pack-result",
            Service::ReceivePack => "application/x-git-receive-pack-result",
        }
    }
}

/// Runs pack services against repositories with one git executable.
#[derive(Debug, Clone)]
pub struct Bridge {
    git_bin: PathBuf,
}

impl Bridge {
    pub fn new(git_bin: impl Into<PathBuf>) -> Self {
        Self {
            git_bin: git_bin.into(),
        }
    }

    /// Run `git --version`, failing when the executable cannot be started or
    /// exits unsuccessfully.
    pub async fn check_git(&self) -> Result<String> {
        let output = tokio::process::Command::new(&self.git_bin)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                AppError::Subprocess(format!("cannot run {}: {}", self.git_bin.display(), e))
            })?;
        if !output.status.success() {
            return Err(AppError::Subprocess(format!(
                "{} --version exited with {}",
                self.git_bin.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn command(&self, service: Service, git_protocol: Option<&str>) -> GitCommand {
        let cmd = GitCommand::new(&self.git_bin)
            .arg(service.verb())
            .arg("--stateless-rpc");
        match git_protocol {
            Some(protocol) => cmd.env("GIT_PROTOCOL", protocol),
            None => cmd,
        }
    }

    /// Preamble followed by the output of `git <verb> --stateless-rpc
    /// --advertise-refs <repo>`.
    pub fn advertise_refs(
        &self,
        service: Service,
        repo: &Path,
        git_protocol: Option<&str>,
    ) -> Result<Body> {
        let output = self
            .command(service, git_protocol)
            .arg("--advertise-refs")
            .arg(repo)
            .spawn()?;

        let preamble = Bytes::from(advertisement_preamble(service));
        let body = stream::iter([Ok(preamble)]).chain(output);
        Ok(Body::from_stream(body))
    }

    /// Feed `input` to `git <verb> --stateless-rpc <repo>` and stream its
    /// result.
    pub fn stateless_rpc(
        &self,
        service: Service,
        repo: &Path,
        input: Bytes,
        git_protocol: Option<&str>,
    ) -> Result<Body> {
        let output = self
            .command(service, git_protocol)
            .arg(repo)
            .input(input)
            .spawn()?;
        Ok(Body::from_stream(output))
    }
}
