//! Docker container lifecycle and exec channel.
//!
//! One [`ContainerHandle`] wraps one long-lived container kept alive by
//! `sleep infinity`. Exec runs `sh -c <command>` attached to the
//! multiplexed output stream; frames arrive tagged stdout or stderr and a
//! wall-clock deadline races the stream. On expiry the exec's process is
//! SIGKILLed and exit code 124 is reported with the measured duration.

use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::exec::{StartExecOptions, StartExecResults};
use bollard::models::{ContainerCreateBody, ExecConfig, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, CreateImageOptionsBuilder, RemoveContainerOptionsBuilder,
    StartContainerOptions, StopContainerOptionsBuilder,
};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::error::{SandboxError, SandboxResult};
use crate::result::{ExecOptions, ExecResult};

/// Exit code reported for a command killed by the timeout.
const TIMEOUT_EXIT_CODE: i64 = 124;

/// Grace period before the container is force-removed, in seconds.
const STOP_GRACE_SECS: i32 = 5;

/// One running container owned by a sandbox.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    docker: Docker,
    container_name: String,
    work_dir: String,
    base_env: HashMap<String, String>,
}

impl ContainerHandle {
    /// Pull the image if missing, create the container with the workspace
    /// bind mount, and start it.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] when the image cannot be ensured or the
    /// container cannot be created or started.
    pub async fn launch(
        docker: Docker,
        config: &SandboxConfig,
        host_workspace: &str,
    ) -> SandboxResult<Self> {
        ensure_image(&docker, &config.base_image).await?;

        let container_name = format!("cordon-{}", sanitize_name_component(&config.id));
        remove_container_if_exists(&docker, &container_name).await?;

        let env: Vec<String> = config
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let network_mode = if config.network_enabled {
            "bridge"
        } else {
            "none"
        };
        let body = ContainerCreateBody {
            image: Some(config.base_image.clone()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            env: Some(env),
            working_dir: Some(config.work_dir.clone()),
            attach_stdin: Some(false),
            tty: Some(false),
            host_config: Some(HostConfig {
                binds: Some(vec![format!("{host_workspace}:{}", config.work_dir)]),
                network_mode: Some(network_mode.to_string()),
                auto_remove: Some(false),
                memory: config.memory_limit,
                nano_cpus: config
                    .cpu_limit
                    .map(|cores| (cores * 1_000_000_000.0) as i64),
                ..HostConfig::default()
            }),
            ..ContainerCreateBody::default()
        };

        docker
            .create_container(
                Some(
                    CreateContainerOptionsBuilder::new()
                        .name(&container_name)
                        .build(),
                ),
                body,
            )
            .await
            .map_err(|e| operation_error("create_container", &container_name, e))?;

        docker
            .start_container(&container_name, None::<StartContainerOptions>)
            .await
            .map_err(|e| operation_error("start_container", &container_name, e))?;

        debug!(container = %container_name, image = %config.base_image, "container started");

        Ok(Self {
            docker,
            container_name,
            work_dir: config.work_dir.clone(),
            base_env: config.env.clone(),
        })
    }

    /// The container's name on the daemon.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.container_name
    }

    /// Run `sh -c <command>` inside the container.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] only when the exec channel cannot be
    /// created or attached; a running command's failure or timeout is an
    /// [`ExecResult`] value.
    pub async fn exec(&self, command: &str, options: &ExecOptions) -> SandboxResult<ExecResult> {
        let mut env = self.base_env.clone();
        if let Some(overrides) = &options.env {
            env.extend(overrides.clone());
        }
        let env: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let working_dir = match &options.cwd {
            Some(cwd) => format!("{}/{cwd}", self.work_dir.trim_end_matches('/')),
            None => self.work_dir.clone(),
        };

        let exec_id = self
            .docker
            .create_exec(
                &self.container_name,
                ExecConfig {
                    cmd: Some(vec!["sh".to_string(), "-c".to_string(), command.to_string()]),
                    env: Some(env),
                    working_dir: Some(working_dir),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..ExecConfig::default()
                },
            )
            .await
            .map_err(|e| operation_error("create_exec", &self.container_name, e))?
            .id;

        let started = Instant::now();
        let mut output = match self
            .docker
            .start_exec(&exec_id, None::<StartExecOptions>)
            .await
            .map_err(|e| operation_error("start_exec", &self.container_name, e))?
        {
            StartExecResults::Attached { output, .. } => output,
            StartExecResults::Detached => {
                return Err(SandboxError::ContainerOperation {
                    operation: "start_exec",
                    target: self.container_name.clone(),
                    message: "exec started detached without an output stream".to_string(),
                });
            }
        };

        let timeout_ms = options.timeout_ms.unwrap_or(u64::from(u32::MAX));
        let deadline = tokio::time::sleep(Duration::from_millis(timeout_ms));
        tokio::pin!(deadline);

        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let mut timed_out = false;
        loop {
            tokio::select! {
                () = &mut deadline => {
                    timed_out = true;
                    break;
                }
                frame = output.next() => match frame {
                    Some(Ok(LogOutput::StdOut { message })) => stdout.extend_from_slice(&message),
                    Some(Ok(LogOutput::StdErr { message })) => stderr.extend_from_slice(&message),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(container = %self.container_name, error = %e, "exec stream error");
                        break;
                    }
                    None => break,
                }
            }
        }
        let duration_ms = started.elapsed().as_millis() as u64;

        let exit_code = if timed_out {
            self.kill_exec_process(&exec_id).await;
            TIMEOUT_EXIT_CODE
        } else {
            self.docker
                .inspect_exec(&exec_id)
                .await
                .ok()
                .and_then(|inspect| inspect.exit_code)
                .unwrap_or(0)
        };

        Ok(ExecResult {
            success: !timed_out && exit_code == 0,
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration_ms,
            timed_out,
        })
    }

    /// SIGKILL the process behind a timed-out exec, best-effort.
    async fn kill_exec_process(&self, exec_id: &str) {
        let pid = self
            .docker
            .inspect_exec(exec_id)
            .await
            .ok()
            .and_then(|inspect| inspect.pid);
        let Some(pid) = pid else {
            warn!(container = %self.container_name, "timed-out exec had no pid to kill");
            return;
        };
        let kill = self
            .docker
            .create_exec(
                &self.container_name,
                ExecConfig {
                    cmd: Some(vec![
                        "sh".to_string(),
                        "-c".to_string(),
                        format!("kill -9 {pid}"),
                    ]),
                    ..ExecConfig::default()
                },
            )
            .await;
        match kill {
            Ok(created) => {
                if let Err(e) = self
                    .docker
                    .start_exec(&created.id, None::<StartExecOptions>)
                    .await
                {
                    warn!(container = %self.container_name, error = %e, "failed to kill timed-out exec");
                }
            }
            Err(e) => {
                warn!(container = %self.container_name, error = %e, "failed to create kill exec");
            }
        }
    }

    /// Stop with a short grace period, then force-remove. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] when the daemon refuses the removal for a
    /// reason other than the container already being gone.
    pub async fn destroy(&self) -> SandboxResult<()> {
        let _ = self
            .docker
            .stop_container(
                &self.container_name,
                Some(StopContainerOptionsBuilder::new().t(STOP_GRACE_SECS).build()),
            )
            .await;
        remove_container_if_exists(&self.docker, &self.container_name).await
    }
}

async fn ensure_image(docker: &Docker, image: &str) -> SandboxResult<()> {
    match docker.inspect_image(image).await {
        Ok(_) => return Ok(()),
        Err(e) if is_not_found(&e) => {}
        Err(e) => {
            return Err(SandboxError::EnsureImage {
                image: image.to_string(),
                message: e.to_string(),
            });
        }
    }

    debug!(image = %image, "pulling base image");
    let options = CreateImageOptionsBuilder::new().from_image(image).build();
    let mut stream = docker.create_image(Some(options), None, None);
    while let Some(progress) = stream.next().await {
        progress.map_err(|e| SandboxError::EnsureImage {
            image: image.to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

async fn remove_container_if_exists(docker: &Docker, container_name: &str) -> SandboxResult<()> {
    match docker
        .remove_container(
            container_name,
            Some(
                RemoveContainerOptionsBuilder::new()
                    .force(true)
                    .v(true)
                    .build(),
            ),
        )
        .await
    {
        Ok(()) => Ok(()),
        Err(e) if is_not_found(&e) => Ok(()),
        Err(e) => Err(operation_error("remove_container", container_name, e)),
    }
}

fn is_not_found(error: &BollardError) -> bool {
    matches!(
        error,
        BollardError::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn operation_error(operation: &'static str, target: &str, source: BollardError) -> SandboxError {
    SandboxError::ContainerOperation {
        operation,
        target: target.to_string(),
        message: source.to_string(),
    }
}

/// Restrict a name component to characters the daemon accepts.
fn sanitize_name_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "sandbox".to_string()
    } else {
        sanitized
    }
}
