//! One-shot foreground run of a launch plan.
//!
//! The child is spawned once and awaited. Nothing here restarts it; that
//! stays with whatever supervisor owns the descriptor.

use launch_common::{LaunchError, LaunchResult};
use launch_descriptor::ServerTarget;
use std::future::pending;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tracing::{error, info, warn};

use crate::plan::LaunchPlan;
use crate::probe::wait_for_target;

/// Options for [`run_once`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Wait this long for the server target to accept connections.
    /// `None` skips the readiness probe.
    pub ready_timeout: Option<Duration>,
    pub probe_interval: Duration,
    /// Grace period between SIGTERM and kill when a shutdown signal arrives
    pub graceful_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ready_timeout: None,
            probe_interval: Duration::from_millis(250),
            graceful_timeout: Duration::from_secs(10),
        }
    }
}

/// Spawn the plan's command and wait for it to exit.
///
/// A SIGINT/SIGTERM received while waiting is forwarded to the child. A
/// failed readiness probe kills the child and returns `NotReady`. A readiness
/// timeout on arguments that name no server fails before anything is spawned.
pub async fn run_once(plan: &LaunchPlan, options: &RunOptions) -> LaunchResult<()> {
    plan.check_script()?;

    // A readiness wait needs a server to wait for
    let ready = match options.ready_timeout {
        Some(limit) => Some((plan.server_target()?, limit)),
        None => None,
    };

    let name = plan.name.as_str();
    info!("Launching {}: {}", name, plan.display_line());

    let mut child = plan
        .command()
        .spawn()
        .map_err(|e| LaunchError::spawn_failed(name, e.to_string()))?;

    info!("Process started: {} (pid {:?})", name, child.id());

    let readiness = readiness_probe(name, ready, options.probe_interval);
    tokio::pin!(readiness);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let status = tokio::select! {
        status = child.wait() => status,
        result = &mut readiness => {
            if let Err(e) = result {
                error!("{}", e);
                stop_child(&mut child, name, options.graceful_timeout).await;
                return Err(e);
            }
            tokio::select! {
                status = child.wait() => status,
                _ = &mut shutdown => {
                    info!("Forwarding shutdown to {}", name);
                    stop_child(&mut child, name, options.graceful_timeout).await;
                    child.wait().await
                }
            }
        }
        _ = &mut shutdown => {
            info!("Forwarding shutdown to {}", name);
            stop_child(&mut child, name, options.graceful_timeout).await;
            child.wait().await
        }
    };

    let status = status.map_err(|e| LaunchError::spawn_failed(name, e.to_string()))?;
    exit_result(name, status)
}

async fn readiness_probe(
    name: &str,
    ready: Option<(ServerTarget, Duration)>,
    interval: Duration,
) -> LaunchResult<()> {
    let Some((target, limit)) = ready else {
        return pending().await;
    };

    wait_for_target(name, &target, limit, interval).await
}

fn exit_result(name: &str, status: ExitStatus) -> LaunchResult<()> {
    if status.success() {
        info!("Process exited cleanly: {}", name);
        return Ok(());
    }

    match status.code() {
        Some(code) => {
            warn!("Process exited: {} (code {})", name, code);
            Err(LaunchError::Exited {
                name: name.to_string(),
                code,
            })
        }
        None => {
            warn!("Process terminated by signal: {}", name);
            Err(LaunchError::Signalled {
                name: name.to_string(),
            })
        }
    }
}

/// SIGTERM the child, then kill it if it outlives `grace`.
async fn stop_child(child: &mut Child, name: &str, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => {
                    if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                        return;
                    }
                    warn!("{} did not exit within {:?}, killing", name, grace);
                }
                Err(e) => warn!("Failed to send SIGTERM to {}: {}", name, e),
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        warn!("Failed to kill {}: {}", name, e);
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (Ok(mut sigterm), Ok(mut sigint)) =
            (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
        else {
            warn!("Failed to install signal handlers, shutdown signals will not be forwarded");
            return pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            return pending().await;
        }
        info!("Received Ctrl+C signal");
    }
}
