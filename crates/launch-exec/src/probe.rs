//! TCP readiness probe for launched servers.

use launch_common::{LaunchError, LaunchResult};
use launch_descriptor::ServerTarget;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

/// Retry a TCP connect to `addr` until it succeeds or `limit` elapses.
pub async fn wait_for_tcp(
    name: &str,
    addr: &str,
    limit: Duration,
    interval: Duration,
) -> LaunchResult<()> {
    let started = Instant::now();

    let attempt_loop = async {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match TcpStream::connect(addr).await {
                Ok(_) => return attempts,
                Err(e) => {
                    debug!("Readiness probe {} for {} failed: {}", attempts, addr, e);
                    sleep(interval).await;
                }
            }
        }
    };

    match timeout(limit, attempt_loop).await {
        Ok(attempts) => {
            info!(
                "{} is accepting connections on {} (after {:?}, {} attempts)",
                name,
                addr,
                started.elapsed(),
                attempts
            );
            Ok(())
        }
        Err(_) => Err(LaunchError::NotReady {
            name: name.to_string(),
            address: addr.to_string(),
            waited: limit,
        }),
    }
}

/// Probe the address a server target listens on, via loopback for
/// wildcard binds.
pub async fn wait_for_target(
    name: &str,
    target: &ServerTarget,
    limit: Duration,
    interval: Duration,
) -> LaunchResult<()> {
    wait_for_tcp(name, &target.probe_addr(), limit, interval).await
}
