use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::debug;

use super::context::LaunchError;

const READY_PROBE_ATTEMPTS: u32 = 40;
const READY_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// A spawned WebDriver service process.
///
/// The child is configured with `kill_on_drop`, so an abandoned service
/// cannot outlive its owner.
#[derive(Debug)]
pub struct DriverService {
    child: Child,
    port: u16,
}

impl DriverService {
    /// Spawn `executable` on `port` with the scoped environment applied to
    /// the child only, then wait for it to accept connections.
    ///
    /// A service that dies while coming up is reported as a
    /// driver-communication failure: the usual cause is an executable that
    /// does not match the installed browser.
    pub async fn start(
        executable: &Path,
        port: u16,
        scoped_env: &[(String, String)],
    ) -> Result<Self, LaunchError> {
        let mut command = Command::new(executable);
        command
            .arg(format!("--port={port}"))
            .envs(scoped_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        debug!(driver = %executable.display(), port, "starting webdriver service");

        for _ in 0..READY_PROBE_ATTEMPTS {
            if let Some(status) = child.try_wait()? {
                return Err(LaunchError::DriverComm(format!(
                    "driver service exited during startup: {status}"
                )));
            }
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                return Ok(Self { child, port });
            }
            sleep(READY_PROBE_INTERVAL).await;
        }

        Err(LaunchError::DriverComm(format!(
            "driver service did not open port {port} in time"
        )))
    }

    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Terminate the service process.
    pub async fn shutdown(mut self) {
        let _ = self.child.kill().await;
    }
}
