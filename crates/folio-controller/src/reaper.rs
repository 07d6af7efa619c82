//! Killing whatever holds the Content API port.
//!
//! Used before spawning and when a stop finds no child to stop, so a
//! Content API left behind by an earlier controller does not block the port.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Errors from port reaping.
#[derive(Debug, thiserror::Error)]
pub enum ReapError {
    #[error("Failed to run {tool}: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Kills OS processes bound to a TCP port.
#[async_trait]
pub trait PortReaper: Send + Sync {
    /// Returns how many processes were killed.
    async fn reap(&self, port: u16) -> Result<usize, ReapError>;
}

/// Reaper backed by the platform tools (`lsof` on unix, `netstat` and
/// `taskkill` on windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemReaper;

#[async_trait]
impl PortReaper for SystemReaper {
    async fn reap(&self, port: u16) -> Result<usize, ReapError> {
        let pids = listeners(port).await?;
        let own = std::process::id();
        let mut killed = 0;
        for pid in pids.into_iter().filter(|p| *p != own) {
            if kill(pid).await {
                info!(pid, port, "Killed process holding the Content API port");
                killed += 1;
            }
        }
        debug!(port, killed, "Port reap finished");
        Ok(killed)
    }
}

#[cfg(unix)]
async fn listeners(port: u16) -> Result<Vec<u32>, ReapError> {
    // lsof exits 1 when nothing matches; only the output matters.
    let output = Command::new("lsof")
        .arg(format!("-ti:{port}"))
        .output()
        .await
        .map_err(|source| ReapError::Tool {
            tool: "lsof",
            source,
        })?;
    Ok(parse_lsof_pids(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(not(unix))]
async fn listeners(port: u16) -> Result<Vec<u32>, ReapError> {
    let output = Command::new("netstat")
        .arg("-ano")
        .output()
        .await
        .map_err(|source| ReapError::Tool {
            tool: "netstat",
            source,
        })?;
    Ok(parse_netstat_pids(
        &String::from_utf8_lossy(&output.stdout),
        port,
    ))
}

#[cfg(unix)]
#[allow(clippy::unused_async)]
async fn kill(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; pid came from lsof.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::kill(raw, libc::SIGKILL) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        warn!(pid, error = %err, "Failed to send SIGKILL");
        return false;
    }
    true
}

#[cfg(not(unix))]
async fn kill(pid: u32) -> bool {
    match Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output()
        .await
    {
        Ok(out) if out.status.success() => true,
        Ok(out) => {
            warn!(pid, status = ?out.status, "taskkill failed");
            false
        }
        Err(e) => {
            warn!(pid, error = %e, "Failed to run taskkill");
            false
        }
    }
}

/// Pids printed by `lsof -t`, one per line.
pub fn parse_lsof_pids(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|l| l.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Pids of `netstat -ano` rows whose local address ends in `:<port>`.
pub fn parse_netstat_pids(output: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{port}");
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let local = cols.get(1)?;
            if !local.ends_with(&suffix) {
                return None;
            }
            cols.last()?.parse().ok()
        })
        .filter(|pid| *pid != 0)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lsof_output() {
        assert_eq!(parse_lsof_pids("4242\n17\n4242\n"), vec![17, 4242]);
        assert!(parse_lsof_pids("").is_empty());
    }

    #[test]
    fn netstat_output() {
        let out = "\
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:3001           0.0.0.0:0              LISTENING       5120
  TCP    [::]:3001              [::]:0                 LISTENING       5120
  TCP    127.0.0.1:30010        0.0.0.0:0              LISTENING       77
  TCP    127.0.0.1:52000        127.0.0.1:3001         ESTABLISHED     901
  TCP    127.0.0.1:3001         127.0.0.1:52000        TIME_WAIT       0
";
        assert_eq!(parse_netstat_pids(out, 3001), vec![5120]);
    }
}
