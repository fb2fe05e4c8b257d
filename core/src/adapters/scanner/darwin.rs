//! macOS port scanner implementation using lsof and netstat.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};

use super::utils::Utils;
use super::Scanner;

/// macOS-specific port scanner using lsof.
#[derive(Clone, Copy)]
pub struct DarwinScanner;

impl DarwinScanner {
    /// Create a new macOS scanner.
    pub fn new() -> Self {
        Self
    }

    /// Parse `lsof -nP -iTCP -sTCP:LISTEN` output into listening ports.
    ///
    /// ```text
    /// COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
    /// node    53561 user   19u  IPv4 0x1234      0t0  TCP *:3002 (LISTEN)
    /// ```
    fn parse_lsof_ports(&self, output: &str) -> HashSet<u16> {
        let mut ports = HashSet::new();

        for line in output.lines().skip(1) {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 9 {
                continue;
            }

            for comp in components[8..].iter().rev() {
                if comp.contains(':') && !comp.starts_with("0x") && !comp.starts_with("0t") {
                    if let Some((_, port)) = Utils::parse_address(comp) {
                        ports.insert(port);
                    }
                    break;
                }
            }
        }

        ports
    }

    /// Parse `netstat -an -p tcp` output into listening ports.
    ///
    /// ```text
    /// Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
    /// tcp4       0      0  *.3002                 *.*                    LISTEN
    /// ```
    fn parse_netstat_ports(&self, output: &str) -> HashSet<u16> {
        output
            .lines()
            .filter_map(|line| {
                let components: Vec<&str> = line.split_whitespace().collect();
                if components.len() < 6
                    || !components[0].starts_with("tcp")
                    || components[5] != "LISTEN"
                {
                    return None;
                }
                Utils::parse_dotted_address(components[3]).map(|(_, port)| port)
            })
            .collect()
    }

    async fn lsof_listening(&self) -> Result<HashSet<u16>> {
        let output = Utils::run("lsof", &["-nP", "-iTCP", "-sTCP:LISTEN"]).await?;

        // Exit code 1 with no output means nothing is listening
        if !output.status.success() && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!("lsof failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in lsof output: {}", e)))?;
        Ok(self.parse_lsof_ports(&stdout))
    }
}

impl Default for DarwinScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for DarwinScanner {
    async fn listening_ports(&self) -> Result<HashSet<u16>> {
        match self.lsof_listening().await {
            Ok(ports) => Ok(ports),
            Err(e) => {
                debug!(error = %e, "lsof unavailable, trying netstat");
                let stdout = Utils::run_checked("netstat", &["-an", "-p", "tcp"]).await?;
                Ok(self.parse_netstat_ports(&stdout))
            }
        }
    }

    async fn pids_on_port(&self, port: u16) -> Result<Vec<u32>> {
        Utils::lsof_pids(port).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsof_ports() {
        let scanner = DarwinScanner::new();
        let output = r#"COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
node    53561 user   19u  IPv4 0x1234      0t0  TCP *:3002 (LISTEN)
nginx   55316 root    6u  IPv6 0x5678      0t0  TCP [::1]:8080 (LISTEN)"#;

        let ports = scanner.parse_lsof_ports(output);
        assert_eq!(ports, HashSet::from([3002, 8080]));
    }

    #[test]
    fn test_parse_netstat_ports() {
        let scanner = DarwinScanner::new();
        let output = r#"Active Internet connections (including servers)
Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
tcp4       0      0  *.3002                 *.*                    LISTEN
tcp6       0      0  ::1.5433               *.*                    LISTEN
tcp4       0      0  192.168.1.2.50000      17.1.1.1.443           ESTABLISHED"#;

        let ports = scanner.parse_netstat_ports(output);
        assert_eq!(ports, HashSet::from([3002, 5433]));
    }
}
