//! Linux port scanner implementation using ss, netstat and lsof.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::Result;

use super::utils::Utils;
use super::Scanner;

/// Linux-specific port scanner.
#[derive(Clone, Copy)]
pub struct LinuxScanner;

fn users_regex() -> &'static Regex {
    static USERS: OnceLock<Regex> = OnceLock::new();
    USERS.get_or_init(|| Regex::new(r#"\("(.+?)",pid=(\d+),fd=(\d+)\)"#).unwrap())
}

impl LinuxScanner {
    pub fn new() -> Self {
        Self
    }

    /// Parse `ss -Htln` output into the set of listening ports.
    ///
    /// Expected format (no header):
    /// ```text
    /// LISTEN 0      4096   127.0.0.1:3002   0.0.0.0:*
    /// LISTEN 0      511    [::]:80          [::]:*
    /// ```
    fn parse_ss_ports(&self, output: &str) -> HashSet<u16> {
        output
            .lines()
            .filter_map(|line| {
                let components: Vec<&str> = line.split_whitespace().collect();
                if components.len() < 5 || components[0] != "LISTEN" {
                    return None;
                }
                Utils::parse_address(components[3]).map(|(_, port)| port)
            })
            .collect()
    }

    /// Parse `netstat -tln` output into the set of listening ports.
    ///
    /// ```text
    /// Proto Recv-Q Send-Q Local Address           Foreign Address         State
    /// tcp        0      0 0.0.0.0:22              0.0.0.0:*               LISTEN
    /// tcp6       0      0 :::3002                 :::*                    LISTEN
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
                Utils::parse_address(components[3]).map(|(_, port)| port)
            })
            .collect()
    }

    /// Extract owner PIDs from `ss -Htlnp` output for one port.
    ///
    /// The process column lists every owner:
    /// `users:(("nginx",pid=55316,fd=6),("nginx",pid=55317,fd=6))`
    fn parse_ss_pids(&self, output: &str, port: u16) -> Vec<u32> {
        let mut pids = Vec::new();

        for line in output.lines() {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 6 {
                continue;
            }

            match Utils::parse_address(components[3]) {
                Some((_, p)) if p == port => {}
                _ => continue,
            }

            let process_column = components[5..].join(" ");
            for caps in users_regex().captures_iter(&process_column) {
                let Ok(pid) = caps[2].parse::<u32>() else {
                    continue;
                };
                if !pids.contains(&pid) {
                    pids.push(pid);
                }
            }
        }

        pids
    }
}

impl Default for LinuxScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for LinuxScanner {
    /// Executes `ss -Htln`, falling back to `netstat -tln`.
    ///
    /// -H suppress header, -t TCP only, -l listening, -n numeric
    async fn listening_ports(&self) -> Result<HashSet<u16>> {
        match Utils::run_checked("ss", &["-Htln"]).await {
            Ok(stdout) => Ok(self.parse_ss_ports(&stdout)),
            Err(e) => {
                debug!(error = %e, "ss unavailable, trying netstat");
                let stdout = Utils::run_checked("netstat", &["-tln"]).await?;
                Ok(self.parse_netstat_ports(&stdout))
            }
        }
    }

    /// Executes `lsof -ti tcp:<port>`, falling back to `ss -Htlnp`.
    async fn pids_on_port(&self, port: u16) -> Result<Vec<u32>> {
        match Utils::lsof_pids(port).await {
            Ok(pids) => Ok(pids),
            Err(e) => {
                debug!(port = port, error = %e, "lsof unavailable, trying ss");
                let stdout = Utils::run_checked("ss", &["-Htlnp"]).await?;
                Ok(self.parse_ss_pids(&stdout, port))
            }
        }
    }
}
