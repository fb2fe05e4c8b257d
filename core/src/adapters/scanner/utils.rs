use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Error, Result};

pub struct Utils;

impl Utils {
    /// Parse an address:port string.
    ///
    /// Handles multiple address formats:
    /// - IPv4: "127.0.0.1:3000" or "*:8080"
    /// - IPv6: "\[::1]:3000" or "\[fe80::1]:8080"
    pub fn parse_address(address: &str) -> Option<(String, u16)> {
        if address.starts_with('[') {
            // IPv6 format: [::1]:3000
            let bracket_end = address.find(']')?;
            if bracket_end + 1 >= address.len() || address.as_bytes()[bracket_end + 1] != b':' {
                return None;
            }
            let addr = &address[..=bracket_end];
            let port_str = &address[bracket_end + 2..];
            let port: u16 = port_str.parse().ok()?;
            Some((addr.to_string(), port))
        } else {
            // IPv4 format: 127.0.0.1:3000 or *:8080, also netstat's ":::22"
            let last_colon = address.rfind(':')?;
            let addr = &address[..last_colon];
            let port_str = &address[last_colon + 1..];
            let port: u16 = port_str.parse().ok()?;
            let addr = if addr.is_empty() { "*" } else { addr };
            Some((addr.to_string(), port))
        }
    }

    /// Parse a BSD netstat address, where the port follows the last dot.
    ///
    /// Examples: "*.3000", "127.0.0.1.8080", "::1.5432"
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn parse_dotted_address(address: &str) -> Option<(String, u16)> {
        let last_dot = address.rfind('.')?;
        let port: u16 = address[last_dot + 1..].parse().ok()?;
        let addr = &address[..last_dot];
        let addr = if addr.is_empty() { "*" } else { addr };
        Some((addr.to_string(), port))
    }

    /// Run an introspection command and return its stdout.
    ///
    /// The child is killed if the returned future is dropped, so callers
    /// can bound it with a timeout.
    pub async fn run(program: &str, args: &[&str]) -> Result<std::process::Output> {
        Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run {}: {}", program, e)))
    }

    /// Run a command that must exit successfully and emit UTF-8.
    pub async fn run_checked(program: &str, args: &[&str]) -> Result<String> {
        let output = Self::run(program, args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in {} output: {}", program, e)))
    }

    /// PIDs listening on a TCP port, via `lsof -t -i tcp:<port> -sTCP:LISTEN`.
    ///
    /// Clients connected to the port are not holders and are left out.
    pub async fn lsof_pids(port: u16) -> Result<Vec<u32>> {
        let target = format!("tcp:{}", port);
        let output = Self::run("lsof", &["-nP", "-t", "-i", &target, "-sTCP:LISTEN"]).await?;

        // lsof returns exit code 1 when no processes found, which is not an error
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() && !output.stdout.is_empty() {
            return Err(Error::CommandFailed(format!("lsof failed: {}", stderr.trim())));
        }

        Ok(Self::parse_pid_lines(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parse one PID per line, dropping duplicates and junk.
    pub fn parse_pid_lines(output: &str) -> Vec<u32> {
        let mut pids: Vec<u32> = Vec::new();
        for pid in output.lines().filter_map(|line| line.trim().parse().ok()) {
            if !pids.contains(&pid) {
                pids.push(pid);
            }
        }
        pids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_address() {
        let (addr, port) = Utils::parse_address("127.0.0.1:3000").unwrap();
        assert_eq!(addr, "127.0.0.1");
        assert_eq!(port, 3000);

        let (addr, port) = Utils::parse_address("*:8080").unwrap();
        assert_eq!(addr, "*");
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_ipv6_address() {
        let (addr, port) = Utils::parse_address("[::1]:3000").unwrap();
        assert_eq!(addr, "[::1]");
        assert_eq!(port, 3000);

        let (_, port) = Utils::parse_address(":::22").unwrap();
        assert_eq!(port, 22);
    }

    #[test]
    fn test_parse_dotted_address() {
        let (addr, port) = Utils::parse_dotted_address("*.3000").unwrap();
        assert_eq!(addr, "*");
        assert_eq!(port, 3000);

        let (addr, port) = Utils::parse_dotted_address("127.0.0.1.5432").unwrap();
        assert_eq!(addr, "127.0.0.1");
        assert_eq!(port, 5432);

        assert!(Utils::parse_dotted_address("*.*").is_none());
    }

    #[test]
    fn test_parse_pid_lines() {
        let pids = Utils::parse_pid_lines("1234\n5678\n\n1234\nnot-a-pid\n");
        assert_eq!(pids, vec![1234, 5678]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lsof_pids_ignores_connected_clients() {
        use std::io;
        use std::net::TcpListener;
        use std::time::{Duration, Instant};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        listener.set_nonblocking(true).unwrap();

        let script = format!("exec 3<>/dev/tcp/127.0.0.1/{}; sleep 30", port);
        let Ok(mut client) = Command::new("bash")
            .args(["-c", &script])
            .kill_on_drop(true)
            .spawn()
        else {
            return;
        };
        let client_pid = client.id().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let _conn = loop {
            match listener.accept() {
                Ok((conn, _)) => break conn,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                Err(_) => return,
            }
        };

        // lsof is missing on minimal hosts
        let Ok(pids) = Utils::lsof_pids(port).await else {
            return;
        };
        let _ = client.kill().await;

        assert!(!pids.contains(&client_pid), "client {} listed in {:?}", client_pid, pids);
        assert!(pids.contains(&std::process::id()));
    }
}
