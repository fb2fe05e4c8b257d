//! Check and free commands - operate on a single port.

use anyhow::Result;
use portguard_core::{ConflictResolver, PortConfig};

pub async fn run(config: PortConfig, port: u16, json: bool) -> Result<bool> {
    let reserved = config.is_reserved(port);
    let resolver = ConflictResolver::new(config);
    let result = resolver.check_port(port).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(true);
    }

    let state = if result.is_inconclusive() {
        "unknown (assumed in use)"
    } else if result.in_use {
        "in use"
    } else {
        "free"
    };
    println!("Port {}: {}", port, state);
    if reserved {
        println!("Port {} is reserved and will never be allocated.", port);
    }
    Ok(true)
}

pub async fn free(config: PortConfig, port: u16, graceful: bool, json: bool) -> Result<bool> {
    let resolver = ConflictResolver::new(config);
    let report = resolver.free_port(port, !graceful).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.freed);
    }

    if report.pids.is_empty() && report.freed {
        println!("Port {} is already free.", port);
        return Ok(true);
    }

    for pid in &report.signalled {
        println!("Killed PID {}", pid);
    }
    for failure in &report.failures {
        println!("Could not kill PID {}: {}", failure.pid, failure.reason);
    }

    if report.freed {
        println!("Port {} is now free.", port);
    } else {
        println!("Port {} is still in use.", port);
    }
    Ok(report.freed)
}
