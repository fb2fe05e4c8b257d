//! Config command - print the effective service registry.

use anyhow::Result;
use portguard_core::PortConfig;

use super::{port_list, truncate};

pub fn show(config: &PortConfig, json: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(true);
    }

    println!(
        "{:<12} {:<10} {:<24} DESCRIPTION",
        "SERVICE", "PREFERRED", "FALLBACKS"
    );
    println!("{}", "-".repeat(70));
    for spec in &config.services {
        println!(
            "{:<12} {:<10} {:<24} {}",
            truncate(&spec.name, 12),
            spec.preferred_port,
            truncate(&port_list(&spec.fallback_ports), 24),
            spec.description
        );
    }

    let reserved: Vec<u16> = config.reserved_ports.iter().collect();
    println!("\nReserved ports: {}", port_list(&reserved));
    println!("Settle delay: {} ms", config.settle_delay_ms);
    println!("Operation timeout: {} ms", config.operation_timeout_ms);
    Ok(true)
}
