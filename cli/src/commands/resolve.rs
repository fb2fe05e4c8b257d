//! Resolve commands - decide ports for one or all services.

use anyhow::Result;
use portguard_core::{ConflictResolver, PortConfig, ResolutionOutcome, ServiceResolution};

use super::{port_list, truncate};

pub async fn one(config: PortConfig, service: &str, force: bool, json: bool) -> Result<bool> {
    let resolver = ConflictResolver::new(config);
    let outcome = resolver.resolve(service, force).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(true);
    }

    print_header();
    print_outcome(&outcome);
    Ok(true)
}

pub async fn all(config: PortConfig, force: bool, json: bool) -> Result<bool> {
    let resolver = ConflictResolver::new(config);
    let results = resolver.resolve_all(force).await;
    let failed = results.values().filter(|r| r.is_failed()).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(failed == 0);
    }

    if results.is_empty() {
        println!("No services configured.");
        return Ok(true);
    }

    print_header();
    for (name, resolution) in &results {
        match resolution {
            ServiceResolution::Resolved(outcome) => print_outcome(outcome),
            ServiceResolution::Failed { error } => {
                println!(
                    "{:<12} {:<6} {:<15} FAILED: {}",
                    truncate(name, 12),
                    "-",
                    "-",
                    error
                );
            }
        }
    }

    println!("\nResolved: {}/{} services", results.len() - failed, results.len());
    Ok(failed == 0)
}

fn print_header() {
    println!("{:<12} {:<6} {:<15} CONFLICTS", "SERVICE", "PORT", "METHOD");
    println!("{}", "-".repeat(60));
}

fn print_outcome(outcome: &ResolutionOutcome) {
    println!(
        "{:<12} {:<6} {:<15} {}",
        truncate(&outcome.service_name, 12),
        outcome.resolved_port,
        outcome.method.to_string(),
        port_list(&outcome.conflicts_encountered)
    );
}
