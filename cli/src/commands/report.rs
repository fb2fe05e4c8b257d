//! Report command - snapshot every configured service.

use std::path::Path;

use anyhow::{Context, Result};
use portguard_core::{PortConfig, PortReporter};

use super::{port_list, truncate};

pub async fn run(config: PortConfig, output: Option<&Path>, json: bool) -> Result<bool> {
    let reporter = PortReporter::system(config);
    let report = reporter.generate_report().await;

    if let Some(path) = output {
        let content = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(true);
    }

    println!(
        "Port report ({})",
        report.generated_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    println!(
        "{:<12} {:<10} {:<6} {:<12} {:<20} DESCRIPTION",
        "SERVICE", "PREFERRED", "FREE", "RECOMMENDED", "FALLBACKS"
    );
    println!("{}", "-".repeat(80));

    for service in &report.services {
        let recommended = service
            .recommended_port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{:<12} {:<10} {:<6} {:<12} {:<20} {}",
            truncate(&service.name, 12),
            service.preferred,
            if service.preferred_available { "yes" } else { "no" },
            recommended,
            truncate(&port_list(&service.fallback_ports), 20),
            service.description
        );
    }

    if report.has_conflicts() {
        println!("\nConflicts: {}", report.conflicts.len());
        for recommendation in &report.recommendations {
            println!("  - {}", recommendation);
        }
    } else {
        println!("\nNo conflicts.");
    }

    Ok(true)
}
