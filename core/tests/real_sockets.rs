//! Resolver behaviour against the host's real sockets and tooling.

use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use portguard_core::{ConflictResolver, PortConfig, ResolutionMethod, ServicePortSpec};

fn hold_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn free_port() -> u16 {
    let (listener, port) = hold_port();
    drop(listener);
    port
}

fn resolver(preferred: u16, fallbacks: Vec<u16>) -> ConflictResolver {
    let config = PortConfig::new(
        [ServicePortSpec::new("main", preferred, fallbacks, "Main API server")],
        [22, 80, 443],
    )
    .with_settle_delay(Duration::ZERO);
    ConflictResolver::new(config)
}

#[tokio::test]
async fn occupied_preferred_falls_back_then_recovers() {
    let (holder, preferred) = hold_port();
    let fallback = free_port();
    let resolver = resolver(preferred, vec![fallback]);

    assert!(resolver.check_port(preferred).await.in_use);

    let outcome = resolver.resolve("main", false).await.unwrap();
    assert_eq!(outcome.resolved_port, fallback);
    assert_eq!(outcome.method, ResolutionMethod::Fallback);
    assert_eq!(outcome.conflicts_encountered, vec![preferred]);

    drop(holder);
    let outcome = resolver.resolve("main", false).await.unwrap();
    assert_eq!(outcome.resolved_port, preferred);
    assert_eq!(outcome.method, ResolutionMethod::Preferred);
}

#[tokio::test]
async fn all_candidates_occupied_uses_dynamic_port() {
    let (_first, preferred) = hold_port();
    let (_second, fallback) = hold_port();
    let resolver = resolver(preferred, vec![fallback]);

    let outcome = resolver.resolve("main", false).await.unwrap();
    assert_eq!(outcome.method, ResolutionMethod::Dynamic);
    assert_ne!(outcome.resolved_port, preferred);
    assert_ne!(outcome.resolved_port, fallback);
    assert!(!resolver.config().is_reserved(outcome.resolved_port));

    // The dynamic port is released again for the caller to bind
    assert!(TcpListener::bind((Ipv4Addr::UNSPECIFIED, outcome.resolved_port)).is_ok());
}

#[tokio::test]
async fn report_flags_occupied_service() {
    let (_holder, preferred) = hold_port();
    let fallback = free_port();
    let resolver = resolver(preferred, vec![fallback]);

    let report = resolver.reporter().generate_report().await;
    let main = report.service("main").unwrap();
    assert!(!main.preferred_available);
    assert_eq!(main.recommended_port, Some(fallback));
    assert_eq!(report.conflicts.len(), 1);
}
