//! Heartbeat Integration Tests
//!
//! Runs watchdogs against real provider servers and checks that peer
//! availability follows the provider going down and coming back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ticketmesh_common::Peer;
use ticketmesh_heartbeat::{HeartbeatConfig, Pacemaker};
use ticketmesh_server::ProviderServer;

fn fast_config() -> HeartbeatConfig {
    HeartbeatConfig::new(Duration::from_millis(50), Duration::from_millis(100))
}

async fn start_provider(addr: &str) -> ProviderServer {
    let mut provider = ProviderServer::bind(addr, "heartbeat-test").await.unwrap();
    provider.start().unwrap();
    provider
}

/// Headroom for task scheduling on a loaded test machine.
const SCHEDULING_SLACK: Duration = Duration::from_millis(50);

/// Latest point after a provider changes state at which its peer must have
/// flipped: one full sleep plus one ping that runs out its timeout.
fn flip_deadline(config: &HeartbeatConfig) -> Duration {
    config.interval + config.timeout + SCHEDULING_SLACK
}

/// Polls `condition` until it holds or `deadline` has elapsed.
async fn within(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if started.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_availability_follows_provider() {
    let mut provider = start_provider("127.0.0.1:0").await;
    let addr = provider.local_addr().to_string();

    let peer = Arc::new(Peer::new(addr.clone()));
    let pacemaker = Pacemaker::new(fast_config(), 1).unwrap();
    pacemaker.add_client(peer.clone());

    // Healthy peer stays available and gets a response time.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(peer.is_available());

    provider.stop().await;
    assert!(within(flip_deadline(&fast_config()), || !peer.is_available()).await);

    let mut restarted = start_provider(&addr).await;
    assert!(within(flip_deadline(&fast_config()), || peer.is_available()).await);

    pacemaker.shutdown().await;
    restarted.stop().await;
}

#[tokio::test]
async fn test_multiple_workers_monitor_all_peers() {
    let mut providers = Vec::new();
    let mut peers = Vec::new();
    for _ in 0..4 {
        let provider = start_provider("127.0.0.1:0").await;
        peers.push(Arc::new(Peer::new(provider.local_addr().to_string())));
        providers.push(provider);
    }

    let pacemaker = Pacemaker::new(fast_config(), 2).unwrap();
    for peer in &peers {
        pacemaker.add_client(peer.clone());
    }
    assert_eq!(pacemaker.shard_sizes(), vec![2, 2]);

    providers[3].stop().await;
    assert!(within(flip_deadline(&fast_config()), || !peers[3].is_available()).await);
    assert!(peers[..3].iter().all(|peer| peer.is_available()));

    pacemaker.shutdown().await;
    for provider in &mut providers {
        provider.stop().await;
    }
}

#[tokio::test]
async fn test_removed_peer_no_longer_updated() {
    let mut provider = start_provider("127.0.0.1:0").await;
    let peer = Arc::new(Peer::new(provider.local_addr().to_string()));

    let pacemaker = Pacemaker::new(fast_config(), 1).unwrap();
    pacemaker.add_client(peer.clone());
    pacemaker.remove_client(&peer);
    tokio::time::sleep(Duration::from_millis(100)).await;

    provider.stop().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(peer.is_available());

    pacemaker.shutdown().await;
}
