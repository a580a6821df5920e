//! Connection reuse and concurrency limits seen from the server side.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockTsdb, test_config};
use tsdb_driver::Result;
use tsdb_driver::prelude::*;

const VERSION_REPLY: &str = r#"{"version":"2.2.0"}"#;

fn started(server: &MockTsdb, config: Configuration) -> Arc<Session> {
    let session = Arc::new(Session::new("127.0.0.1", server.port(), Arc::new(config)));
    session.start().unwrap();
    session
}

async fn sequential_versions(session: &Session, calls: usize) {
    for _ in 0..calls {
        assert_eq!(session.version().await.unwrap(), TsdbVersion::V2_2);
        // Give the client time to check the connection back into its pool.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Fire `calls` version requests at once and collect every outcome.
async fn concurrent_versions(session: &Arc<Session>, calls: usize) -> Vec<Result<TsdbVersion>> {
    let handles: Vec<_> = (0..calls)
        .map(|_| {
            let session = Arc::clone(session);
            tokio::spawn(async move { session.version().await })
        })
        .collect();
    let mut outcomes = Vec::with_capacity(calls);
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}

// ── Reuse ──────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn zero_keep_alive_opens_a_connection_per_call() {
    let server = MockTsdb::start().await;
    server.always(200, VERSION_REPLY);
    let session = started(&server, test_config().with_keep_alive(Some(Duration::ZERO)));

    sequential_versions(&session, 3).await;
    assert_eq!(server.hits(), 3);
    assert_eq!(server.peers().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn keep_alive_period_reuses_the_connection() {
    let server = MockTsdb::start().await;
    server.always(200, VERSION_REPLY);
    let session = started(&server, test_config().with_keep_alive(Some(Duration::from_secs(30))));

    sequential_versions(&session, 3).await;
    assert_eq!(server.hits(), 3);
    assert_eq!(server.peers().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_default_keep_alive_reuses_the_connection() {
    let server = MockTsdb::start().await;
    server.always(200, VERSION_REPLY);
    let session = started(&server, test_config().with_keep_alive(None));

    sequential_versions(&session, 3).await;
    assert_eq!(server.peers().len(), 1);
}

// ── Limits ─────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn in_flight_requests_are_capped_at_max_route() {
    let server = MockTsdb::start().await;
    server.always(200, VERSION_REPLY).delay(Duration::from_millis(200));
    let session = started(&server, test_config().with_pool_size(16).with_max_route(2));

    let outcomes = concurrent_versions(&session, 8).await;
    assert!(outcomes.iter().all(|o| o.is_ok()), "{outcomes:?}");
    assert_eq!(server.hits(), 8);
    assert_eq!(server.peak_in_flight(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn in_flight_requests_are_capped_at_pool_size() {
    let server = MockTsdb::start().await;
    server.always(200, VERSION_REPLY).delay(Duration::from_millis(200));
    let session = started(&server, test_config().with_pool_size(3).with_max_route(3));

    let outcomes = concurrent_versions(&session, 6).await;
    assert!(outcomes.iter().all(|o| o.is_ok()), "{outcomes:?}");
    assert_eq!(server.peak_in_flight(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn waiting_for_a_connection_is_bounded_by_the_connect_timeout() {
    let server = MockTsdb::start().await;
    server.always(200, VERSION_REPLY).delay(Duration::from_secs(1));
    let config = test_config()
        .with_pool_size(1)
        .with_max_route(1)
        .with_connect_timeout(Duration::from_millis(100))
        .with_query_retries(0);
    let session = started(&server, config);

    let outcomes = concurrent_versions(&session, 2).await;
    let served = outcomes.iter().filter(|o| o.is_ok()).count();
    let starved = outcomes
        .iter()
        .filter(|o| matches!(o, Err(DriverError::Io(_))))
        .count();
    assert_eq!((served, starved), (1, 1), "{outcomes:?}");
    assert_eq!(server.hits(), 1);
}
