#![cfg(feature = "test-utils")]

use std::sync::Arc;
use std::time::Duration;

use alerts::badge::BadgeSynchronizer;
use alerts::concurrency::shutdown::create_shutdown_channel;
use alerts::concurrency::signal::{SignalRx, create_signal};
use alerts::feed::{ChangeFeedListener, SubscriptionState};
use alerts::notifications::{
    IncidentRecord, IncidentStatus, MemoryNotificationSource, NotificationKind, Severity,
};
use alerts::pipeline::NotificationPipeline;
use alerts::storage::MemoryStore;
use alerts::test_utils::badge::RecordingBadge;
use alerts::test_utils::clock::MockClock;
use alerts::test_utils::notify::{DEFAULT_WAIT_TIMEOUT, wait_for};
use alerts::test_utils::realtime::MockRealtimeServer;
use alerts_config::shared::{RealtimeConfig, ReconnectionConfig};
use alerts_telemetry::tracing::init_test_tracing;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

fn realtime_config(url: String) -> RealtimeConfig {
    RealtimeConfig {
        heartbeat_interval_ms: 60_000,
        reconnection: ReconnectionConfig {
            initial_retry_delay_ms: 10,
            max_retry_delay_ms: 50,
            backoff_multiplier: 2.0,
        },
        ..RealtimeConfig::new(url, "anon-key")
    }
}

async fn expect_signal(change_rx: &mut SignalRx) {
    timeout(DEFAULT_WAIT_TIMEOUT, change_rx.changed())
        .await
        .expect("no change signal in time")
        .unwrap();
}

fn incident(id: &str, minutes_ago: i64) -> IncidentRecord {
    IncidentRecord {
        id: id.to_owned(),
        title: format!("Hendelse {id}"),
        description: None,
        place: Some("Trondheim".to_owned()),
        severity: Severity::High,
        status: IncidentStatus::Ongoing,
        central_id: Some("110-midt".to_owned()),
        region_id: Some("50".to_owned()),
        category_id: None,
        created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
        updated_at: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_joins_and_signals_matching_changes() {
    init_test_tracing();
    let mut server = MockRealtimeServer::start().await;
    let (change_tx, mut change_rx) = create_signal();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let handle =
        ChangeFeedListener::new(realtime_config(server.url()), change_tx, shutdown_rx).start();
    let mut state_rx = handle.state();

    let mut connection = server.accept().await;
    let join = connection.expect_join().await;
    assert_eq!(join.topic, "realtime:incident-changes");
    assert_eq!(join.payload["access_token"], "anon-key");
    let filters = join.payload["config"]["postgres_changes"].as_array().unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0]["table"], "incidents");
    assert_eq!(filters[1]["table"], "incident_updates");

    connection.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;
    // Joining triggers a refetch for changes missed while disconnected.
    expect_signal(&mut change_rx).await;

    connection
        .send_change(&join.topic, "incidents", "INSERT")
        .await;
    expect_signal(&mut change_rx).await;

    connection
        .send_change(&join.topic, "incident_updates", "UPDATE")
        .await;
    expect_signal(&mut change_rx).await;

    connection
        .send_change(&join.topic, "unrelated", "DELETE")
        .await;
    sleep(Duration::from_millis(200)).await;
    assert!(!change_rx.has_changed().unwrap());

    shutdown_tx.shutdown();
    let leave = connection.recv().await.expect("listener should leave the channel");
    assert_eq!(leave.event, "phx_leave");
    assert_eq!(leave.join_ref, join.join_ref);

    handle.wait().await;
    assert_eq!(*state_rx.borrow(), SubscriptionState::Unsubscribed);
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_reconnects_after_the_server_drops_it() {
    init_test_tracing();
    let mut server = MockRealtimeServer::start().await;
    let (change_tx, mut change_rx) = create_signal();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let handle =
        ChangeFeedListener::new(realtime_config(server.url()), change_tx, shutdown_rx).start();
    let mut state_rx = handle.state();

    let mut first = server.accept().await;
    let join = first.expect_join().await;
    first.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;
    expect_signal(&mut change_rx).await;

    first.close().await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Reconnecting).await;

    let mut second = server.accept().await;
    let join = second.expect_join().await;
    second.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;
    expect_signal(&mut change_rx).await;

    second.send_change(&join.topic, "incidents", "INSERT").await;
    expect_signal(&mut change_rx).await;

    shutdown_tx.shutdown();
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_reconnects_when_heartbeats_go_unanswered() {
    init_test_tracing();
    let mut server = MockRealtimeServer::start().await;
    let (change_tx, mut change_rx) = create_signal();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let config = RealtimeConfig {
        heartbeat_interval_ms: 50,
        ..realtime_config(server.url())
    };
    let handle = ChangeFeedListener::new(config, change_tx, shutdown_rx).start();
    let mut state_rx = handle.state();

    let mut silent = server.accept().await;
    let join = silent.expect_join().await;
    silent.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;
    expect_signal(&mut change_rx).await;

    // Answered heartbeats keep the subscription alive.
    for _ in 0..3 {
        let heartbeat = silent.expect_heartbeat().await;
        assert_eq!(heartbeat.topic, "phoenix");
        silent.reply(&heartbeat, "ok").await;
    }
    assert_eq!(*state_rx.borrow(), SubscriptionState::Subscribed);

    // The socket stays open but nothing is answered anymore.
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Reconnecting).await;

    let mut second = server.accept().await;
    let join = second.expect_join().await;
    second.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;
    expect_signal(&mut change_rx).await;

    shutdown_tx.shutdown();
    handle.wait().await;
    drop(silent);
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_retries_a_rejected_join_and_channel_errors() {
    init_test_tracing();
    let mut server = MockRealtimeServer::start().await;
    let (change_tx, mut change_rx) = create_signal();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    let handle =
        ChangeFeedListener::new(realtime_config(server.url()), change_tx, shutdown_rx).start();
    let mut state_rx = handle.state();

    let mut rejected = server.accept().await;
    let join = rejected.expect_join().await;
    rejected.reply(&join, "error").await;

    let mut errored = server.accept().await;
    let join = errored.expect_join().await;
    errored.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;
    expect_signal(&mut change_rx).await;

    errored
        .send(serde_json::json!({
            "event": "phx_error",
            "payload": {},
            "ref": join.join_ref,
            "topic": join.topic,
        }))
        .await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Reconnecting).await;

    let mut recovered = server.accept().await;
    let join = recovered.expect_join().await;
    recovered.reply(&join, "ok").await;
    wait_for(&mut state_rx, |state| *state == SubscriptionState::Subscribed).await;

    shutdown_tx.shutdown();
    handle.wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_keeps_retrying_an_unreachable_server_until_shutdown() {
    init_test_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (change_tx, _change_rx) = create_signal();
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let handle = ChangeFeedListener::new(
        realtime_config(format!("ws://{addr}/realtime/v1/websocket")),
        change_tx,
        shutdown_rx,
    )
    .start();
    let mut state_rx = handle.state();

    wait_for(&mut state_rx, |state| *state == SubscriptionState::Reconnecting).await;
    // Several backoff periods pass without the listener giving up.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(*state_rx.borrow(), SubscriptionState::Reconnecting);

    shutdown_tx.shutdown();
    timeout(DEFAULT_WAIT_TIMEOUT, handle.wait())
        .await
        .expect("listener should stop on shutdown");
    assert_eq!(*state_rx.borrow(), SubscriptionState::Unsubscribed);
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_refreshes_the_feed_on_changes_and_badge_clears() {
    init_test_tracing();
    let mut server = MockRealtimeServer::start().await;

    let source = MemoryNotificationSource::new();
    source.push_incident(incident("1", 30)).await;

    let clock = MockClock::new();
    let badge = BadgeSynchronizer::load(
        MemoryStore::new(),
        Arc::new(RecordingBadge::new()),
        Arc::new(clock.clone()),
    )
    .await
    .unwrap();

    let mut pipeline = NotificationPipeline::new(
        realtime_config(server.url()),
        Arc::new(source.clone()),
        badge.subscribe(),
    )
    .unwrap();
    let mut feed_rx = pipeline.feed();
    let mut subscription_rx = pipeline.subscription_state();

    pipeline.start();
    pipeline.start();

    let feed = wait_for(&mut feed_rx, |feed| feed.len() == 1).await;
    assert_eq!(feed.unread_count(), 1);
    assert_eq!(feed.unread[0].id, "incident:1");
    assert_eq!(feed.unread[0].kind, NotificationKind::Incident);

    let mut connection = server.accept().await;
    let join = connection.expect_join().await;
    connection.reply(&join, "ok").await;
    wait_for(&mut subscription_rx, |state| {
        *state == SubscriptionState::Subscribed
    })
    .await;

    source.push_incident(incident("2", 5)).await;
    connection
        .send_change(&join.topic, "incidents", "INSERT")
        .await;

    let feed = wait_for(&mut feed_rx, |feed| feed.len() == 2).await;
    assert_eq!(feed.unread_count(), 2);
    assert_eq!(feed.unread[0].id, "incident:2");

    // Clearing the badge moves everything to read without another fetch.
    sleep(Duration::from_millis(100)).await;
    let fetches = source.fetch_count();
    badge.clear().await;
    let feed = wait_for(&mut feed_rx, |feed| feed.unread_count() == 0).await;
    assert_eq!(feed.read.len(), 2);
    assert_eq!(source.fetch_count(), fetches);

    // A failing refetch keeps the last good feed.
    source.set_failing(true);
    source.push_incident(incident("3", 1)).await;
    connection
        .send_change(&join.topic, "incidents", "INSERT")
        .await;
    timeout(DEFAULT_WAIT_TIMEOUT, async {
        while source.fetch_count() == fetches {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(feed_rx.borrow().len(), 2);

    pipeline.shutdown_and_wait().await;
    assert_eq!(*subscription_rx.borrow(), SubscriptionState::Unsubscribed);
}

#[tokio::test]
async fn pipeline_rejects_a_config_without_tables() {
    init_test_tracing();
    let config = RealtimeConfig {
        tables: Vec::new(),
        ..RealtimeConfig::new("ws://localhost/realtime/v1/websocket", "anon-key")
    };
    let (_state_tx, state_rx) = tokio::sync::watch::channel(Default::default());

    let result = NotificationPipeline::new(
        config,
        Arc::new(MemoryNotificationSource::new()),
        state_rx,
    );

    assert_eq!(
        result.err().map(|err| err.kind()),
        Some(alerts::error::ErrorKind::ConfigError)
    );
}
