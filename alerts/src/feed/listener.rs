use std::time::Duration;

use alerts_config::shared::RealtimeConfig;
use rand::Rng;
use secrecy::ExposeSecret;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

use crate::bail;
use crate::concurrency::shutdown::ShutdownRx;
use crate::concurrency::signal::SignalTx;
use crate::error::{AlertsResult, ErrorKind};
use crate::feed::connection::RealtimeConnection;
use crate::feed::encoding::{
    InboundMessage, build_heartbeat_message, build_join_message, build_leave_message,
    build_topic, parse_message,
};

/// Lifecycle of the change feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Not started yet.
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Joined and receiving changes.
    Subscribed,
    /// Lost the connection and retrying.
    Reconnecting,
    /// Stopped for good.
    Unsubscribed,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::Disconnected => "disconnected",
            SubscriptionState::Connecting => "connecting",
            SubscriptionState::Subscribed => "subscribed",
            SubscriptionState::Reconnecting => "reconnecting",
            SubscriptionState::Unsubscribed => "unsubscribed",
        }
    }
}

/// Monotonic message reference counter for one connection.
#[derive(Debug, Default)]
struct RefCounter(u64);

impl RefCounter {
    fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

/// Handle to a running [`ChangeFeedListener`].
#[derive(Debug)]
pub struct ChangeFeedHandle {
    join_handle: JoinHandle<()>,
    state_rx: watch::Receiver<SubscriptionState>,
}

impl ChangeFeedHandle {
    pub fn state(&self) -> watch::Receiver<SubscriptionState> {
        self.state_rx.clone()
    }

    /// Waits for the listener to stop. It only stops on shutdown.
    pub async fn wait(self) {
        if let Err(err) = self.join_handle.await {
            error!(error = %err, "change feed listener task panicked");
        }
    }
}

/// Subscribes to row changes and turns each one into a refetch signal.
///
/// A signal is also sent every time the channel is (re)joined, since changes made while
/// disconnected are not replayed.
pub struct ChangeFeedListener {
    config: RealtimeConfig,
    change_tx: SignalTx,
    shutdown_rx: ShutdownRx,
    state_tx: watch::Sender<SubscriptionState>,
}

impl ChangeFeedListener {
    pub fn new(config: RealtimeConfig, change_tx: SignalTx, shutdown_rx: ShutdownRx) -> Self {
        let (state_tx, _) = watch::channel(SubscriptionState::Disconnected);

        Self {
            config,
            change_tx,
            shutdown_rx,
            state_tx,
        }
    }

    pub fn state(&self) -> watch::Receiver<SubscriptionState> {
        self.state_tx.subscribe()
    }

    pub fn start(self) -> ChangeFeedHandle {
        let state_rx = self.state();
        let join_handle = tokio::spawn(self.run());

        ChangeFeedHandle {
            join_handle,
            state_rx,
        }
    }

    async fn run(mut self) {
        info!(
            channel = %self.config.channel,
            tables = ?self.config.tables,
            "starting change feed listener"
        );

        let mut attempt = 0u32;
        self.update_state(SubscriptionState::Connecting);

        loop {
            if self.shutdown_rx.is_shutdown() {
                break;
            }

            match self.connect_and_listen(&mut attempt).await {
                Ok(()) => break,
                Err(err) => {
                    let backoff = with_jitter(self.config.reconnection.backoff(attempt));
                    attempt = attempt.saturating_add(1);
                    self.update_state(SubscriptionState::Reconnecting);

                    let backoff_ms = backoff.as_millis() as u64;
                    if err.kind().is_transient() {
                        warn!(
                            error = %err,
                            attempt,
                            backoff_ms,
                            "change feed connection lost, reconnecting after backoff"
                        );
                    } else {
                        error!(
                            error = %err,
                            attempt,
                            backoff_ms,
                            "change feed failed unexpectedly, reconnecting after backoff"
                        );
                    }

                    tokio::select! {
                        _ = sleep(backoff) => {}
                        _ = self.shutdown_rx.wait_for_shutdown() => break,
                    }
                }
            }
        }

        self.update_state(SubscriptionState::Unsubscribed);
        info!("change feed listener stopped");
    }

    /// Runs one connection until shutdown (`Ok`) or a transport failure (`Err`).
    async fn connect_and_listen(&mut self, attempt: &mut u32) -> AlertsResult<()> {
        let api_key = self.config.api_key.expose_secret();
        let mut connection = RealtimeConnection::connect(&self.config.url, api_key).await?;

        let mut refs = RefCounter::default();
        let topic = build_topic(&self.config.channel);
        let join_ref = refs.next();
        connection
            .send(&build_join_message(
                &topic,
                &self.config.schema,
                &self.config.tables,
                api_key,
                &join_ref,
            ))
            .await?;

        let mut heartbeat = interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        heartbeat.tick().await;
        // Ref of the last heartbeat the server has not answered yet.
        let mut pending_heartbeat: Option<String> = None;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait_for_shutdown() => {
                    let leave = build_leave_message(&topic, &refs.next(), &join_ref);
                    if let Err(err) = connection.send(&leave).await {
                        debug!(error = %err, "failed to leave Realtime channel");
                    }
                    connection.close().await;

                    return Ok(());
                }
                _ = heartbeat.tick() => {
                    if let Some(heartbeat_ref) = pending_heartbeat.take() {
                        bail!(
                            ErrorKind::SubscriptionTransportError,
                            "Realtime stopped answering heartbeats",
                            format!("no reply to heartbeat {heartbeat_ref}")
                        );
                    }

                    let heartbeat_ref = refs.next();
                    connection.send(&build_heartbeat_message(&heartbeat_ref)).await?;
                    pending_heartbeat = Some(heartbeat_ref);
                }
                message = connection.recv() => {
                    let Some(text) = message? else {
                        bail!(
                            ErrorKind::SubscriptionTransportError,
                            "Realtime closed the connection"
                        );
                    };

                    self.handle_message(&topic, &join_ref, &text, attempt, &mut pending_heartbeat)?;
                }
            }
        }
    }

    fn handle_message(
        &self,
        topic: &str,
        join_ref: &str,
        text: &str,
        attempt: &mut u32,
        pending_heartbeat: &mut Option<String>,
    ) -> AlertsResult<()> {
        let message = match parse_message(topic, text) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, "ignoring undecodable Realtime frame");
                return Ok(());
            }
        };

        match message {
            InboundMessage::Reply {
                msg_ref, ok, response,
            } if msg_ref.as_deref() == Some(join_ref) => {
                if !ok {
                    bail!(
                        ErrorKind::SubscriptionRejected,
                        "Realtime rejected the channel join",
                        response.to_string()
                    );
                }

                *attempt = 0;
                self.update_state(SubscriptionState::Subscribed);
                info!(topic, "subscribed to change feed");
                self.change_tx.send_replace(());
            }
            InboundMessage::Reply { msg_ref, .. } => {
                if msg_ref.is_some() && msg_ref == *pending_heartbeat {
                    *pending_heartbeat = None;
                }
            }
            InboundMessage::PostgresChange { table, change_type } => {
                let subscribed = table
                    .as_ref()
                    .is_none_or(|table| self.config.tables.contains(table));

                if subscribed {
                    debug!(?table, ?change_type, "change feed event");
                    self.change_tx.send_replace(());
                }
            }
            InboundMessage::System { ok: true, message } => {
                debug!(%message, "Realtime system message");
            }
            InboundMessage::System { ok: false, message } => {
                bail!(
                    ErrorKind::SubscriptionRejected,
                    "Realtime reported a channel error",
                    message
                );
            }
            InboundMessage::ChannelError => {
                bail!(
                    ErrorKind::SubscriptionTransportError,
                    "Realtime channel errored"
                );
            }
            InboundMessage::ChannelClosed => {
                bail!(
                    ErrorKind::SubscriptionTransportError,
                    "Realtime channel closed"
                );
            }
            InboundMessage::Other { .. } => {}
        }

        Ok(())
    }

    fn update_state(&self, state: SubscriptionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(
                from = previous.as_str(),
                to = state.as_str(),
                "change feed state changed"
            );
        }
    }
}

/// Adds up to 30% random jitter so clients dropped together do not reconnect together.
fn with_jitter(backoff: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.0..=0.3);
    backoff.mul_f64(1.0 + factor)
}
