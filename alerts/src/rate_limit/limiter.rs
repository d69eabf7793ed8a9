use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use alerts_config::shared::RateLimitConfig;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::error::{AlertsResult, ErrorKind};
use crate::rate_limit::entry::RateLimitResult;
use crate::rate_limit::store::{MemoryRateLimitStore, RateLimitStore};
use crate::alerts_error;

/// Running sweeper task and the channel used to stop it.
#[derive(Debug)]
struct SweeperHandle {
    shutdown_tx: ShutdownTx,
    join_handle: JoinHandle<()>,
}

/// Sliding-window rate limiter with a pluggable store and clock.
///
/// The limiter is an explicitly owned component: [`RateLimiter::init`] starts the
/// background sweep that evicts idle identifiers, [`RateLimiter::shutdown`] stops it.
/// Checks work whether or not the sweeper is running.
#[derive(Debug)]
pub struct RateLimiter<S = MemoryRateLimitStore, C = SystemClock> {
    config: RateLimitConfig,
    store: S,
    clock: C,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl RateLimiter {
    /// Creates a limiter backed by a process-local store and the system clock.
    pub fn new(config: RateLimitConfig) -> AlertsResult<Self> {
        Self::with_store(config, MemoryRateLimitStore::new(), SystemClock)
    }
}

impl<S, C> RateLimiter<S, C>
where
    S: RateLimitStore + Clone + Send + Sync + 'static,
    C: Clock + Clone,
{
    /// Creates a limiter with an explicit store and clock.
    pub fn with_store(config: RateLimitConfig, store: S, clock: C) -> AlertsResult<Self> {
        config.validate().map_err(|err| {
            alerts_error!(
                ErrorKind::ConfigError,
                "invalid rate limit configuration",
                err.to_string(),
                source: err
            )
        })?;

        Ok(Self {
            config,
            store,
            clock,
            sweeper: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks and, when accepted, records a request for `identifier`.
    ///
    /// First-seen identifiers are always accepted.
    pub async fn check(&self, identifier: &str) -> AlertsResult<RateLimitResult> {
        let now = self.clock.now();
        let result = self.store.check(identifier, now, &self.config).await?;

        if !result.success {
            debug!(
                identifier,
                limit = result.limit,
                retry_after_ms = result.retry_after_ms,
                "rate limit exceeded"
            );
        }

        Ok(result)
    }

    /// Evicts identifiers with no requests left in the window.
    pub async fn sweep(&self) -> AlertsResult<usize> {
        sweep_store(&self.store, &self.clock, self.config.window()).await
    }

    /// Starts the periodic sweep. Calling it again while running is a no-op.
    pub fn init(&self) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_some() {
            debug!("rate limit sweeper already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let join_handle = tokio::spawn(run_sweeper(
            self.store.clone(),
            self.clock.clone(),
            self.config,
            shutdown_rx,
        ));

        info!(
            sweep_interval_ms = self.config.sweep_interval_ms,
            "rate limit sweeper started"
        );

        *sweeper = Some(SweeperHandle {
            shutdown_tx,
            join_handle,
        });
    }

    /// Stops the periodic sweep and waits for it to finish.
    pub async fn shutdown(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(handle) = handle else {
            return;
        };

        handle.shutdown_tx.shutdown();
        if let Err(err) = handle.join_handle.await {
            error!(error = %err, "rate limit sweeper task failed");
        }

        info!("rate limit sweeper stopped");
    }

    /// Returns `true` while the sweeper task is running.
    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

async fn sweep_store<S, C>(store: &S, clock: &C, window: Duration) -> AlertsResult<usize>
where
    S: RateLimitStore,
    C: Clock,
{
    let evicted = store.sweep(clock.now(), window).await?;
    if evicted > 0 {
        debug!(evicted, "evicted idle rate limit entries");
    }

    Ok(evicted)
}

async fn run_sweeper<S, C>(
    store: S,
    clock: C,
    config: RateLimitConfig,
    mut shutdown_rx: ShutdownRx,
) where
    S: RateLimitStore,
    C: Clock,
{
    let mut ticker = interval(config.sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.wait_for_shutdown() => return,
            _ = ticker.tick() => {
                if let Err(err) = sweep_store(&store, &clock, config.window()).await {
                    warn!(error = %err, "rate limit sweep failed");
                }
            }
        }
    }
}
