/// Background cleanup of expired credentials
///
/// Periodically deletes tokens that expired or were revoked more than the
/// retention window ago, plus expired admin sessions. Runs until the
/// shutdown token is cancelled. An interval of 0 disables the sweeper.

use chrono::Duration;
use quill_shared::{auth::token, models::admin_session::AdminSession};
use sqlx::PgPool;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Sweeper settings
#[derive(Debug, Clone, Copy)]
pub struct SweeperConfig {
    /// Seconds between sweeps; 0 disables the sweeper
    pub interval_secs: u64,

    /// How long dead tokens are kept before deletion
    pub retention: Duration,
}

/// Counts from one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub tokens: u64,
    pub sessions: u64,
}

/// Runs one sweep
pub async fn sweep_once(pool: &PgPool, retention: Duration) -> Result<SweepReport, sqlx::Error> {
    let tokens = token::purge_stale(pool, retention).await?;
    let sessions = AdminSession::purge_expired(pool).await?;

    Ok(SweepReport { tokens, sessions })
}

/// Spawns the sweeper task
///
/// Returns None when the sweeper is disabled.
pub fn spawn(
    pool: PgPool,
    config: SweeperConfig,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if config.interval_secs == 0 {
        tracing::info!("Token sweeper disabled");
        return None;
    }

    Some(tokio::spawn(run(pool, config, shutdown)))
}

async fn run(pool: PgPool, config: SweeperConfig, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(config.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = config.interval_secs,
        retention_days = config.retention.num_days(),
        "Token sweeper started"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match sweep_once(&pool, config.retention).await {
            Ok(report) if report != SweepReport::default() => {
                tracing::info!(
                    tokens = report.tokens,
                    sessions = report.sessions,
                    "Purged stale credentials"
                );
            }
            Ok(_) => tracing::debug!("Sweep found nothing to purge"),
            Err(e) => tracing::error!(error = %e, "Sweep failed"),
        }
    }

    tracing::info!("Token sweeper stopped");
}
