//! Consumer side of the channel: reads frames, stores every reading and
//! keeps hourly/daily averages.

mod aggregate;
mod frames;
mod rollup;

pub use aggregate::AggregateWindow;
pub use frames::{parse_frame, FrameBuffer, MAX_PARTIAL_FRAME};
pub use rollup::{format_daily, format_hourly, format_reading, LogFiles};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, Utc};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    channel::{Channel, ChannelError, Ports},
    config::{ChannelConfig, LoggerConfig},
    db::Database,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Bytes read from the channel per poll.
pub const READ_BUFFER_SIZE: usize = 64;

/// Turns channel bytes into stored readings and rollup lines.
pub struct TemperatureLogger {
    db: Database,
    logs: LogFiles,
    frames: FrameBuffer,
    hourly: AggregateWindow,
    daily: AggregateWindow,
}

impl TemperatureLogger {
    pub fn new(db: Database, logs: LogFiles, now: DateTime<Utc>) -> Self {
        Self {
            db,
            logs,
            frames: FrameBuffer::new(),
            hourly: AggregateWindow::hourly(now),
            daily: AggregateWindow::daily(now),
        }
    }

    /// Feeds raw channel bytes through the pipeline. Returns how many
    /// readings were stored.
    pub async fn ingest(&mut self, bytes: &[u8], now: DateTime<Utc>) -> usize {
        let mut stored = 0;
        for frame in self.frames.push(bytes) {
            let Some(value) = parse_frame(&frame) else {
                log_debug!("discarding unparsable frame {frame:?}");
                continue;
            };

            match self.record(value, now).await {
                Ok(()) => stored += 1,
                Err(err) => log_error!("failed to record reading {value}: {err:?}"),
            }
        }
        stored
    }

    async fn record(&mut self, value: f64, now: DateTime<Utc>) -> Result<()> {
        self.db
            .insert_reading(value)
            .await
            .context("failed to persist reading")?;

        if let Err(err) = self
            .logs
            .append_reading(now.with_timezone(&Local).naive_local(), value)
        {
            log_warn!("raw log write failed: {err:?}");
        }

        self.hourly.observe(value);
        self.daily.observe(value);
        log_info!("Read temperature {value:.6}");
        Ok(())
    }

    /// Flushes and resets every window whose length has elapsed. Windows are
    /// reset even when writing their line fails.
    pub fn roll_windows(&mut self, now: DateTime<Utc>) -> Result<()> {
        let local = now.with_timezone(&Local).naive_local();
        let mut result = Ok(());

        if self.hourly.is_due(now) {
            if let Some(average) = self.hourly.flush(now) {
                log_info!("Hourly average {average:.6}");
                result = result.and(self.logs.append_hourly(local, average));
            }
        }

        if self.daily.is_due(now) {
            if let Some(average) = self.daily.flush(now) {
                log_info!("Daily average {average:.6}");
                result = result.and(self.logs.append_daily(local, average));
            }
        }

        result
    }

    pub fn hourly(&self) -> &AggregateWindow {
        &self.hourly
    }

    pub fn daily(&self) -> &AggregateWindow {
        &self.daily
    }
}

/// Opens the logger's port and polls it until `cancel_token` fires.
pub async fn run_logger(
    ports: Ports,
    channel_config: ChannelConfig,
    config: LoggerConfig,
    db: Database,
    cancel_token: CancellationToken,
) -> Result<()> {
    let logs = LogFiles::new(config.raw_log, config.hourly_log, config.daily_log)?;

    let port = channel_config.logger_port.clone();
    let baud_rate = channel_config.baud_rate;
    let channel = tokio::task::spawn_blocking(move || ports.open(&port, baud_rate))
        .await
        .context("channel open worker join failed")?
        .with_context(|| format!("logger cannot open {}", channel_config.logger_port))?;

    let logger = TemperatureLogger::new(db, logs, Utc::now());
    logger_loop(
        channel,
        logger,
        Duration::from_millis(config.poll_interval_ms),
        cancel_token,
    )
    .await
}

pub async fn logger_loop<C: Channel + 'static>(
    mut channel: C,
    mut logger: TemperatureLogger,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) -> Result<()> {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (returned, buf, read) = tokio::task::spawn_blocking(move || {
                    let mut buf = [0u8; READ_BUFFER_SIZE];
                    let read = channel.read(&mut buf);
                    (channel, buf, read)
                })
                .await
                .context("channel read worker join failed")?;
                channel = returned;

                let now = Utc::now();
                match read {
                    Ok(0) => {}
                    Ok(n) => {
                        logger.ingest(&buf[..n], now).await;
                    }
                    Err(ChannelError::Closed(name)) => {
                        break Err(anyhow!("channel {name} closed while logging"));
                    }
                    Err(err) => log_warn!("read from {} failed: {err}", channel.name()),
                }

                if let Err(err) = logger.roll_windows(now) {
                    log_error!("rollup write failed: {err:?}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("logger loop shutting down");
                break Ok(());
            }
        }
    };

    channel.close();
    outcome
}
