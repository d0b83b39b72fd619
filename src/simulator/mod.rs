//! Producer side of the channel: a simulated thermometer.

mod source;

pub use source::{format_frame, TemperatureSource};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    channel::{Channel, Ports},
    config::{ChannelConfig, SimulatorConfig},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub struct Simulator {
    port: String,
    baud_rate: u32,
    interval: Duration,
    deadline: Option<DateTime<Utc>>,
    source: TemperatureSource,
}

impl Simulator {
    pub fn from_config(channel: &ChannelConfig, config: &SimulatorConfig) -> Result<Self> {
        let source = TemperatureSource::new(config.min, config.max, config.smoothing)
            .context("invalid simulator configuration")?;
        let deadline = config
            .run_for_secs
            .map(|secs| {
                i64::try_from(secs)
                    .ok()
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|length| Utc::now().checked_add_signed(length))
                    .with_context(|| format!("simulator run_for_secs {secs} is out of range"))
            })
            .transpose()?;

        Ok(Self {
            port: channel.simulator_port.clone(),
            baud_rate: channel.baud_rate,
            interval: Duration::from_millis(config.interval_ms),
            deadline,
            source,
        })
    }

    /// Opens the simulator's port and writes frames until cancelled or the
    /// deadline passes. Returns the number of frames written.
    pub async fn run(self, ports: Ports, cancel_token: CancellationToken) -> Result<u64> {
        let port = self.port.clone();
        let baud_rate = self.baud_rate;
        let channel = tokio::task::spawn_blocking(move || ports.open(&port, baud_rate))
            .await
            .context("channel open worker join failed")?
            .with_context(|| format!("simulator cannot open {}", self.port))?;

        simulator_loop(channel, self.source, self.interval, self.deadline, cancel_token).await
    }
}

pub async fn simulator_loop<C: Channel + 'static>(
    mut channel: C,
    mut source: TemperatureSource,
    interval: Duration,
    deadline: Option<DateTime<Utc>>,
    cancel_token: CancellationToken,
) -> Result<u64> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent = 0u64;

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if deadline.is_some_and(|end| Utc::now() >= end) {
                    log_info!("simulator reached its end time after {sent} frames");
                    break Ok(sent);
                }

                let frame = format_frame(source.next_value());
                let (returned, written) = tokio::task::spawn_blocking(move || {
                    let written = channel.write(frame.as_bytes());
                    (channel, written)
                })
                .await
                .context("channel write worker join failed")?;
                channel = returned;

                match written {
                    Ok(_) => {
                        sent += 1;
                        log_debug!("sent frame #{sent} to {}", channel.name());
                    }
                    // No retry: a broken channel ends the simulator.
                    Err(err) => {
                        break Err(anyhow::Error::new(err)
                            .context(format!("write to {} failed", channel.name())));
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("simulator loop shutting down after {sent} frames");
                break Ok(sent);
            }
        }
    };

    channel.close();
    outcome
}
