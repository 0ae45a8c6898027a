//! Pulse-train polling task
//!
//! Drains every decode channel in config order and logs a report for
//! each one that had data. After a pass with no data the task sleeps for
//! the configured backoff; after a productive pass it only yields, so a
//! burst of trains is picked up as fast as the executor allows.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::peripherals::PIO0;
use embassy_time::Delay;
use heapless::Vec;

use pulsetally_core::channel::{Channel, CycleOutcome, Poller, Report, ReportSink};
use pulsetally_core::config::{ChannelConfig, PollConfig, MAX_CHANNELS};
use pulsetally_hal_rp2040::PioDecodeUnit;

/// A channel on PIO0
pub type DecodeChannel = Channel<PioDecodeUnit<'static, PIO0>>;

/// Log idle statistics every this many idle cycles
const IDLE_LOG_INTERVAL: u32 = 1000;

/// Report sink that writes to the defmt log
struct LogSink {
    channels: Vec<ChannelConfig, MAX_CHANNELS>,
}

impl LogSink {
    fn name(&self, line: u8) -> &str {
        self.channels
            .iter()
            .find(|c| c.pin == line)
            .map(|c| c.name.as_str())
            .unwrap_or("?")
    }
}

impl ReportSink for LogSink {
    fn emit(&mut self, report: &Report) {
        let name = self.name(report.line_id);

        if report.overflowed {
            warn!(
                "{} (gpio{}): RX FIFO overflowed, trains were lost",
                name, report.line_id
            );
        }

        info!(
            "{} (gpio{}): report {} current={} cumulative={}",
            name, report.line_id, report.report_count, report.current, report.cumulative
        );
    }
}

/// Polling task for all decode channels
///
/// Channels must already be configured and have had their queues
/// cleared.
#[embassy_executor::task]
pub async fn poll_task(
    mut channels: Vec<DecodeChannel, MAX_CHANNELS>,
    names: Vec<ChannelConfig, MAX_CHANNELS>,
    config: PollConfig,
) {
    info!("Poll task started with {} channel(s)", channels.len());

    let mut poller = Poller::new(config.backoff_ms);
    let mut sink = LogSink { channels: names };
    let mut delay = Delay;

    loop {
        match poller.step(&mut channels, &mut sink, &mut delay).await {
            CycleOutcome::Active(count) => {
                trace!("{} channel(s) had data", count);
                yield_now().await;
            }
            CycleOutcome::Idle => {
                trace!("No data, backed off {}ms", poller.backoff_ms());
                let stats = poller.stats();
                if stats.idle_cycles % IDLE_LOG_INTERVAL == 0 {
                    debug!(
                        "Waiting for pulses: {} cycles, {} idle, {} reports",
                        stats.cycles, stats.idle_cycles, stats.reports
                    );
                }
            }
        }
    }
}
