//! Polling driver
//!
//! Services every channel from a single control flow. Each cycle tries
//! every channel once, in the order given. An empty channel is skipped
//! without holding up the others. When a whole cycle produced nothing the
//! driver sleeps for the backoff interval; otherwise it goes straight into
//! the next cycle.

use embedded_hal_async::delay::DelayNs;

use crate::traits::DecodeUnit;

use super::counter::{Channel, Report};

/// Default sleep after an idle cycle
pub const DEFAULT_BACKOFF_MS: u32 = 10;

/// Destination for drain reports
pub trait ReportSink {
    /// Handle one report; called in channel order within a cycle
    fn emit(&mut self, report: &Report);
}

impl<F: FnMut(&Report)> ReportSink for F {
    fn emit(&mut self, report: &Report) {
        self(report)
    }
}

/// Result of one pass over all channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// At least one channel produced data; poll again immediately
    Active(u8),
    /// No channel had data; back off before the next pass
    Idle,
}

impl CycleOutcome {
    /// Check whether the driver should sleep before the next cycle
    pub fn is_idle(&self) -> bool {
        matches!(self, CycleOutcome::Idle)
    }
}

/// Running statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollStats {
    /// Completed cycles
    pub cycles: u32,
    /// Cycles in which no channel had data
    pub idle_cycles: u32,
    /// Reports emitted
    pub reports: u32,
}

/// Polling driver
#[derive(Debug, Clone)]
pub struct Poller {
    backoff_ms: u32,
    stats: PollStats,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_MS)
    }
}

impl Poller {
    /// Create a poller that sleeps `backoff_ms` after an idle cycle
    pub fn new(backoff_ms: u32) -> Self {
        Self {
            backoff_ms,
            stats: PollStats::default(),
        }
    }

    /// Backoff interval in milliseconds
    pub fn backoff_ms(&self) -> u32 {
        self.backoff_ms
    }

    /// Statistics so far
    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Drain every channel once, reporting each one that had data
    pub fn cycle<U, S>(&mut self, channels: &mut [Channel<U>], sink: &mut S) -> CycleOutcome
    where
        U: DecodeUnit,
        S: ReportSink + ?Sized,
    {
        let mut active: u8 = 0;

        for channel in channels.iter_mut() {
            if channel.drain() {
                sink.emit(&channel.report());
                active = active.saturating_add(1);
            }
        }

        self.stats.cycles = self.stats.cycles.wrapping_add(1);
        self.stats.reports = self.stats.reports.wrapping_add(active as u32);

        if active == 0 {
            self.stats.idle_cycles = self.stats.idle_cycles.wrapping_add(1);
            CycleOutcome::Idle
        } else {
            CycleOutcome::Active(active)
        }
    }

    /// Run one cycle and, if it was idle, sleep for the backoff interval
    pub async fn step<U, S, D>(
        &mut self,
        channels: &mut [Channel<U>],
        sink: &mut S,
        delay: &mut D,
    ) -> CycleOutcome
    where
        U: DecodeUnit,
        S: ReportSink + ?Sized,
        D: DelayNs,
    {
        let outcome = self.cycle(channels, sink);
        if outcome.is_idle() {
            delay.delay_ms(self.backoff_ms).await;
        }
        outcome
    }

    /// Poll forever
    pub async fn run<U, S, D>(&mut self, channels: &mut [Channel<U>], sink: &mut S, delay: &mut D)
    where
        U: DecodeUnit,
        S: ReportSink + ?Sized,
        D: DelayNs,
    {
        loop {
            self.step(channels, sink, delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::{MockLine, MockUnit};
    use embassy_futures::block_on;

    fn channel(line: &MockLine, line_id: u8, instance: u8) -> Channel<MockUnit<'_>> {
        Channel::from_unit(
            line_id,
            instance,
            MockUnit {
                line,
                instance,
                program: 0,
                clears: 0,
            },
        )
    }

    /// Records the sleeps requested by the poller
    #[derive(Default)]
    struct RecordingDelay {
        sleeps_ms: u32,
        calls: u32,
    }

    impl DelayNs for RecordingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.calls += 1;
            self.sleeps_ms += ns / 1_000_000;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.calls += 1;
            self.sleeps_ms += ms;
        }
    }

    #[test]
    fn test_only_active_channel_reports() {
        let line_a = MockLine::with(&[1]);
        let line_b = MockLine::new();
        let mut channels = [channel(&line_a, 2, 0), channel(&line_b, 3, 1)];
        let mut poller = Poller::default();
        let mut seen: Vec<Report> = Vec::new();

        let outcome = poller.cycle(&mut channels, &mut |r: &Report| seen.push(*r));

        assert_eq!(outcome, CycleOutcome::Active(1));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].line_id, 2);
        assert_eq!(seen[0].current, 1);
        assert_eq!(seen[0].cumulative, 1);
        assert_eq!(seen[0].report_count, 1);
    }

    #[test]
    fn test_reports_follow_channel_order() {
        let line_a = MockLine::with(&[4]);
        let line_b = MockLine::with(&[6]);
        let line_c = MockLine::with(&[8]);
        let mut channels = [
            channel(&line_c, 9, 2),
            channel(&line_a, 5, 0),
            channel(&line_b, 7, 1),
        ];
        let mut poller = Poller::default();
        let mut order: Vec<u8> = Vec::new();

        let outcome = poller.cycle(&mut channels, &mut |r: &Report| order.push(r.line_id));

        assert_eq!(outcome, CycleOutcome::Active(3));
        assert_eq!(order, [9, 5, 7]);
    }

    #[test]
    fn test_idle_channel_does_not_block_later_ones() {
        let line_a = MockLine::new();
        let line_b = MockLine::with(&[3]);
        let mut channels = [channel(&line_a, 1, 0), channel(&line_b, 2, 1)];
        let mut poller = Poller::default();
        let mut seen: Vec<u8> = Vec::new();

        poller.cycle(&mut channels, &mut |r: &Report| seen.push(r.line_id));

        assert_eq!(seen, [2]);
        assert_eq!(channels[0].report_count(), 0);
    }

    #[test]
    fn test_idle_cycle_backs_off() {
        let line = MockLine::new();
        let mut channels = [channel(&line, 1, 0)];
        let mut poller = Poller::new(25);
        let mut delay = RecordingDelay::default();
        let mut reports = 0;

        let outcome = block_on(poller.step(&mut channels, &mut |_: &Report| reports += 1, &mut delay));

        assert_eq!(outcome, CycleOutcome::Idle);
        assert_eq!(reports, 0);
        assert_eq!(delay.calls, 1);
        assert_eq!(delay.sleeps_ms, 25);
        assert_eq!(poller.stats().idle_cycles, 1);
    }

    #[test]
    fn test_active_cycle_does_not_sleep() {
        let line = MockLine::with(&[2]);
        let mut channels = [channel(&line, 1, 0)];
        let mut poller = Poller::new(25);
        let mut delay = RecordingDelay::default();
        let mut count = 0;

        let outcome = block_on(poller.step(&mut channels, &mut |_: &Report| count += 1, &mut delay));

        assert_eq!(outcome, CycleOutcome::Active(1));
        assert_eq!(count, 1);
        assert_eq!(delay.calls, 0);
    }

    #[test]
    fn test_stats() {
        let line = MockLine::new();
        let mut channels = [channel(&line, 1, 0)];
        let mut poller = Poller::default();
        let mut sink = |_: &Report| {};

        poller.cycle(&mut channels, &mut sink);
        line.push(&[5, 5]);
        poller.cycle(&mut channels, &mut sink);
        poller.cycle(&mut channels, &mut sink);

        assert_eq!(
            poller.stats(),
            PollStats {
                cycles: 3,
                idle_cycles: 2,
                reports: 1,
            }
        );
    }
}
