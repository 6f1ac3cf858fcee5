// ABOUTME: SSMI link-check scheduling for keeping an authenticated session alive
// ABOUTME: Decides when LINK_CHECK is due against an injected clock and tracks link health

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Shortest interval the scheduler will honour
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for periodic LINK_CHECK requests
///
/// # Example
///
/// ```rust
/// use ssmi::client::LinkCheckConfig;
/// use std::time::Duration;
///
/// let config = LinkCheckConfig::new(Duration::from_secs(30))
///     .with_max_unanswered(5);
/// assert!(config.enabled);
///
/// let config = LinkCheckConfig::disabled();
/// assert!(!config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct LinkCheckConfig {
    /// Time between LINK_CHECK requests (default: 60 seconds)
    pub interval: Duration,

    /// Checks that may go unanswered before the link counts as failed
    /// (default: 3, 0 disables failure detection)
    pub max_unanswered: u32,

    /// Whether the timer may be started at all (default: true)
    pub enabled: bool,
}

impl Default for LinkCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_unanswered: 3,
            enabled: true,
        }
    }
}

impl LinkCheckConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_max_unanswered(mut self, max_unanswered: u32) -> Self {
        self.max_unanswered = max_unanswered;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Snapshot of link-check state and counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheckStatus {
    /// Timer armed
    pub running: bool,
    /// LINK_CHECK requests written
    pub checks_sent: u32,
    /// Ticks that fell while unauthenticated
    pub ticks_skipped: u32,
    /// ACKs of type link-check-response received
    pub responses: u32,
    /// Checks sent since the last response
    pub unanswered: u32,
}

/// What a timer poll decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCheckTick {
    /// Timer stopped or not yet due
    Idle,
    /// Due, but the session is not authenticated; nothing is queued
    Skipped,
    /// Due; the caller sends LINK_CHECK and reports it with `on_check_sent`
    Due,
}

/// Timer and health bookkeeping for LINK_CHECK.
///
/// Pure bookkeeping: the caller supplies the current time and does the
/// sending. Missed ticks are skipped rather than bunched up, so a stalled
/// loop fires at most once per poll.
#[derive(Debug)]
pub struct LinkCheckManager {
    config: LinkCheckConfig,
    next_due: Option<Instant>,
    checks_sent: u32,
    ticks_skipped: u32,
    responses: u32,
    unanswered: u32,
}

impl LinkCheckManager {
    pub fn new(config: LinkCheckConfig) -> Self {
        Self {
            config,
            next_due: None,
            checks_sent: 0,
            ticks_skipped: 0,
            responses: 0,
            unanswered: 0,
        }
    }

    /// Arm the timer; the first tick falls one interval after `now`.
    ///
    /// Returns false when the configuration disables link checks.
    pub fn start(&mut self, now: Instant) -> bool {
        if !self.config.enabled {
            debug!("Link check disabled by configuration, not starting");
            return false;
        }
        self.next_due = Some(now + self.interval());
        true
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Decide whether a LINK_CHECK is due at `now`.
    pub fn poll(&mut self, now: Instant, authenticated: bool) -> LinkCheckTick {
        let Some(due) = self.next_due else {
            return LinkCheckTick::Idle;
        };
        if now < due {
            return LinkCheckTick::Idle;
        }

        let interval = self.interval();
        let missed = now.duration_since(due).as_nanos() / interval.as_nanos();
        let periods = u32::try_from(missed).unwrap_or(u32::MAX).saturating_add(1);
        self.next_due = Some(due + interval * periods);

        if authenticated {
            LinkCheckTick::Due
        } else {
            self.ticks_skipped += 1;
            debug!("Link check tick skipped, session not authenticated");
            LinkCheckTick::Skipped
        }
    }

    pub fn on_check_sent(&mut self) {
        self.checks_sent += 1;
        self.unanswered += 1;
        debug!("Link check sent (total: {})", self.checks_sent);

        if self.is_link_failed() {
            warn!(
                "Link check unanswered {} times in a row",
                self.unanswered
            );
        }
    }

    /// Record a link-check ACK; true if it answered an outstanding check
    pub fn on_response(&mut self) -> bool {
        let answered = self.unanswered > 0;
        self.responses += 1;
        self.unanswered = 0;
        debug!("Link check answered (total: {})", self.responses);
        answered
    }

    /// True once `max_unanswered` checks in a row got no response.
    ///
    /// A `max_unanswered` of 0 never fails.
    pub fn is_link_failed(&self) -> bool {
        self.config.max_unanswered > 0 && self.unanswered >= self.config.max_unanswered
    }

    pub fn interval(&self) -> Duration {
        self.config.interval.max(MIN_INTERVAL)
    }

    pub fn status(&self) -> LinkCheckStatus {
        LinkCheckStatus {
            running: self.is_running(),
            checks_sent: self.checks_sent,
            ticks_skipped: self.ticks_skipped,
            responses: self.responses,
            unanswered: self.unanswered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(60);

    #[test]
    fn test_link_check_config_defaults() {
        let config = LinkCheckConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.max_unanswered, 3);
        assert!(config.enabled);
    }

    #[test]
    fn test_not_due_until_started() {
        let mut manager = LinkCheckManager::new(LinkCheckConfig::new(INTERVAL));
        let now = Instant::now();
        assert_eq!(manager.poll(now + INTERVAL * 5, true), LinkCheckTick::Idle);
    }

    #[test]
    fn test_due_once_per_interval() {
        let mut manager = LinkCheckManager::new(LinkCheckConfig::new(INTERVAL));
        let start = Instant::now();
        assert!(manager.start(start));

        assert_eq!(manager.poll(start, true), LinkCheckTick::Idle);
        assert_eq!(manager.poll(start + INTERVAL, true), LinkCheckTick::Due);
        assert_eq!(manager.poll(start + INTERVAL, true), LinkCheckTick::Idle);
        assert_eq!(manager.poll(start + INTERVAL * 2, true), LinkCheckTick::Due);
    }

    #[test]
    fn test_missed_ticks_are_skipped() {
        let mut manager = LinkCheckManager::new(LinkCheckConfig::new(INTERVAL));
        let start = Instant::now();
        manager.start(start);

        let late = start + INTERVAL * 4 + Duration::from_secs(1);
        assert_eq!(manager.poll(late, true), LinkCheckTick::Due);
        assert_eq!(manager.poll(late, true), LinkCheckTick::Idle);
        assert_eq!(manager.poll(start + INTERVAL * 5, true), LinkCheckTick::Due);
    }

    #[test]
    fn test_unauthenticated_ticks_skip() {
        let mut manager = LinkCheckManager::new(LinkCheckConfig::new(INTERVAL));
        let start = Instant::now();
        manager.start(start);

        assert_eq!(manager.poll(start + INTERVAL, false), LinkCheckTick::Skipped);
        assert_eq!(manager.status().ticks_skipped, 1);
        // The skipped tick is not carried over
        assert_eq!(manager.poll(start + INTERVAL, true), LinkCheckTick::Idle);
    }

    #[test]
    fn test_disabled_config_does_not_start() {
        let mut manager = LinkCheckManager::new(LinkCheckConfig::disabled());
        assert!(!manager.start(Instant::now()));
        assert!(!manager.is_running());
    }

    #[test]
    fn test_stop() {
        let mut manager = LinkCheckManager::new(LinkCheckConfig::new(INTERVAL));
        let start = Instant::now();
        manager.start(start);
        manager.stop();
        assert_eq!(manager.poll(start + INTERVAL, true), LinkCheckTick::Idle);
    }

    #[test]
    fn test_unanswered_tracking() {
        let mut manager =
            LinkCheckManager::new(LinkCheckConfig::new(INTERVAL).with_max_unanswered(2));

        manager.on_check_sent();
        assert!(!manager.is_link_failed());
        manager.on_check_sent();
        assert!(manager.is_link_failed());

        assert!(manager.on_response());
        assert!(!manager.is_link_failed());
        assert!(!manager.on_response());

        let status = manager.status();
        assert_eq!(status.checks_sent, 2);
        assert_eq!(status.responses, 2);
        assert_eq!(status.unanswered, 0);
    }

    #[test]
    fn test_zero_max_unanswered_never_fails() {
        let mut manager =
            LinkCheckManager::new(LinkCheckConfig::new(INTERVAL).with_max_unanswered(0));
        assert!(!manager.is_link_failed());

        for _ in 0..10 {
            manager.on_check_sent();
        }
        assert!(!manager.is_link_failed());
    }
}
