//! # Delivery configuration.
//!
//! Provides [`Config`], the owner-wide settings, and [`DeliveryMode`], the
//! per-queue backpressure policy.
//!
//! Config is used in two ways:
//! 1. **Owner creation**: `Owner::builder(config)` sizes the event bus.
//! 2. **Queue creation**: [`Config::params`] derives [`QueueParams`] for a
//!    queue created lazily on first attach.
//!
//! ## Sentinel values
//! - `latest_extra_capacity = 0` → treated as 1 (a `LATEST` buffer never has zero slots)
//! - `bus_capacity = 0` → treated as 1

/// Backpressure policy of a delivery queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Every pushed item eventually reaches a receiver (unbounded buffer).
    #[default]
    All,
    /// Only the most recent item matters; a newer item supersedes the
    /// delivery attempt of an older one.
    Latest,
}

impl DeliveryMode {
    /// Returns the buffer capacity for this mode.
    ///
    /// - `None` → unbounded (`All`)
    /// - `Some(n)` → at most `n` items held before the dispatch loop pulls them (`Latest`)
    ///
    /// # Example
    /// ```
    /// use handover::DeliveryMode;
    ///
    /// assert_eq!(DeliveryMode::All.buffer_capacity(4), None);
    /// assert_eq!(DeliveryMode::Latest.buffer_capacity(0), Some(1));
    /// assert_eq!(DeliveryMode::Latest.buffer_capacity(3), Some(3));
    /// ```
    #[inline]
    pub fn buffer_capacity(self, extra_capacity: usize) -> Option<usize> {
        match self {
            DeliveryMode::All => None,
            DeliveryMode::Latest => Some(extra_capacity.max(1)),
        }
    }

    /// Short lowercase name used in event reasons and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::All => "all",
            DeliveryMode::Latest => "latest",
        }
    }
}

/// Construction parameters of a single queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueParams {
    /// Backpressure policy.
    pub mode: DeliveryMode,
    /// Extra buffer slots for `Latest` (ignored by `All`).
    pub extra_capacity: usize,
}

impl QueueParams {
    /// Parameters for an `All` queue.
    pub fn all() -> Self {
        Self {
            mode: DeliveryMode::All,
            extra_capacity: 0,
        }
    }

    /// Parameters for a `Latest` queue with the given extra capacity.
    pub fn latest(extra_capacity: usize) -> Self {
        Self {
            mode: DeliveryMode::Latest,
            extra_capacity,
        }
    }

    /// Effective buffer capacity (`None` = unbounded).
    #[inline]
    pub fn buffer_capacity(&self) -> Option<usize> {
        self.mode.buffer_capacity(self.extra_capacity)
    }
}

/// Owner-wide configuration.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `latest_extra_capacity`: Buffer slots of `Latest` queues (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older events.
    pub bus_capacity: usize,

    /// How many just-pushed items a `Latest` queue may hold before its
    /// dispatch loop observes them. On overflow the oldest one is evicted.
    pub latest_extra_capacity: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Derives queue parameters for the given mode.
    #[inline]
    pub fn params(&self, mode: DeliveryMode) -> QueueParams {
        QueueParams {
            mode,
            extra_capacity: self.latest_extra_capacity,
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `latest_extra_capacity = 1`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            latest_extra_capacity: 1,
        }
    }
}
