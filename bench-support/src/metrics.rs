//! Latency collection for traffic simulation.

use std::time::Duration;

/// Latency distribution over a set of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub min: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub sample_count: usize,
}

impl LatencyStats {
    /// Sorts `samples` in place and computes percentiles.
    pub fn from_samples(samples: &mut [Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        samples.sort_unstable();
        let n = samples.len();
        let total: Duration = samples.iter().sum();

        Self {
            min: samples[0],
            p50: samples[n / 2],
            p95: samples[(n * 95) / 100],
            p99: samples[(n * 99) / 100],
            max: samples[n - 1],
            mean: total / n as u32,
            sample_count: n,
        }
    }
}

/// Bounded latency reservoir with exact count, mean, and max.
///
/// Every call contributes to `count`, `total`, and `max`; only every
/// `sample_rate`-th call is kept for percentiles, and once `capacity`
/// samples are held new ones overwrite old slots round-robin.
#[derive(Debug, Clone)]
pub struct LatencySampler {
    samples: Vec<Duration>,
    capacity: usize,
    sample_rate: u64,
    count: u64,
    total: Duration,
    max: Duration,
}

impl LatencySampler {
    /// `sample_rate` of 1 keeps every call, 100 keeps every 100th.
    pub fn new(capacity: usize, sample_rate: u64) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            sample_rate: sample_rate.max(1),
            count: 0,
            total: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    #[inline]
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total += duration;
        self.max = self.max.max(duration);

        if self.capacity == 0 || self.count % self.sample_rate != 0 {
            return;
        }
        if self.samples.len() < self.capacity {
            self.samples.push(duration);
        } else {
            let slot = ((self.count / self.sample_rate) as usize) % self.capacity;
            self.samples[slot] = duration;
        }
    }

    /// Folds another sampler in, e.g. one per worker thread.
    pub fn merge(&mut self, other: LatencySampler) {
        self.count += other.count;
        self.total += other.total;
        self.max = self.max.max(other.max);
        for sample in other.samples {
            if self.samples.len() < self.capacity {
                self.samples.push(sample);
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean over every recorded call, not just kept samples.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64)
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn stats(&mut self) -> LatencyStats {
        LatencyStats::from_samples(&mut self.samples)
    }
}
