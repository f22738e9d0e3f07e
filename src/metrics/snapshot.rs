use std::time::Duration;

/// Point-in-time view of one engine's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineMetricsSnapshot {
    pub successes: u64,
    pub not_found: u64,
    pub invalid_credential: u64,

    // successful authentications; drives the reorganize trigger
    pub total_queries: u64,

    pub reorganizations: u64,
    pub coalesced_triggers: u64,
    pub aborted_reorganizations: u64,
    pub last_reorganization: Duration,
    pub max_reorganization: Duration,
    pub total_reorganization: Duration,

    // gauges captured at snapshot time
    pub records: usize,
    pub ranked_records: usize,
    pub generation: u64,
    pub reorganize_threshold: u64,
}

impl EngineMetricsSnapshot {
    /// Failed authentications of either kind.
    pub fn failures(&self) -> u64 {
        self.not_found + self.invalid_credential
    }

    /// Mean duration of completed reorganizations, zero if none ran.
    pub fn average_reorganization(&self) -> Duration {
        match u32::try_from(self.reorganizations) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_reorganization / n,
            Err(_) => Duration::from_secs_f64(
                self.total_reorganization.as_secs_f64() / self.reorganizations as f64,
            ),
        }
    }

    /// Successful authentications not yet reflected by a completed pass,
    /// assuming passes fire exactly on threshold multiples.
    pub fn unranked_queries(&self) -> u64 {
        if self.reorganize_threshold == 0 {
            return self.total_queries;
        }
        self.total_queries % self.reorganize_threshold
    }
}
