use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::EngineMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for engine metrics snapshots.
///
/// Writes the text exposition format so the output can be scraped or
/// forwarded to an OpenTelemetry collector. Write errors are dropped:
/// exporting is observational and must never fail an engine operation.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_counter(&self, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} counter", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_gauge(&self, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} gauge", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_seconds(&self, name: &str, seconds: f64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} gauge", name);
        let _ = writeln!(writer, "{} {}", name, seconds);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<EngineMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &EngineMetricsSnapshot) {
        self.write_counter(&self.metric_name("auth_success_total"), snapshot.successes);
        self.write_counter(&self.metric_name("auth_not_found_total"), snapshot.not_found);
        self.write_counter(
            &self.metric_name("auth_invalid_credential_total"),
            snapshot.invalid_credential,
        );
        self.write_counter(&self.metric_name("queries_total"), snapshot.total_queries);
        self.write_counter(
            &self.metric_name("reorganizations_total"),
            snapshot.reorganizations,
        );
        self.write_counter(
            &self.metric_name("reorganize_coalesced_total"),
            snapshot.coalesced_triggers,
        );
        self.write_counter(
            &self.metric_name("reorganize_aborted_total"),
            snapshot.aborted_reorganizations,
        );
        self.write_seconds(
            &self.metric_name("reorganize_last_seconds"),
            snapshot.last_reorganization.as_secs_f64(),
        );
        self.write_seconds(
            &self.metric_name("reorganize_max_seconds"),
            snapshot.max_reorganization.as_secs_f64(),
        );

        self.write_gauge(&self.metric_name("records"), snapshot.records as u64);
        self.write_gauge(
            &self.metric_name("ranked_records"),
            snapshot.ranked_records as u64,
        );
        self.write_gauge(&self.metric_name("rank_generation"), snapshot.generation);
    }
}
