//! Query metrics and tracing spans.
//!
//! With the `metrics` feature, [`METRICS`] records query counts, durations,
//! errors and skipped page reads through OpenTelemetry, exported into a
//! `prometheus::Registry` that [`ProjectionMetrics::encode_text`] renders in
//! the text exposition format. With the `tracing` feature,
//! [`tracing_helpers`] opens spans around executor calls.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::{ProjectionMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<ProjectionMetrics> = Lazy::new(ProjectionMetrics::init);

    pub struct ProjectionMetrics {
        registry: Registry,
        _provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub page_short_circuits_total: Counter<u64>,
    }

    impl ProjectionMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => SdkMeterProvider::builder().with_reader(exporter).build(),
                Err(e) => {
                    log::warn!("prometheus exporter unavailable, metrics are not exported: {e}");
                    SdkMeterProvider::builder().build()
                }
            };
            let meter = provider.meter("lifeguard_projection");

            let queries_total = meter
                .u64_counter("lifeguard_projection_queries_total")
                .with_description("Total projection queries executed")
                .build();

            let query_errors_total = meter
                .u64_counter("lifeguard_projection_query_errors_total")
                .with_description("Projection queries that failed")
                .build();

            let query_duration = meter
                .f64_histogram("lifeguard_projection_query_duration_seconds")
                .with_description("Duration of projection queries")
                .build();

            let page_short_circuits_total = meter
                .u64_counter("lifeguard_projection_page_short_circuits_total")
                .with_description("Page reads whose offset was past the total, skipping the content query")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                page_short_circuits_total,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_page_short_circuit(&self) {
            self.page_short_circuits_total.add(1, &[]);
        }

        /// Current metrics in the Prometheus text format
        ///
        /// # Errors
        ///
        /// Returns the encoder's error if gathering or encoding fails.
        pub fn encode_text(&self) -> Result<String, prometheus::Error> {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
            String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_recording_does_not_panic() {
            METRICS.record_query_duration(Duration::from_millis(3));
            METRICS.record_query_error();
            METRICS.record_page_short_circuit();
            assert!(METRICS.encode_text().is_ok());
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    /// Span around one statement sent to PostgreSQL
    pub fn execute_query_span(sql: &str) -> Span {
        tracing::info_span!("db.query", db.system = "postgresql", db.statement = %sql)
    }
}
