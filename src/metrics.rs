//! Prometheus metrics for descriptor and schedule failures.
//!
//! Each scheduler process owns one [`Metrics`] with its own [`Registry`], so
//! tests can build as many independent instances as they like.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters exposed on `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    /// Descriptor files that failed to parse, by file name.
    pub yaml_parse_failures: IntCounterVec,

    /// Tasks whose schedule expression failed to parse, by task name.
    pub job_parse_failures: IntCounterVec,
}

impl Metrics {
    /// Create the counters and register them with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let yaml_parse_failures = IntCounterVec::new(
            Opts::new(
                "scheduler_yaml_parse_failure",
                "Task descriptor files that could not be parsed",
            ),
            &["file_name"],
        )?;
        registry.register(Box::new(yaml_parse_failures.clone()))?;

        let job_parse_failures = IntCounterVec::new(
            Opts::new(
                "scheduler_job_parse_failure",
                "Tasks whose schedule could not be parsed",
            ),
            &["job_name"],
        )?;
        registry.register(Box::new(job_parse_failures.clone()))?;

        Ok(Self {
            registry,
            yaml_parse_failures,
            job_parse_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_yaml_parse_failure(&self, file_name: &str) {
        self.yaml_parse_failures.with_label_values(&[file_name]).inc();
    }

    pub fn record_job_parse_failure(&self, job_name: &str) {
        self.job_parse_failures.with_label_values(&[job_name]).inc();
    }

    pub fn yaml_parse_failure_count(&self, file_name: &str) -> u64 {
        self.yaml_parse_failures.with_label_values(&[file_name]).get()
    }

    pub fn job_parse_failure_count(&self, job_name: &str) -> u64 {
        self.job_parse_failures.with_label_values(&[job_name]).get()
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
