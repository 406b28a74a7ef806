use crate::snapshot::Snapshot;
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;

/// The agent's own health counters plus a mirror of the last report.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub sampler_cycles_total: CounterVec,
    pub sampler_errors_total: CounterVec,
    pub reports_sent_total: Counter,
    pub report_send_errors_total: Counter,
    pub uptime_seconds: Gauge,
    pub process_count: Gauge,
    pub memory_free_kb: Gauge,
    pub net_down_bytes_per_sec: Gauge,
    pub net_up_bytes_per_sec: Gauge,
    pub disk_count: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let sampler_cycles_total = CounterVec::new(
            opts!(
                "varanus_sampler_cycles_total",
                "Completed sampling cycles by sampler"
            ),
            &["sampler"],
        )?;
        let sampler_errors_total = CounterVec::new(
            opts!(
                "varanus_sampler_errors_total",
                "Values or cycles skipped because a source could not be read"
            ),
            &["sampler"],
        )?;
        let reports_sent_total = Counter::with_opts(opts!(
            "varanus_reports_sent_total",
            "Datagrams handed to the socket"
        ))?;
        let report_send_errors_total = Counter::with_opts(opts!(
            "varanus_report_send_errors_total",
            "Datagrams dropped because serialization or send failed"
        ))?;
        let uptime_seconds = Gauge::with_opts(opts!(
            "varanus_uptime_seconds",
            "Host uptime in the last report"
        ))?;
        let process_count = Gauge::with_opts(opts!(
            "varanus_process_count",
            "Process count in the last report"
        ))?;
        let memory_free_kb = Gauge::with_opts(opts!(
            "varanus_memory_free_kb",
            "Free plus buffer and cache memory in the last report"
        ))?;
        let net_down_bytes_per_sec = Gauge::with_opts(opts!(
            "varanus_net_down_bytes_per_sec",
            "Receive rate of the configured adapter in the last report"
        ))?;
        let net_up_bytes_per_sec = Gauge::with_opts(opts!(
            "varanus_net_up_bytes_per_sec",
            "Transmit rate of the configured adapter in the last report"
        ))?;
        let disk_count = Gauge::with_opts(opts!(
            "varanus_disk_count",
            "Mounted volumes in the last report"
        ))?;

        register(&registry, &sampler_cycles_total)?;
        register(&registry, &sampler_errors_total)?;
        register(&registry, &reports_sent_total)?;
        register(&registry, &report_send_errors_total)?;
        register(&registry, &uptime_seconds)?;
        register(&registry, &process_count)?;
        register(&registry, &memory_free_kb)?;
        register(&registry, &net_down_bytes_per_sec)?;
        register(&registry, &net_up_bytes_per_sec)?;
        register(&registry, &disk_count)?;

        Ok(Arc::new(Self {
            registry,
            sampler_cycles_total,
            sampler_errors_total,
            reports_sent_total,
            report_send_errors_total,
            uptime_seconds,
            process_count,
            memory_free_kb,
            net_down_bytes_per_sec,
            net_up_bytes_per_sec,
            disk_count,
        }))
    }

    pub fn update_from_snapshot(&self, snapshot: &Snapshot) {
        self.uptime_seconds.set(snapshot.uptime_seconds as f64);
        self.process_count.set(snapshot.process_count as f64);
        self.memory_free_kb.set(snapshot.mem_free_kb as f64);
        self.net_down_bytes_per_sec
            .set(snapshot.net_down_bps as f64);
        self.net_up_bytes_per_sec.set(snapshot.net_up_bps as f64);
        self.disk_count.set(snapshot.disks.len() as f64);
    }

    pub fn inc_sampler_cycle(&self, sampler: &str) {
        self.sampler_cycles_total
            .with_label_values(&[sampler])
            .inc();
    }

    pub fn inc_sampler_error(&self, sampler: &str) {
        self.sampler_errors_total
            .with_label_values(&[sampler])
            .inc();
    }

    #[cfg(test)]
    pub fn sampler_cycles(&self, sampler: &str) -> u64 {
        self.sampler_cycles_total
            .with_label_values(&[sampler])
            .get() as u64
    }

    #[cfg(test)]
    pub fn sampler_errors(&self, sampler: &str) -> u64 {
        self.sampler_errors_total
            .with_label_values(&[sampler])
            .get() as u64
    }

    pub fn inc_report_sent(&self) {
        self.reports_sent_total.inc();
    }

    pub fn inc_report_error(&self) {
        self.report_send_errors_total.inc();
    }

    #[cfg(test)]
    pub fn reports_sent(&self) -> u64 {
        self.reports_sent_total.get() as u64
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}
