pub mod disk;
pub mod identity;
pub mod load;
pub mod memory;
pub mod network;
pub mod procfs;

use crate::metrics::Metrics;
use crate::snapshot::SharedSnapshot;
use procfs::ProcFs;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSample {
    pub uptime_seconds: Option<u64>,
    pub process_count: Option<u64>,
    pub load_averages: Option<[String; 4]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySample {
    pub total_kb: Option<i64>,
    pub free_kb: Option<i64>,
    pub swap_total_kb: Option<i64>,
    pub swap_free_kb: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetRate {
    pub down_bps: u64,
    pub up_bps: u64,
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed {source_name}: {detail}")]
    Parse {
        source_name: &'static str,
        detail: String,
    },
    #[error("interface {iface} not found in net/dev")]
    InterfaceMissing { iface: String },
    #[error("byte counters of {iface} went backwards")]
    CounterReset { iface: String },
    #[error("command {command} failed: {detail}")]
    Command { command: String, detail: String },
    #[error("command {command} timed out after {after}")]
    Timeout {
        command: String,
        after: humantime::Duration,
    },
}

/// Fixed cadence of every unit in the agent.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub load_interval: Duration,
    pub memory_interval: Duration,
    pub net_window: Duration,
    pub disk_interval: Duration,
    pub disk_command_timeout: Duration,
    pub identity_interval: Duration,
    pub report_warmup: Duration,
    pub report_interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            load_interval: Duration::from_secs(1),
            memory_interval: Duration::from_secs(3),
            net_window: Duration::from_secs(1),
            disk_interval: Duration::from_secs(60),
            disk_command_timeout: Duration::from_secs(30),
            identity_interval: Duration::from_secs(60),
            report_warmup: Duration::from_secs(5),
            report_interval: Duration::from_secs(1),
        }
    }
}

/// Everything a sampler needs besides its own settings.
#[derive(Clone)]
pub struct SamplerContext {
    pub snapshot: SharedSnapshot,
    pub metrics: Arc<Metrics>,
    pub procfs: ProcFs,
    pub schedule: Schedule,
}

/// Starts the five samplers. They run until the runtime shuts down.
pub fn spawn_samplers(ctx: &SamplerContext, adapter: &str, auth_key: &str) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(load::run(ctx.clone())),
        tokio::spawn(memory::run(ctx.clone())),
        tokio::spawn(network::run(ctx.clone(), adapter.to_string())),
        tokio::spawn(disk::run(ctx.clone(), disk::DfCommand::default())),
        tokio::spawn(identity::run(ctx.clone(), auth_key.to_string())),
    ]
}
