use crate::collectors::procfs::{parse_net_dev, ProcFs};
use crate::collectors::{NetRate, SampleError, SamplerContext};
use std::time::Duration;
use tracing::warn;

const NAME: &str = "network";

/// Measures throughput of `adapter` as the difference of two counter reads
/// taken one window apart. A failed cycle is skipped and retried.
pub async fn run(ctx: SamplerContext, adapter: String) {
    let window = ctx.schedule.net_window;
    loop {
        match measure(&ctx.procfs, &adapter, window).await {
            Ok(rate) => {
                ctx.snapshot.write().await.apply_net_rate(rate);
                ctx.metrics.inc_sampler_cycle(NAME);
            }
            Err(err) => {
                warn!(sampler = NAME, adapter = %adapter, error = %err, "network cycle skipped");
                ctx.metrics.inc_sampler_error(NAME);
                tokio::time::sleep(window).await;
            }
        }
    }
}

async fn measure(procfs: &ProcFs, adapter: &str, window: Duration) -> Result<NetRate, SampleError> {
    let first = read_counters(procfs, adapter)?;
    tokio::time::sleep(window).await;
    let second = read_counters(procfs, adapter)?;
    rate_between(adapter, first, second)
}

fn read_counters(procfs: &ProcFs, adapter: &str) -> Result<(u64, u64), SampleError> {
    let raw = procfs.read("net/dev")?;
    parse_net_dev(&raw, adapter)
}

/// Bytes moved between two cumulative (rx, tx) reads.
pub fn rate_between(
    adapter: &str,
    (rx_first, tx_first): (u64, u64),
    (rx_second, tx_second): (u64, u64),
) -> Result<NetRate, SampleError> {
    match (
        rx_second.checked_sub(rx_first),
        tx_second.checked_sub(tx_first),
    ) {
        (Some(down_bps), Some(up_bps)) => Ok(NetRate { down_bps, up_bps }),
        _ => Err(SampleError::CounterReset {
            iface: adapter.to_string(),
        }),
    }
}
