use crate::collectors::procfs::parse_meminfo;
use crate::collectors::{MemorySample, SamplerContext};
use tokio::time::MissedTickBehavior;
use tracing::warn;

const NAME: &str = "memory";

pub async fn run(ctx: SamplerContext) {
    let mut ticker = tokio::time::interval(ctx.schedule.memory_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let raw = match ctx.procfs.read("meminfo") {
            Ok(raw) => raw,
            Err(err) => {
                warn!(sampler = NAME, error = %err, "meminfo unavailable, keeping previous values");
                ctx.metrics.inc_sampler_error(NAME);
                continue;
            }
        };

        let sample = parse_meminfo(&raw);
        let missing = missing_fields(&sample);
        if !missing.is_empty() {
            warn!(sampler = NAME, ?missing, "meminfo is missing fields, keeping previous values");
            ctx.metrics.inc_sampler_error(NAME);
        }
        ctx.snapshot.write().await.apply_memory(sample);
        ctx.metrics.inc_sampler_cycle(NAME);
    }
}

fn missing_fields(sample: &MemorySample) -> Vec<&'static str> {
    [
        ("MemTotal", sample.total_kb),
        ("MemFree", sample.free_kb),
        ("SwapTotal", sample.swap_total_kb),
        ("SwapFree", sample.swap_free_kb),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(name, _)| name)
    .collect()
}
