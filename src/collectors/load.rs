use crate::collectors::procfs::{parse_loadavg, parse_uptime, ProcFs};
use crate::collectors::{LoadSample, SampleError, SamplerContext};
use tokio::time::MissedTickBehavior;
use tracing::debug;

const NAME: &str = "load";

pub async fn run(ctx: SamplerContext) {
    let mut ticker = tokio::time::interval(ctx.schedule.load_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let (sample, errors) = sample(&ctx.procfs);
        ctx.snapshot.write().await.apply_load(sample);

        ctx.metrics.inc_sampler_cycle(NAME);
        for _ in 0..errors {
            ctx.metrics.inc_sampler_error(NAME);
        }
    }
}

/// Reads process count, uptime and load averages. Each value is independent;
/// the second element counts the values that could not be read.
pub fn sample(procfs: &ProcFs) -> (LoadSample, u64) {
    let mut errors = 0_u64;
    let mut note = |err: SampleError| {
        debug!(sampler = NAME, error = %err, "value skipped this cycle");
        errors += 1;
    };

    let process_count = procfs.count_processes().map_err(&mut note).ok();

    let uptime_seconds = procfs.read("uptime").map_err(&mut note).ok().and_then(|raw| {
        let parsed = parse_uptime(&raw);
        if parsed.is_none() {
            note(SampleError::Parse {
                source_name: "uptime",
                detail: raw.trim().to_string(),
            });
        }
        parsed
    });

    let load_averages = procfs.read("loadavg").map_err(&mut note).ok().and_then(|raw| {
        let parsed = parse_loadavg(&raw);
        if parsed.is_none() {
            note(SampleError::Parse {
                source_name: "loadavg",
                detail: raw.trim().to_string(),
            });
        }
        parsed
    });

    (
        LoadSample {
            uptime_seconds,
            process_count,
            load_averages,
        },
        errors,
    )
}
