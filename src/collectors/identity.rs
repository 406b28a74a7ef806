use crate::collectors::SamplerContext;
use sysinfo::{System, SystemExt};
use tokio::time::MissedTickBehavior;
use tracing::warn;

const NAME: &str = "identity";

/// Publishes the auth key once, then keeps the host name current.
pub async fn run(ctx: SamplerContext, auth_key: String) {
    ctx.snapshot.write().await.auth_key = auth_key;

    let system = System::new();
    let mut ticker = tokio::time::interval(ctx.schedule.identity_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match system.host_name() {
            Some(name) => {
                ctx.snapshot.write().await.host_name = name;
                ctx.metrics.inc_sampler_cycle(NAME);
            }
            None => {
                warn!(sampler = NAME, "host name could not be resolved");
                ctx.metrics.inc_sampler_error(NAME);
            }
        }
    }
}
