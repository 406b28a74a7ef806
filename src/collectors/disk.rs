use crate::collectors::procfs::parse_df;
use crate::collectors::{SampleError, SamplerContext};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

const NAME: &str = "disk";

/// External disk-usage utility. Its output must be `df`-shaped with sizes in
/// kilobytes.
#[derive(Debug, Clone)]
pub struct DfCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for DfCommand {
    fn default() -> Self {
        Self {
            program: "df".to_string(),
            args: vec!["--block-size=1000".to_string()],
        }
    }
}

impl DfCommand {
    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the utility, killing it if it outlives `timeout`.
    pub async fn output(&self, timeout: Duration) -> Result<String, SampleError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output();

        match time::timeout(timeout, child).await {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => Err(SampleError::Command {
                command: self.display(),
                detail: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }),
            Ok(Err(err)) => Err(SampleError::Command {
                command: self.display(),
                detail: err.to_string(),
            }),
            Err(_elapsed) => Err(SampleError::Timeout {
                command: self.display(),
                after: timeout.into(),
            }),
        }
    }
}

pub async fn run(ctx: SamplerContext, command: DfCommand) {
    let mut ticker = time::interval(ctx.schedule.disk_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let output = match command.output(ctx.schedule.disk_command_timeout).await {
            Ok(output) => output,
            Err(err) => {
                warn!(
                    sampler = NAME,
                    error = %err,
                    "disk usage unavailable, keeping previous volumes"
                );
                ctx.metrics.inc_sampler_error(NAME);
                continue;
            }
        };

        let (disks, rejected) = parse_df(&output);
        if rejected > 0 {
            debug!(sampler = NAME, rejected, "df rows did not match the expected layout");
        }
        ctx.snapshot.write().await.replace_disks(disks);
        ctx.metrics.inc_sampler_cycle(NAME);
    }
}
