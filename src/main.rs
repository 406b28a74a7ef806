mod collectors;
mod config;
mod http;
mod metrics;
mod reporter;
mod snapshot;

use axum::serve;
use clap::Parser;
use collectors::procfs::ProcFs;
use collectors::{spawn_samplers, SamplerContext, Schedule};
use config::Config;
use metrics::Metrics;
use snapshot::Snapshot;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "varanus")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            init_tracing("info");
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    init_tracing(cfg.log_filter());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        collector = %cfg.collector_addr,
        adapter = %cfg.adapter,
        "starting varanus"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "failed to initialise metrics");
            std::process::exit(1);
        }
    };

    let ctx = SamplerContext {
        snapshot: Snapshot::shared(),
        metrics: metrics.clone(),
        procfs: ProcFs::default(),
        schedule: Schedule::default(),
    };
    let _samplers = spawn_samplers(&ctx, &cfg.adapter, &cfg.auth_key);

    let _reporter = tokio::spawn(reporter::run(
        cfg.collector_addr.clone(),
        ctx.snapshot.clone(),
        metrics.clone(),
        ctx.schedule.clone(),
    ));

    if let Some(listen) = cfg.status_listen.clone() {
        let app = http::build_router(metrics, ctx.snapshot.clone());
        tokio::spawn(async move {
            let addr: SocketAddr = match listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %listen, "invalid status_listen address");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "failed to start status server");
                    return;
                }
            };

            info!(listen = %addr, "status server listening");
            if let Err(err) = serve(listener, app).await {
                error!(error = %err, "status server error");
            }
        });
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("received Ctrl+C, shutting down");
}

/// `RUST_LOG` wins over the configured log level.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
