use crate::collectors::Schedule;
use crate::metrics::Metrics;
use crate::snapshot::{SharedSnapshot, Snapshot};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("failed to resolve collector address {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },
    #[error("collector address {addr} did not resolve to any socket address")]
    NoAddress { addr: String },
    #[error("failed to bind local UDP socket: {0}")]
    Bind(std::io::Error),
    #[error("failed to connect UDP socket to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Opens a UDP socket connected to the collector. Connecting only fixes the
/// peer address; nothing is exchanged with the collector.
pub async fn open_socket(collector: &str) -> Result<UdpSocket, ReporterError> {
    let resolved: Vec<SocketAddr> = lookup_host(collector)
        .await
        .map_err(|source| ReporterError::Resolve {
            addr: collector.to_string(),
            source,
        })?
        .collect();
    let target = pick_target(&resolved).ok_or_else(|| ReporterError::NoAddress {
        addr: collector.to_string(),
    })?;

    let local: SocketAddr = if target.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await.map_err(ReporterError::Bind)?;
    socket
        .connect(target)
        .await
        .map_err(|source| ReporterError::Connect {
            addr: target,
            source,
        })?;
    Ok(socket)
}

/// Collectors listen on IPv4, so the first IPv4 address wins even when the
/// resolver lists an IPv6 one first. IPv6 is used only when nothing else
/// resolved, as for a bracketed literal like `[::1]:9300`.
fn pick_target(resolved: &[SocketAddr]) -> Option<SocketAddr> {
    resolved
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| resolved.first().copied())
}

pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(snapshot)
}

/// Sends one datagram per report interval after the warm-up. Delivery is
/// best-effort: failed sends are counted and dropped. Returns only when the
/// socket cannot be opened.
pub async fn run(
    collector: String,
    snapshot: SharedSnapshot,
    metrics: Arc<Metrics>,
    schedule: Schedule,
) {
    time::sleep(schedule.report_warmup).await;

    let socket = match open_socket(&collector).await {
        Ok(socket) => socket,
        Err(err) => {
            error!(
                collector = %collector,
                error = %err,
                "unable to open a socket to the collector, reporting stopped"
            );
            return;
        }
    };
    info!(
        collector = %collector,
        interval = %humantime::format_duration(schedule.report_interval),
        "reporting to collector"
    );

    let mut ticker = time::interval(schedule.report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let current = snapshot.read().await.clone();
        metrics.update_from_snapshot(&current);

        let packet = match encode(&current) {
            Ok(packet) => packet,
            Err(err) => {
                metrics.inc_report_error();
                debug!(error = %err, "snapshot serialization failed");
                continue;
            }
        };

        match socket.send(&packet).await {
            Ok(_) => metrics.inc_report_sent(),
            Err(err) => {
                metrics.inc_report_error();
                debug!(collector = %collector, error = %err, "datagram dropped");
            }
        }
    }
}
