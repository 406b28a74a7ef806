//! Parsers for the kernel text sources and `df` output.
//!
//! Parsers are best-effort: a value that is missing or malformed comes back
//! as `None` (or an error for net/dev) so the caller can keep whatever it had
//! before.

use crate::collectors::{MemorySample, SampleError};
use crate::snapshot::Disk;
use std::fs;
use std::path::PathBuf;

const DEFAULT_PROC_ROOT: &str = "/proc";

/// Location of the proc filesystem. Tests point this at a fake tree.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn read(&self, rel: &str) -> Result<String, SampleError> {
        let path = self.root.join(rel);
        fs::read_to_string(&path).map_err(|source| SampleError::Read {
            path: path.display().to_string(),
            source,
        })
    }

    /// Number of numeric entries (one per process) under the proc root.
    pub fn count_processes(&self) -> Result<u64, SampleError> {
        let entries = fs::read_dir(&self.root).map_err(|source| SampleError::Read {
            path: self.root.display().to_string(),
            source,
        })?;

        let count = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_str().is_some_and(is_pid))
            .count();
        Ok(count as u64)
    }
}

fn is_pid(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Whole seconds from `/proc/uptime` ("12345.67 54321.00").
pub fn parse_uptime(content: &str) -> Option<u64> {
    let first = content.split_whitespace().next()?;
    let whole = first.split('.').next()?;
    whole.parse().ok()
}

/// First four fields of `/proc/loadavg`: 1m, 5m, 15m and running/total.
pub fn parse_loadavg(content: &str) -> Option<[String; 4]> {
    let mut fields = content.split_whitespace();
    let mut out: [String; 4] = Default::default();
    for slot in &mut out {
        *slot = fields.next()?.to_string();
    }
    if !out[3].contains('/') {
        return None;
    }
    Some(out)
}

/// Reads the kB counters out of `/proc/meminfo`.
///
/// Free memory is MemFree + Buffers + Cached. Buffers and Cached count as 0
/// when missing; MemFree itself is required for the sum.
pub fn parse_meminfo(content: &str) -> MemorySample {
    let mut mem_total = None;
    let mut mem_free = None;
    let mut buffers = None;
    let mut cached = None;
    let mut swap_total = None;
    let mut swap_free = None;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut mem_total,
            "MemFree" => &mut mem_free,
            "Buffers" => &mut buffers,
            "Cached" => &mut cached,
            "SwapTotal" => &mut swap_total,
            "SwapFree" => &mut swap_free,
            _ => continue,
        };
        *slot = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<i64>().ok());
    }

    MemorySample {
        total_kb: mem_total,
        free_kb: mem_free.map(|free| {
            free.saturating_add(buffers.unwrap_or(0))
                .saturating_add(cached.unwrap_or(0))
        }),
        swap_total_kb: swap_total,
        swap_free_kb: swap_free,
    }
}

/// Cumulative (received, transmitted) bytes for `iface` from `/proc/net/dev`.
pub fn parse_net_dev(content: &str, iface: &str) -> Result<(u64, u64), SampleError> {
    let counters = content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim() == iface)
        .map(|(_, counters)| counters)
        .ok_or_else(|| SampleError::InterfaceMissing {
            iface: iface.to_string(),
        })?;

    let malformed = |detail: &str| SampleError::Parse {
        source_name: "net/dev",
        detail: format!("{iface}: {detail}"),
    };
    let fields: Vec<&str> = counters.split_whitespace().collect();
    // rx: bytes packets errs drop fifo frame compressed multicast, then tx
    if fields.len() < 16 {
        return Err(malformed(&format!("expected 16 counters, found {}", fields.len())));
    }
    let rx = fields[0]
        .parse()
        .map_err(|_| malformed("receive bytes are not a number"))?;
    let tx = fields[8]
        .parse()
        .map_err(|_| malformed("transmit bytes are not a number"))?;
    Ok((rx, tx))
}

/// One `df` row: filesystem, total, used, available, use%, mount.
/// Filesystem and mount point may contain spaces.
pub fn parse_df_row(line: &str) -> Option<Disk> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let pct = (4..tokens.len().saturating_sub(1)).find(|&i| {
        tokens[i]
            .strip_suffix('%')
            .is_some_and(|p| p.parse::<u64>().is_ok())
            && tokens[i - 3..i].iter().all(|t| t.parse::<u64>().is_ok())
    })?;

    Some(Disk {
        total_kb: tokens[pct - 3].parse().ok()?,
        free_kb: tokens[pct - 1].parse().ok()?,
        mount_path: tokens[pct + 1..].join(" "),
        filesystem: tokens[..pct - 3].join(" "),
    })
}

/// Parses the full `df` output, skipping the header. Returns the disks and
/// the number of rows that did not match the expected layout.
pub fn parse_df(output: &str) -> (Vec<Disk>, usize) {
    let mut disks = Vec::new();
    let mut rejected = 0;
    for line in output.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_df_row(line) {
            Some(disk) => disks.push(disk),
            None => rejected += 1,
        }
    }
    (disks, rejected)
}
