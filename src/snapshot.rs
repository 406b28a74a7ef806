use crate::collectors::{LoadSample, MemorySample, NetRate};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Marks memory and swap counters that have not been observed yet.
pub const UNOBSERVED: i64 = -1;

pub type SharedSnapshot = Arc<RwLock<Snapshot>>;

/// Latest value of every sampled metric. Serialized as-is into the report
/// datagram, so the renamed keys are the collector's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    #[serde(rename = "AuthKey")]
    pub auth_key: String,
    #[serde(rename = "Hostname")]
    pub host_name: String,
    #[serde(rename = "Uptime")]
    pub uptime_seconds: u64,
    #[serde(rename = "Processes")]
    pub process_count: u64,
    /// 1m, 5m, 15m load and "running/total" tasks.
    #[serde(rename = "LoadAvg")]
    pub load_averages: Vec<String>,
    #[serde(rename = "MemTotal")]
    pub mem_total_kb: i64,
    /// MemFree + Buffers + Cached.
    #[serde(rename = "MemFree")]
    pub mem_free_kb: i64,
    #[serde(rename = "SwapTotal")]
    pub swap_total_kb: i64,
    #[serde(rename = "SwapFree")]
    pub swap_free_kb: i64,
    #[serde(rename = "NetDown")]
    pub net_down_bps: u64,
    #[serde(rename = "NetUp")]
    pub net_up_bps: u64,
    #[serde(rename = "Disks")]
    pub disks: Vec<Disk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disk {
    #[serde(rename = "Total")]
    pub total_kb: u64,
    #[serde(rename = "Free")]
    pub free_kb: u64,
    #[serde(rename = "Mount")]
    pub mount_path: String,
    #[serde(rename = "Filesystem")]
    pub filesystem: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            auth_key: String::new(),
            host_name: String::new(),
            uptime_seconds: 0,
            process_count: 0,
            load_averages: Vec::new(),
            mem_total_kb: UNOBSERVED,
            mem_free_kb: UNOBSERVED,
            swap_total_kb: UNOBSERVED,
            swap_free_kb: UNOBSERVED,
            net_down_bps: 0,
            net_up_bps: 0,
            disks: Vec::new(),
        }
    }
}

impl Snapshot {
    pub fn shared() -> SharedSnapshot {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn apply_load(&mut self, sample: LoadSample) {
        if let Some(uptime) = sample.uptime_seconds {
            self.uptime_seconds = uptime;
        }
        if let Some(count) = sample.process_count {
            self.process_count = count;
        }
        if let Some(load) = sample.load_averages {
            self.load_averages = load.into();
        }
    }

    pub fn apply_memory(&mut self, sample: MemorySample) {
        if let Some(v) = sample.total_kb {
            self.mem_total_kb = v;
        }
        if let Some(v) = sample.free_kb {
            self.mem_free_kb = v;
        }
        if let Some(v) = sample.swap_total_kb {
            self.swap_total_kb = v;
        }
        if let Some(v) = sample.swap_free_kb {
            self.swap_free_kb = v;
        }
    }

    pub fn apply_net_rate(&mut self, rate: NetRate) {
        self.net_down_bps = rate.down_bps;
        self.net_up_bps = rate.up_bps;
    }

    pub fn replace_disks(&mut self, disks: Vec<Disk>) {
        self.disks = disks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_with_sentinels() {
        let s = Snapshot::default();
        assert_eq!(s.mem_total_kb, UNOBSERVED);
        assert_eq!(s.mem_free_kb, UNOBSERVED);
        assert_eq!(s.swap_total_kb, UNOBSERVED);
        assert_eq!(s.swap_free_kb, UNOBSERVED);
        assert_eq!(s.net_down_bps, 0);
        assert!(s.disks.is_empty());
    }

    #[test]
    fn missing_fields_keep_previous_values() {
        let mut s = Snapshot::default();
        s.apply_load(LoadSample {
            uptime_seconds: Some(100),
            process_count: Some(42),
            load_averages: Some(["0.10", "0.20", "0.30", "1/99"].map(String::from)),
        });
        s.apply_load(LoadSample {
            uptime_seconds: Some(101),
            process_count: None,
            load_averages: None,
        });
        assert_eq!(s.uptime_seconds, 101);
        assert_eq!(s.process_count, 42);
        assert_eq!(s.load_averages, vec!["0.10", "0.20", "0.30", "1/99"]);

        s.apply_memory(MemorySample {
            total_kb: Some(1000),
            free_kb: Some(150),
            swap_total_kb: Some(0),
            swap_free_kb: Some(0),
        });
        s.apply_memory(MemorySample::default());
        assert_eq!(s.mem_total_kb, 1000);
        assert_eq!(s.mem_free_kb, 150);
        assert_eq!(s.swap_total_kb, 0);
        assert_eq!(s.swap_free_kb, 0);
    }

    #[test]
    fn disks_are_replaced_not_merged() {
        let mut s = Snapshot::default();
        let disk = |fs: &str, mount: &str| Disk {
            total_kb: 10,
            free_kb: 5,
            mount_path: mount.to_string(),
            filesystem: fs.to_string(),
        };
        s.replace_disks(vec![disk("/dev/sda1", "/"), disk("/dev/sda2", "/home")]);
        s.replace_disks(vec![disk("/dev/sdb1", "/data")]);
        assert_eq!(s.disks, vec![disk("/dev/sdb1", "/data")]);
    }

    #[test]
    fn serializes_with_collector_keys() {
        let mut s = Snapshot::default();
        s.auth_key = "k".to_string();
        s.replace_disks(vec![Disk {
            total_kb: 2,
            free_kb: 1,
            mount_path: "/".to_string(),
            filesystem: "/dev/root".to_string(),
        }]);
        let value = serde_json::to_value(&s).unwrap();
        for key in [
            "AuthKey",
            "Hostname",
            "Uptime",
            "Processes",
            "LoadAvg",
            "MemTotal",
            "MemFree",
            "SwapTotal",
            "SwapFree",
            "NetDown",
            "NetUp",
            "Disks",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["MemTotal"], -1);
        assert_eq!(value["Disks"][0]["Filesystem"], "/dev/root");
        assert_eq!(value["Disks"][0]["Total"], 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_tear_reads() {
        let shared = Snapshot::shared();
        let rounds = 2_000_u64;

        let load = {
            let shared = shared.clone();
            tokio::spawn(async move {
                for n in 1..=rounds {
                    let tag = n.to_string();
                    let sample = LoadSample {
                        uptime_seconds: Some(n),
                        process_count: Some(n),
                        load_averages: Some([tag.clone(), tag.clone(), tag.clone(), tag]),
                    };
                    shared.write().await.apply_load(sample);
                    tokio::task::yield_now().await;
                }
            })
        };
        let memory = {
            let shared = shared.clone();
            tokio::spawn(async move {
                for n in 1..=rounds as i64 {
                    let sample = MemorySample {
                        total_kb: Some(n),
                        free_kb: Some(n),
                        swap_total_kb: Some(n),
                        swap_free_kb: Some(n),
                    };
                    shared.write().await.apply_memory(sample);
                    tokio::task::yield_now().await;
                }
            })
        };
        let net = {
            let shared = shared.clone();
            tokio::spawn(async move {
                for n in 1..=rounds {
                    shared.write().await.apply_net_rate(NetRate {
                        down_bps: n,
                        up_bps: n,
                    });
                    tokio::task::yield_now().await;
                }
            })
        };
        let disks = {
            let shared = shared.clone();
            tokio::spawn(async move {
                for n in 1..=rounds {
                    let len = (n % 7) as usize;
                    let disks = (0..len)
                        .map(|_| Disk {
                            total_kb: len as u64,
                            free_kb: n,
                            mount_path: format!("/mnt/{n}"),
                            filesystem: format!("fs{n}"),
                        })
                        .collect();
                    shared.write().await.replace_disks(disks);
                    tokio::task::yield_now().await;
                }
            })
        };
        let identity = {
            let shared = shared.clone();
            tokio::spawn(async move {
                for n in 1..=rounds {
                    shared.write().await.host_name = format!("host-{n}");
                    tokio::task::yield_now().await;
                }
            })
        };

        let reader = {
            let shared = shared.clone();
            tokio::spawn(async move {
                let mut reads = 0_u64;
                let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
                loop {
                    let s = shared.read().await.clone();
                    reads += 1;

                    assert_eq!(s.uptime_seconds, s.process_count);
                    if !s.load_averages.is_empty() {
                        assert_eq!(s.load_averages.len(), 4);
                        let tag = s.uptime_seconds.to_string();
                        assert!(s.load_averages.iter().all(|v| *v == tag));
                    }
                    assert_eq!(s.mem_total_kb, s.mem_free_kb);
                    assert_eq!(s.swap_total_kb, s.swap_free_kb);
                    assert_eq!(s.mem_total_kb, s.swap_total_kb);
                    assert_eq!(s.net_down_bps, s.net_up_bps);
                    if let Some(first) = s.disks.first() {
                        assert_eq!(first.total_kb as usize, s.disks.len());
                        assert!(s.disks.iter().all(|d| d == first));
                    }

                    if s.uptime_seconds == rounds && s.net_down_bps == rounds {
                        break;
                    }
                    if tokio::time::Instant::now() > deadline {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                reads
            })
        };

        for task in [load, memory, net, disks, identity] {
            task.await.unwrap();
        }
        let reads = reader.await.unwrap();
        assert!(reads > 0);

        let s = shared.read().await;
        assert_eq!(s.uptime_seconds, rounds);
        assert_eq!(s.host_name, format!("host-{rounds}"));
    }
}
