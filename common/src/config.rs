// Layered, versioned configuration (spec §6 "Environment configuration").
//
// Precedence, lowest to highest: compiled-in defaults -> optional JSON
// config file (--config) -> CLI flags. The resulting EngineConfig is
// wrapped by ConfigHandle behind a RwLock<Arc<..>> so a reload swaps the
// whole snapshot atomically; readers never observe a half-updated config,
// mirroring the teacher's immutable-config-with-atomic-swap idiom.

use crate::model::ActivityKind;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, sync::Arc, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseConfig {
    /// Exclusive upper bound on total_users for this phase, or None for
    /// the last (uncapped) phase.
    pub max_total_users: Option<u64>,
    pub base_rate: f64,
    pub finizen_bonus: f64,
    pub daily_cap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityKindConfig {
    pub base_xp: f64,
    /// None = unlimited (e.g. `post`).
    pub daily_limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub phases: [PhaseConfig; 4],
    pub phase_thresholds: [u64; 3],

    pub regression_k_holdings: f64,
    pub regression_k_network: f64,
    pub k_level: f64,

    pub activity_kinds: HashMap<ActivityKind, ActivityKindConfig>,
    pub platform_multipliers: HashMap<String, f64>,

    pub settlement_threshold_fin: f64,

    pub anti_bot_hard_threshold: f64,
    pub anti_bot_soft_threshold: f64,
    pub bot_confirmation_threshold: f64,
    pub freeze_duration_secs: u64,
    pub cooldown_window_secs: u64,
    pub cooldown_burst_threshold: u32,

    pub worker_pool_size: usize,
    pub shard_count: usize,
    pub queue_high_water: usize,

    pub task_deadline_secs: u64,
    pub transient_retry_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let phases = [
            PhaseConfig {
                max_total_users: Some(100_000),
                base_rate: 0.1,
                finizen_bonus: 2.0,
                daily_cap: 4.8,
            },
            PhaseConfig {
                max_total_users: Some(1_000_000),
                base_rate: 0.05,
                finizen_bonus: 1.5,
                daily_cap: 1.8,
            },
            PhaseConfig {
                max_total_users: Some(10_000_000),
                base_rate: 0.025,
                finizen_bonus: 1.2,
                daily_cap: 0.72,
            },
            PhaseConfig {
                max_total_users: None,
                base_rate: 0.01,
                finizen_bonus: 1.0,
                daily_cap: 0.24,
            },
        ];

        let mut activity_kinds = HashMap::new();
        activity_kinds.insert(
            ActivityKind::Post,
            ActivityKindConfig {
                base_xp: 50.0,
                daily_limit: None,
            },
        );
        activity_kinds.insert(
            ActivityKind::Photo,
            ActivityKindConfig {
                base_xp: 75.0,
                daily_limit: Some(20),
            },
        );
        activity_kinds.insert(
            ActivityKind::Video,
            ActivityKindConfig {
                base_xp: 150.0,
                daily_limit: Some(10),
            },
        );
        activity_kinds.insert(
            ActivityKind::Story,
            ActivityKindConfig {
                base_xp: 25.0,
                daily_limit: Some(50),
            },
        );
        activity_kinds.insert(
            ActivityKind::Comment,
            ActivityKindConfig {
                base_xp: 25.0,
                daily_limit: Some(100),
            },
        );
        activity_kinds.insert(
            ActivityKind::Like,
            ActivityKindConfig {
                base_xp: 5.0,
                daily_limit: Some(200),
            },
        );
        activity_kinds.insert(
            ActivityKind::Share,
            ActivityKindConfig {
                base_xp: 15.0,
                daily_limit: Some(50),
            },
        );
        activity_kinds.insert(
            ActivityKind::Follow,
            ActivityKindConfig {
                base_xp: 20.0,
                daily_limit: Some(25),
            },
        );
        activity_kinds.insert(
            ActivityKind::DailyLogin,
            ActivityKindConfig {
                base_xp: 10.0,
                daily_limit: Some(1),
            },
        );
        activity_kinds.insert(
            ActivityKind::Quest,
            ActivityKindConfig {
                base_xp: 100.0,
                daily_limit: Some(3),
            },
        );

        let mut platform_multipliers = HashMap::new();
        platform_multipliers.insert("tiktok".to_string(), 1.3);
        platform_multipliers.insert("instagram".to_string(), 1.2);
        platform_multipliers.insert("youtube".to_string(), 1.4);
        platform_multipliers.insert("facebook".to_string(), 1.1);
        platform_multipliers.insert("x".to_string(), 1.2);
        platform_multipliers.insert("internal".to_string(), 1.0);

        EngineConfig {
            phases,
            phase_thresholds: [100_000, 1_000_000, 10_000_000],
            regression_k_holdings: 1e-3,
            regression_k_network: 1e-4,
            k_level: 1e-2,
            activity_kinds,
            platform_multipliers,
            settlement_threshold_fin: 0.1,
            anti_bot_hard_threshold: 0.5,
            anti_bot_soft_threshold: 0.7,
            bot_confirmation_threshold: 0.3,
            freeze_duration_secs: 7 * 86_400,
            cooldown_window_secs: 600,
            cooldown_burst_threshold: 20,
            worker_pool_size: 16,
            shard_count: 64,
            queue_high_water: 10_000,
            task_deadline_secs: 5,
            transient_retry_attempts: 3,
        }
    }
}

impl EngineConfig {
    pub fn platform_multiplier(&self, platform: &str) -> f64 {
        self.platform_multipliers
            .get(platform)
            .copied()
            .unwrap_or(1.0)
    }

    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        let cfg: EngineConfig = serde_json::from_str(&text)?;
        Ok(cfg)
    }
}

/// CLI surface, matching the teacher's `clap::Parser` config pattern
/// (e.g. `ai_miner`'s config wrapper): flags override anything loaded
/// from the config file.
#[derive(Debug, Parser, Clone)]
#[command(name = "reward-engine", about = "Social-mining reward accrual engine")]
pub struct CliArgs {
    /// Path to a JSON config file overriding the compiled-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub worker_pool_size: Option<usize>,

    #[arg(long)]
    pub shard_count: Option<usize>,

    #[arg(long)]
    pub queue_high_water: Option<usize>,

    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind_address: String,

    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    pub fn resolve_config(&self) -> anyhow::Result<EngineConfig> {
        let mut cfg = match &self.config {
            Some(path) => EngineConfig::load_from_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(v) = self.worker_pool_size {
            cfg.worker_pool_size = v;
        }
        if let Some(v) = self.shard_count {
            cfg.shard_count = v;
        }
        if let Some(v) = self.queue_high_water {
            cfg.queue_high_water = v;
        }
        Ok(cfg)
    }
}

/// Atomically-swappable config reference (spec §5 "Config is immutable
/// after load; a config reload swaps an atomically-replaceable
/// reference").
#[derive(Clone)]
pub struct ConfigHandle(Arc<RwLock<Arc<EngineConfig>>>);

impl ConfigHandle {
    pub fn new(config: EngineConfig) -> Self {
        ConfigHandle(Arc::new(RwLock::new(Arc::new(config))))
    }

    pub fn current(&self) -> Arc<EngineConfig> {
        self.0.read().expect("config lock poisoned").clone()
    }

    /// Swap in a whole new config snapshot. In-flight readers that
    /// already cloned the old `Arc<EngineConfig>` keep using it.
    pub fn reload(&self, config: EngineConfig) {
        let mut guard = self.0.write().expect("config lock poisoned");
        *guard = Arc::new(config);
    }
}
