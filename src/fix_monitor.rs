use serde::{Deserialize, Serialize};

use crate::config::GpsMonitorConfig;

/// Liveness of the position fix source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixHealth {
    Live,
    Stale,
    Restarting,
}

/// Commands for the host; fire-and-forget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorCommand {
    RestartFixSource,
}

/// All timestamps are milliseconds on the host's monotonic clock
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FixHealthState {
    pub last_fix_at: Option<u64>,
    pub grace_until: u64,
    pub is_stale: bool,
    pub is_restarting: bool,
    pub last_restart_at: Option<u64>,
    pub stale_cycle_started_at: Option<u64>,
    /// A restart was already issued in the current stale cycle
    pub attempt_in_cycle: bool,
}

/// Detects a silent fix source and drives a bounded restart cycle
///
/// The host calls `on_fix` for every delivered fix and `tick` on a timer.
/// Nothing happens inside a grace window (after start or after a restart).
/// Once the silence exceeds the mode threshold times the grace multiplier the
/// source is Stale, and at most one restart is issued per stale cycle and per
/// `min_restart_gap_ms`. A cycle that outlives `max_stale_cycle_ms` earns one
/// more attempt.
pub struct FixHealthMonitor {
    config: GpsMonitorConfig,
    started_at: u64,
    state: FixHealthState,
}

impl FixHealthMonitor {
    pub fn new(config: GpsMonitorConfig, now_ms: u64) -> Self {
        let state = FixHealthState {
            grace_until: now_ms.saturating_add(config.startup_grace_ms),
            ..Default::default()
        };
        FixHealthMonitor {
            config,
            started_at: now_ms,
            state,
        }
    }

    pub fn on_fix(&mut self, timestamp_ms: u64) {
        self.state.last_fix_at = Some(timestamp_ms);

        if self.state.is_restarting {
            let recovery_until = timestamp_ms.saturating_add(self.config.recovery_grace_ms);
            self.state.grace_until = self.state.grace_until.max(recovery_until);
            log::info!("Fix source recovered after restart, grace until {} ms", self.state.grace_until);
        }

        self.clear_flags();
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<MonitorCommand> {
        if now_ms < self.state.grace_until {
            return None;
        }

        let last_seen = self.state.last_fix_at.unwrap_or(self.started_at);
        let inactive_ms = now_ms.saturating_sub(last_seen);
        if inactive_ms <= self.config.stale_after_ms() {
            if self.state.is_stale {
                log::info!("Fix source live again");
            }
            self.clear_flags();
            return None;
        }

        if !self.state.is_stale {
            log::warn!("Fix source stale: no fix for {} ms", inactive_ms);
            self.state.is_stale = true;
            self.state.stale_cycle_started_at = Some(now_ms);
        }

        // Grace is over and the restart produced nothing
        if self.state.is_restarting {
            log::warn!("Fix source restart produced no fix within grace");
            self.state.is_restarting = false;
        }

        let cycle_started = self.state.stale_cycle_started_at.unwrap_or(now_ms);
        if self.state.attempt_in_cycle && now_ms.saturating_sub(cycle_started) > self.config.max_stale_cycle_ms {
            log::info!("Stale cycle exceeded {} ms, allowing another restart", self.config.max_stale_cycle_ms);
            self.state.attempt_in_cycle = false;
            self.state.stale_cycle_started_at = Some(now_ms);
        }

        let gap_elapsed = match self.state.last_restart_at {
            Some(at) => now_ms.saturating_sub(at) > self.config.min_restart_gap_ms,
            None => true,
        };

        if !self.state.attempt_in_cycle && gap_elapsed && !self.state.is_restarting {
            log::warn!("Restarting fix source after {} ms of silence", inactive_ms);
            self.state.is_restarting = true;
            self.state.attempt_in_cycle = true;
            self.state.last_restart_at = Some(now_ms);
            self.state.grace_until = now_ms.saturating_add(self.config.startup_grace_ms);
            return Some(MonitorCommand::RestartFixSource);
        }

        None
    }

    pub fn health(&self) -> FixHealth {
        if self.state.is_restarting {
            FixHealth::Restarting
        } else if self.state.is_stale {
            FixHealth::Stale
        } else {
            FixHealth::Live
        }
    }

    pub fn state(&self) -> &FixHealthState {
        &self.state
    }

    pub fn config(&self) -> &GpsMonitorConfig {
        &self.config
    }

    fn clear_flags(&mut self) {
        self.state.is_stale = false;
        self.state.is_restarting = false;
        self.state.attempt_in_cycle = false;
        self.state.stale_cycle_started_at = None;
    }
}
