// orchestrator/src/stats.rs

use router_core::RouteDecision;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Completed-turn counters shown in the front-end sidebar.
#[derive(Debug, Default)]
pub struct Stats {
    total: AtomicU64,
    coding: AtomicU64,
    general: AtomicU64,
    tool_calls: AtomicU64,
    capped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsSnapshot {
    pub total_queries: u64,
    pub coding_queries: u64,
    pub general_queries: u64,
    pub tool_calls: u64,
    pub capped_turns: u64,
}

impl Stats {
    pub fn record_turn(&self, route: Option<RouteDecision>, tool_calls: usize, capped: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match route {
            Some(RouteDecision::Coding) => self.coding.fetch_add(1, Ordering::Relaxed),
            Some(RouteDecision::General) => self.general.fetch_add(1, Ordering::Relaxed),
            None => 0,
        };
        self.tool_calls.fetch_add(tool_calls as u64, Ordering::Relaxed);
        if capped {
            self.capped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_queries: self.total.load(Ordering::Relaxed),
            coding_queries: self.coding.load(Ordering::Relaxed),
            general_queries: self.general.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            capped_turns: self.capped.load(Ordering::Relaxed),
        }
    }
}
