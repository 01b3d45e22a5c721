//! Provider health pool
//!
//! The only process-wide mutable structure of the council. Each member's
//! [`HealthRecord`] sits in its own `DashMap` entry, so recording an outcome
//! locks that one member and never blocks calls for the others.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use council_domain::{
    CouncilMember, HealthPolicy, HealthRecord, HealthSnapshot, HealthStatus, MemberId,
    StatusChange,
};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::ports::metrics::{MetricSignal, MetricsSink, NoMetrics};

struct PoolEntry {
    member: CouncilMember,
    record: HealthRecord,
}

pub struct ProviderHealthPool {
    entries: DashMap<MemberId, PoolEntry>,
    policy: HealthPolicy,
    metrics: Arc<dyn MetricsSink>,
}

impl ProviderHealthPool {
    pub fn new(policy: HealthPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            metrics: Arc::new(NoMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Pool with every member of `members` registered
    pub fn with_members(policy: HealthPolicy, members: impl IntoIterator<Item = CouncilMember>) -> Self {
        let pool = Self::new(policy);
        for member in members {
            pool.register(member);
        }
        pool
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Add a member (or replace its definition, keeping its health history)
    pub fn register(&self, member: CouncilMember) {
        self.entries
            .entry(member.id.clone())
            .and_modify(|entry| entry.member = member.clone())
            .or_insert_with(|| PoolEntry {
                member,
                record: HealthRecord::new(),
            });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record one call outcome for `member`.
    ///
    /// Unknown members are ignored. Status transitions are logged and
    /// reported to the metrics sink.
    pub fn record_outcome(&self, member: &MemberId, success: bool, latency: Duration) {
        let change = match self.entries.get_mut(member) {
            Some(mut entry) => entry.record.record(success, latency, &self.policy),
            None => {
                warn!(member = %member, "Outcome for unregistered member ignored");
                return;
            }
        };
        debug!(member = %member, success, latency_ms = latency.as_millis() as u64, "Recorded outcome");

        if let Some(StatusChange { from, to }) = change {
            info!(member = %member, from = %from, to = %to, "Member health changed");
            self.metrics
                .record(MetricSignal::health_transition(member, from, to));
        }
    }

    /// Up to `n` selectable members, healthy first, then degraded.
    ///
    /// Members whose `enabled` flag is off and any id in `excluding` are
    /// skipped. Disabled members are skipped too until their recovery
    /// cooldown has passed; after that they rank last, so the outcomes of
    /// those calls can lift them out of the disabled state. Ties go to the
    /// lower mean latency, then to the smaller member id.
    pub fn select_candidates(&self, n: usize, excluding: &[MemberId]) -> Vec<CouncilMember> {
        let now = Utc::now();
        let mut ranked: Vec<(u8, Duration, CouncilMember)> = self
            .entries
            .iter()
            .filter(|entry| entry.member.enabled)
            .filter(|entry| {
                entry.record.status().is_selectable()
                    || entry.record.recovery_due(&self.policy, now)
            })
            .filter(|entry| !excluding.contains(entry.key()))
            .map(|entry| {
                (
                    entry.record.status().selection_rank(),
                    entry.record.mean_latency(),
                    entry.member.clone(),
                )
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.id.cmp(&b.2.id))
        });
        ranked.into_iter().take(n).map(|(_, _, m)| m).collect()
    }

    pub fn get_status(&self, member: &MemberId) -> Option<HealthStatus> {
        self.entries.get(member).map(|entry| entry.record.status())
    }

    pub fn snapshot(&self, member: &MemberId) -> Option<HealthSnapshot> {
        self.entries.get(member).map(|entry| entry.record.snapshot())
    }

    /// Snapshots of every member, sorted by id
    pub fn snapshots(&self) -> Vec<(MemberId, HealthSnapshot)> {
        let mut all: Vec<(MemberId, HealthSnapshot)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.record.snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Clear a member's window (operator action). Returns `false` for an
    /// unknown member.
    pub fn reset(&self, member: &MemberId) -> bool {
        let change = match self.entries.get_mut(member) {
            Some(mut entry) => entry.record.reset(),
            None => return false,
        };
        info!(member = %member, "Member health reset");
        if let Some(StatusChange { from, to }) = change {
            self.metrics
                .record(MetricSignal::health_transition(member, from, to));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::metrics::HEALTH_STATUS_TRANSITION;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMetrics(Mutex<Vec<MetricSignal>>);

    impl MetricsSink for RecordingMetrics {
        fn record(&self, signal: MetricSignal) {
            self.0.lock().unwrap().push(signal);
        }
    }

    fn policy() -> HealthPolicy {
        HealthPolicy {
            window: 4,
            min_samples: 1,
            upgrade_streak: 2,
            ..Default::default()
        }
    }

    fn pool(names: &[&str]) -> ProviderHealthPool {
        ProviderHealthPool::with_members(
            policy(),
            names.iter().map(|n| CouncilMember::new(*n, "mock")),
        )
    }

    fn ids(members: &[CouncilMember]) -> Vec<&str> {
        members.iter().map(|m| m.id.as_str()).collect()
    }

    const MS: Duration = Duration::from_millis(10);

    #[test]
    fn test_select_prefers_healthy_then_latency_then_id() {
        let pool = pool(&["c", "b", "a", "d"]);
        pool.record_outcome(&MemberId::new("a"), true, Duration::from_millis(300));
        pool.record_outcome(&MemberId::new("b"), true, Duration::from_millis(100));
        // d: 3/4 -> degraded
        for ok in [true, true, true, false] {
            pool.record_outcome(&MemberId::new("d"), ok, MS);
        }
        assert_eq!(pool.get_status(&MemberId::new("d")), Some(HealthStatus::Degraded));

        let selected = pool.select_candidates(10, &[]);
        // c has no samples: zero latency ranks first among healthy
        assert_eq!(ids(&selected), vec!["c", "b", "a", "d"]);
        assert_eq!(ids(&pool.select_candidates(2, &[])), vec!["c", "b"]);
    }

    #[test]
    fn test_select_excludes_disabled_and_excluded() {
        let pool = pool(&["a", "b", "c"]);
        pool.register(CouncilMember::new("off", "mock").disabled());
        for _ in 0..4 {
            pool.record_outcome(&MemberId::new("a"), false, MS);
        }
        assert_eq!(pool.get_status(&MemberId::new("a")), Some(HealthStatus::Disabled));

        let selected = pool.select_candidates(10, &[MemberId::new("b")]);
        assert_eq!(ids(&selected), vec!["c"]);
    }

    #[test]
    fn test_disabled_member_recovers_after_cooldown() {
        let pool = ProviderHealthPool::with_members(
            HealthPolicy {
                window: 5,
                min_samples: 5,
                upgrade_streak: 3,
                recovery_after: Duration::ZERO,
                ..Default::default()
            },
            ["a", "b"].into_iter().map(|n| CouncilMember::new(n, "mock")),
        );
        let a = MemberId::new("a");
        for _ in 0..5 {
            pool.record_outcome(&a, false, MS);
        }
        assert_eq!(pool.get_status(&a), Some(HealthStatus::Disabled));

        // Offered again, behind every healthy member
        assert_eq!(ids(&pool.select_candidates(10, &[])), vec!["b", "a"]);
        assert_eq!(ids(&pool.select_candidates(1, &[])), vec!["b"]);

        let mut rounds = 0;
        while pool.get_status(&a) != Some(HealthStatus::Healthy) {
            rounds += 1;
            assert!(rounds <= 10, "member a never recovered");
            for member in pool.select_candidates(10, &[]) {
                pool.record_outcome(&member.id, true, MS);
            }
        }
        // 3/5 starts the streak; the third qualifying sample upgrades
        assert_eq!(rounds, 5);
        assert_eq!(pool.snapshot(&a).unwrap().failures, 0);
    }

    #[test]
    fn test_transitions_reach_metrics() {
        let metrics = Arc::new(RecordingMetrics::default());
        let pool = pool(&["a"]).with_metrics(metrics.clone());
        pool.record_outcome(&MemberId::new("a"), false, MS);

        let signals = metrics.0.lock().unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].name, HEALTH_STATUS_TRANSITION);
        assert_eq!(signals[0].label_value("to"), Some("disabled"));
    }

    #[test]
    fn test_reset_makes_member_selectable_again() {
        let pool = pool(&["a"]);
        pool.record_outcome(&MemberId::new("a"), false, MS);
        assert!(pool.select_candidates(1, &[]).is_empty());

        assert!(pool.reset(&MemberId::new("a")));
        assert_eq!(ids(&pool.select_candidates(1, &[])), vec!["a"]);
        assert!(!pool.reset(&MemberId::new("ghost")));
    }

    #[test]
    fn test_unknown_member_outcome_is_ignored() {
        let pool = pool(&["a"]);
        pool.record_outcome(&MemberId::new("ghost"), false, MS);
        assert_eq!(pool.len(), 1);
        assert!(pool.snapshot(&MemberId::new("ghost")).is_none());
    }

    #[test]
    fn test_register_keeps_history() {
        let pool = pool(&["a"]);
        pool.record_outcome(&MemberId::new("a"), true, MS);
        pool.register(CouncilMember::new("a", "other").with_weight(3.0));
        assert_eq!(pool.snapshot(&MemberId::new("a")).unwrap().samples, 1);
        assert_eq!(pool.select_candidates(1, &[])[0].backend, "other");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let pool = Arc::new(ProviderHealthPool::with_members(
            HealthPolicy {
                window: 1000,
                ..Default::default()
            },
            ["a", "b"].into_iter().map(|n| CouncilMember::new(n, "mock")),
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                let member = MemberId::new(if i % 2 == 0 { "a" } else { "b" });
                for _ in 0..50 {
                    pool.record_outcome(&member, true, MS);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(pool.snapshot(&MemberId::new("a")).unwrap().samples, 200);
        assert_eq!(pool.snapshot(&MemberId::new("b")).unwrap().samples, 200);
    }
}
