use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use warden_core::*;

// Mock implementations
#[derive(Default)]
struct MockHost {
    active: HashMap<String, bool>,
    links: HashMap<String, bool>,
    reachable: HashMap<String, bool>,
    logs: HashMap<String, Vec<String>>,
    /// Units whose journal cannot be read
    broken_journals: Vec<String>,
    disk_unreadable: bool,
    disk: u8,
    load: f64,
    calls: Mutex<Vec<String>>,
}

impl MockHost {
    /// Everything in the example deployment is up
    fn healthy() -> Self {
        let mut host = MockHost {
            disk: 40,
            load: 0.3,
            ..Default::default()
        };
        host.links.insert("wg0".to_string(), true);
        host.reachable.insert("8.8.8.8".to_string(), true);
        host.reachable.insert("172.16.102.2".to_string(), true);
        host.active.insert("sowa.service".to_string(), true);
        host.active.insert("sowa_sip.service".to_string(), true);
        host.logs.insert(
            "sowa_sip.service".to_string(),
            vec!["call established".to_string()],
        );
        host
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn lookup(map: &HashMap<String, bool>, key: &str) -> Result<bool, HostError> {
        map.get(key).copied().ok_or(HostError::CommandFailed {
            status: 1,
            stderr: "unknown".to_string(),
        })
    }
}

#[async_trait]
impl HostOps for MockHost {
    async fn service_active(&self, unit: &str) -> Result<bool, HostError> {
        self.record(format!("active {unit}"));
        Self::lookup(&self.active, unit)
    }

    async fn link_exists(&self, interface: &str) -> Result<bool, HostError> {
        self.record(format!("link {interface}"));
        Self::lookup(&self.links, interface)
    }

    async fn reachable(&self, ping: &PingSpec<'_>) -> Result<bool, HostError> {
        self.record(format!("ping {}", ping.target));
        Self::lookup(&self.reachable, ping.target)
    }

    async fn disk_used_percent(&self) -> Result<u8, HostError> {
        if self.disk_unreadable {
            return Err(HostError::ParseError("df printed nothing".to_string()));
        }
        Ok(self.disk)
    }

    async fn load_average(&self) -> Result<f64, HostError> {
        Ok(self.load)
    }

    async fn tail_service_log(&self, unit: &str, lines: usize) -> Result<Vec<String>, HostError> {
        self.record(format!("log {unit}"));
        if self.broken_journals.iter().any(|u| u == unit) {
            return Err(HostError::CommandFailed {
                status: 1,
                stderr: "Failed to open journal".to_string(),
            });
        }
        let log = self.logs.get(unit).cloned().unwrap_or_default();
        Ok(log[log.len().saturating_sub(lines)..].to_vec())
    }

    async fn restart_service(&self, unit: &str) -> Result<(), HostError> {
        self.record(format!("restart {unit}"));
        Ok(())
    }

    async fn reboot_host(&self) -> Result<(), HostError> {
        self.record("reboot".to_string());
        Ok(())
    }

    async fn reclaim_logs(&self, _policy: &ReclaimPolicy) -> Result<(), HostError> {
        self.record("reclaim".to_string());
        Ok(())
    }
}

struct ManualClock(AtomicI64);

impl ManualClock {
    fn at(t: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(t)))
    }

    fn set(&self, t: i64) {
        self.0.store(t, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

struct BrokenStore;

#[async_trait]
impl LedgerStore for BrokenStore {
    async fn get(&self, _name: &str) -> Option<LedgerEntry> {
        None
    }

    async fn put(&self, name: &str, _entry: LedgerEntry) -> Result<(), LedgerError> {
        Err(LedgerError::Persistence {
            target: name.to_string(),
            reason: "read-only file system".to_string(),
        })
    }
}

fn example_config() -> SupervisorConfig {
    let config: SupervisorConfig =
        toml::from_str(include_str!("../../../warden.example.toml")).unwrap();
    config.validate().unwrap();
    config
}

async fn run(
    config: &SupervisorConfig,
    host: MockHost,
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
) -> (CycleResult, Arc<MockHost>) {
    let host = Arc::new(host);
    let orchestrator = Orchestrator::new(config, host.clone(), store, clock);
    let result = orchestrator.run_cycle().await;
    (result, host)
}

#[tokio::test]
async fn test_healthy_cycle() {
    let config = example_config();
    let store = Arc::new(MemoryLedgerStore::new());

    let (result, host) = run(&config, MockHost::healthy(), store.clone(), ManualClock::at(0)).await;

    assert!(result.healthy);
    assert_eq!(result.guard, GuardVerdict::Proceed);
    assert!(result.actions.is_empty());
    assert_eq!(result.actors.len(), 3);
    assert!(result.actors.iter().all(|a| a.outcome == ActorOutcome::Healthy));
    assert!(store.is_empty());
    assert_eq!(host.count("restart"), 0);
}

#[tokio::test]
async fn test_critical_disk_blocks_cycle() {
    let config = example_config();
    let store = Arc::new(MemoryLedgerStore::new());
    let mut host = MockHost::healthy();
    host.disk = config.guard.disk_crit + 1;
    host.active.insert("sowa.service".to_string(), false);

    let (result, host) = run(&config, host, store.clone(), ManualClock::at(0)).await;

    assert!(!result.healthy);
    assert!(result.blocked());
    assert!(result.actors.is_empty());
    assert!(result.actions.is_empty());
    assert!(host.calls().is_empty(), "no probes may run: {:?}", host.calls());
    assert!(store.is_empty(), "no ledger writes");
}

#[tokio::test]
async fn test_unreadable_disk_usage_blocks_cycle() {
    let config = example_config();
    let store = Arc::new(MemoryLedgerStore::new());
    let mut host = MockHost::healthy();
    host.disk_unreadable = true;
    host.active.insert("sowa.service".to_string(), false);

    let (result, host) = run(&config, host, store.clone(), ManualClock::at(0)).await;

    assert!(!result.healthy);
    assert_eq!(result.guard, GuardVerdict::Block(BlockReason::DiskUnknown));
    assert!(result.actions.is_empty());
    assert!(host.calls().is_empty(), "no probes may run: {:?}", host.calls());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_overload_reboots_without_checks() {
    let config = example_config();
    let mut host = MockHost::healthy();
    host.load = 12.0;

    let (result, host) = run(
        &config,
        host,
        Arc::new(MemoryLedgerStore::new()),
        ManualClock::at(0),
    )
    .await;

    assert!(result.blocked());
    assert!(result.reboot_requested());
    assert_eq!(host.calls(), vec!["reboot"]);
}

#[tokio::test]
async fn test_disk_warning_reclaims_and_marks_unhealthy() {
    let config = example_config();
    let mut host = MockHost::healthy();
    host.disk = 92;

    let (result, host) = run(
        &config,
        host,
        Arc::new(MemoryLedgerStore::new()),
        ManualClock::at(0),
    )
    .await;

    assert!(!result.healthy);
    assert_eq!(result.guard, GuardVerdict::Degrade { used_percent: 92 });
    assert_eq!(result.actions, vec![Action::Reclaim]);
    assert!(result.actors.iter().all(|a| a.outcome == ActorOutcome::Healthy));
    assert_eq!(host.calls()[0], "reclaim");
}

#[tokio::test]
async fn test_unreachable_sip_peer_restarts_once() {
    let config = example_config();
    let store = Arc::new(MemoryLedgerStore::new());
    let mut host = MockHost::healthy();
    host.reachable.insert("172.16.102.2".to_string(), false);
    host.logs.insert(
        "sowa_sip.service".to_string(),
        vec!["registration successful".to_string(); 5],
    );

    let (result, host) = run(&config, host, store.clone(), ManualClock::at(1_000)).await;

    assert!(!result.healthy);
    assert_eq!(result.outcome("sowa_sip.service"), Some(ActorOutcome::Restarted));
    assert_eq!(
        result.actions,
        vec![Action::Restart {
            actor: "sowa_sip.service".to_string(),
            unit: "sowa_sip.service".to_string(),
        }]
    );
    assert_eq!(host.count("restart sowa_sip.service"), 1);
    // reachability failed first, so the later probes never ran
    assert_eq!(host.count("active sowa_sip.service"), 0);
    assert_eq!(host.count("log sowa_sip.service"), 0);
    assert_eq!(store.get("sowa_sip.service").await.unwrap().failure_count, 1);
}

#[tokio::test]
async fn test_stuck_registration_loop_restarts() {
    let config = example_config();
    let mut host = MockHost::healthy();
    host.logs.insert(
        "sowa_sip.service".to_string(),
        vec!["Registration successful".to_string(); 7],
    );

    let (result, host) = run(
        &config,
        host,
        Arc::new(MemoryLedgerStore::new()),
        ManualClock::at(0),
    )
    .await;

    assert_eq!(result.outcome("sowa_sip.service"), Some(ActorOutcome::Restarted));
    assert_eq!(host.count("restart sowa_sip.service"), 1);
}

#[tokio::test]
async fn test_unreadable_journal_does_not_hide_dead_unit() {
    let config: SupervisorConfig = toml::from_str(
        r#"
        [[actor]]
        name = "svc"
        restart_unit = "svc.service"

        [[actor.probe]]
        kind = "log_pattern"
        unit = "svc.service"

        [[actor.probe]]
        kind = "service_active"
        unit = "svc.service"
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let mut host = MockHost {
        disk: 40,
        load: 0.3,
        ..Default::default()
    };
    host.active.insert("svc.service".to_string(), false);
    host.broken_journals.push("svc.service".to_string());

    let (result, host) = run(
        &config,
        host,
        Arc::new(MemoryLedgerStore::new()),
        ManualClock::at(0),
    )
    .await;

    assert!(!result.healthy);
    assert_eq!(result.outcome("svc"), Some(ActorOutcome::Restarted));
    assert_eq!(
        host.calls(),
        vec!["log svc.service", "active svc.service", "restart svc.service"]
    );
}

#[tokio::test]
async fn test_missing_interface_takes_no_action() {
    let config = example_config();
    let store = Arc::new(MemoryLedgerStore::new());
    let mut host = MockHost::healthy();
    host.links.insert("wg0".to_string(), false);

    let (result, host) = run(&config, host, store.clone(), ManualClock::at(0)).await;

    assert!(!result.healthy);
    assert_eq!(result.outcome("wg"), Some(ActorOutcome::Indeterminate));
    assert!(result.actions.is_empty());
    assert_eq!(host.count("ping 8.8.8.8"), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_budget_survives_separate_invocations() {
    let config = example_config();
    let state = TempDir::new().unwrap();
    let clock = ManualClock::at(0);

    let broken_sowa = || {
        let mut host = MockHost::healthy();
        host.active.insert("sowa.service".to_string(), false);
        host
    };

    let mut outcomes = Vec::new();
    for t in [0, 5, 10, 15] {
        clock.set(t);
        // fresh store and orchestrator each time, like a new process
        let store = Arc::new(FileLedgerStore::new(state.path()));
        let (result, _) = run(&config, broken_sowa(), store, clock.clone()).await;
        outcomes.push(result.outcome("sowa.service").unwrap());
    }

    assert_eq!(
        outcomes,
        vec![
            ActorOutcome::Restarted,
            ActorOutcome::Restarted,
            ActorOutcome::Restarted,
            ActorOutcome::Suppressed,
        ]
    );

    // quiet for longer than the window
    clock.set(46);
    let store = Arc::new(FileLedgerStore::new(state.path()));
    let (result, _) = run(&config, broken_sowa(), store, clock.clone()).await;
    assert_eq!(result.outcome("sowa.service"), Some(ActorOutcome::Restarted));

    let raw = std::fs::read_to_string(state.path().join("sowa.service.count")).unwrap();
    assert_eq!(raw, "1 46");
}

#[tokio::test]
async fn test_exhausted_link_escalates_and_ends_cycle() {
    let config = example_config();
    let store = Arc::new(MemoryLedgerStore::new());
    store
        .put(
            "wg",
            LedgerEntry {
                failure_count: 3,
                last_action_epoch: 100,
            },
        )
        .await
        .unwrap();

    let mut host = MockHost::healthy();
    host.reachable.insert("8.8.8.8".to_string(), false);
    host.active.insert("sowa.service".to_string(), false);

    let (result, host) = run(&config, host, store, ManualClock::at(110)).await;

    assert!(result.reboot_requested());
    assert_eq!(result.outcome("wg"), Some(ActorOutcome::Escalated));
    // later actors are not checked once a reboot is requested
    assert_eq!(result.actors.len(), 1);
    assert_eq!(host.count("reboot"), 1);
    assert_eq!(host.count("restart"), 0);
    assert_eq!(host.count("active sowa.service"), 0);
}

#[tokio::test]
async fn test_reboot_issued_once_with_multiple_escalations() {
    let mut config = example_config();
    for actor in &mut config.actors {
        actor.escalate = true;
        actor.max_restarts = Some(1);
    }
    let store = Arc::new(MemoryLedgerStore::new());
    for name in ["wg", "sowa.service", "sowa_sip.service"] {
        store
            .put(
                name,
                LedgerEntry {
                    failure_count: 1,
                    last_action_epoch: 0,
                },
            )
            .await
            .unwrap();
    }

    let mut host = MockHost::healthy();
    host.reachable.insert("8.8.8.8".to_string(), false);
    host.active.insert("sowa.service".to_string(), false);
    host.reachable.insert("172.16.102.2".to_string(), false);

    let (result, host) = run(&config, host, store, ManualClock::at(1)).await;

    assert_eq!(host.count("reboot"), 1);
    assert_eq!(
        result
            .actions
            .iter()
            .filter(|a| matches!(a, Action::Reboot { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_ledger_failure_skips_only_that_action() {
    let config = example_config();
    let mut host = MockHost::healthy();
    host.active.insert("sowa.service".to_string(), false);
    host.reachable.insert("172.16.102.2".to_string(), false);

    let (result, host) = run(&config, host, Arc::new(BrokenStore), ManualClock::at(0)).await;

    assert!(!result.healthy);
    assert_eq!(result.actors.len(), 3);
    assert_eq!(
        result.outcome("sowa.service"),
        Some(ActorOutcome::LedgerUnavailable)
    );
    assert_eq!(
        result.outcome("sowa_sip.service"),
        Some(ActorOutcome::LedgerUnavailable)
    );
    assert!(result.actions.is_empty());
    assert_eq!(host.count("restart"), 0);
}
