//! The reconciler — timer-driven drain/coalesce/diff/publish/signal.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use scrapesync_core::{Event, EventLog};
use scrapesync_docker::{ContainerRuntime, RuntimeResult};
use scrapesync_targets::{TargetMap, TargetsFile};

use crate::reload::ReloadClient;

/// How start/running events are resolved into published addresses.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Host under which targets are published (the scraper's view of the
    /// workload host).
    pub publish_host: String,
    /// Container port the workloads expose metrics on (e.g. `"2112/tcp"`).
    pub metrics_port: String,
    /// Timeout for a single workload inspection.
    pub inspect_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            publish_host: "host.docker.internal".to_string(),
            metrics_port: "2112/tcp".to_string(),
            inspect_timeout: Duration::from_millis(500),
        }
    }
}

/// Collapse the drained events to the most recent one per workload.
///
/// Iterates in arrival order and overwrites on collision, so a start
/// followed by a die in the same window resolves to die. Keyed by the
/// workload identifier: two instances of the same service coalesce
/// independently.
pub fn coalesce(events: Vec<Event>) -> BTreeMap<String, Event> {
    let mut coalesced = BTreeMap::new();
    for event in events {
        coalesced.insert(event.workload_id.clone(), event);
    }
    coalesced
}

/// Consumes the event log on a fixed interval and keeps the target file in
/// step with the live workload set.
pub struct Reconciler {
    runtime: Arc<dyn ContainerRuntime>,
    targets: TargetsFile,
    reload: ReloadClient,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        targets: TargetsFile,
        reload: ReloadClient,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            runtime,
            targets,
            reload,
            config,
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// A cycle with nothing drained is a no-op: no file write, no reload.
    /// An unreadable state file aborts the cycle without writing; the
    /// drained events are dropped and the next cycle starts fresh.
    pub async fn cycle(&self, log: &EventLog) {
        let events = log.flush();
        if events.is_empty() {
            return;
        }
        debug!(drained = events.len(), "reconciliation cycle starting");

        let coalesced = coalesce(events);

        let state = match self.targets.load() {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "loading target state failed, aborting cycle");
                return;
            }
        };

        let next = self.apply(&coalesced, state).await;

        if let Err(e) = self.targets.publish(&next) {
            // Publish failure is soft: reload is still attempted, and the
            // next cycle diffs against the stale on-disk state.
            error!(error = %e, "publishing target state failed");
        }

        match self.reload.signal().await {
            Ok(()) => info!(jobs = next.len(), "target state reconciled, reload signalled"),
            Err(e) => warn!(error = %e, "reload signal failed"),
        }
    }

    /// Apply coalesced events to the loaded state.
    ///
    /// Start/Running upserts the job under its name; Stop/Die removes by
    /// that same name. A workload whose metrics port cannot be resolved is
    /// skipped without touching state.
    async fn apply(&self, coalesced: &BTreeMap<String, Event>, mut state: TargetMap) -> TargetMap {
        for event in coalesced.values() {
            if event.action.is_removal() {
                if state.remove(&event.name).is_some() {
                    debug!(job = %event.name, "target removed");
                }
            } else {
                match self.resolve_address(&event.workload_id).await {
                    Ok(address) => {
                        debug!(job = %event.name, %address, "target upserted");
                        state.insert(event.name.clone(), address);
                    }
                    Err(e) => {
                        warn!(
                            job = %event.name,
                            workload_id = %event.workload_id,
                            error = %e,
                            "could not resolve metrics address, skipping workload"
                        );
                    }
                }
            }
        }
        state
    }

    async fn resolve_address(&self, workload_id: &str) -> RuntimeResult<String> {
        let host_port = self
            .runtime
            .published_host_port(
                workload_id,
                &self.config.metrics_port,
                self.config.inspect_timeout,
            )
            .await?;
        Ok(format!("{}:{}", self.config.publish_host, host_port))
    }

    /// Sleep-then-cycle forever. Process termination is the only stop
    /// signal; at most one cycle's drained events can be lost to it.
    pub async fn run(&self, log: EventLog, interval: Duration) {
        info!(interval_secs = interval.as_secs(), "reconciler started");
        loop {
            tokio::time::sleep(interval).await;
            self.cycle(&log).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use scrapesync_core::EventAction;
    use scrapesync_docker::testing::StaticRuntime;

    fn event(action: EventAction, workload_id: &str, name: &str) -> Event {
        Event::new(action, workload_id, name)
    }

    // ── coalescing ─────────────────────────────────────────────────

    #[test]
    fn coalesce_keeps_the_last_event_per_workload() {
        let coalesced = coalesce(vec![
            event(EventAction::Start, "w1", "svc-a"),
            event(EventAction::Die, "w1", "svc-a"),
            event(EventAction::Running, "w2", "svc-b"),
        ]);

        assert_eq!(coalesced.len(), 2);
        assert_eq!(coalesced["w1"].action, EventAction::Die);
        assert_eq!(coalesced["w2"].action, EventAction::Running);
    }

    #[test]
    fn coalesce_of_nothing_is_empty() {
        assert!(coalesce(Vec::new()).is_empty());
    }

    #[test]
    fn coalesce_is_per_workload_not_per_name() {
        // Two instances of the same service coalesce independently.
        let coalesced = coalesce(vec![
            event(EventAction::Start, "w1", "svc-a"),
            event(EventAction::Die, "w2", "svc-a"),
        ]);

        assert_eq!(coalesced.len(), 2);
        assert_eq!(coalesced["w1"].action, EventAction::Start);
        assert_eq!(coalesced["w2"].action, EventAction::Die);
    }

    // ── cycle ──────────────────────────────────────────────────────

    async fn reload_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let counter = counter.clone();
                tokio::spawn(async move {
                    let io = hyper_util::rt::TokioIo::new(stream);
                    let service = hyper::service::service_fn(move |_req| {
                        let counter = counter.clone();
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, std::convert::Infallible>(hyper::Response::new(
                                http_body_util::Empty::<bytes::Bytes>::new(),
                            ))
                        }
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        (format!("http://{addr}/-/reload"), hits)
    }

    struct Fixture {
        reconciler: Reconciler,
        log: EventLog,
        targets: TargetsFile,
        reloads: Arc<AtomicUsize>,
        _dir: tempfile::TempDir,
    }

    async fn fixture(runtime: StaticRuntime) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let targets = TargetsFile::new(dir.path().join("prometheus.yaml"), "60s");
        let (endpoint, reloads) = reload_server().await;

        let reconciler = Reconciler::new(
            Arc::new(runtime),
            targets.clone(),
            ReloadClient::new(endpoint, Duration::from_millis(500)),
            ReconcileConfig::default(),
        );

        Fixture {
            reconciler,
            log: EventLog::new(),
            targets,
            reloads,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn empty_flush_is_side_effect_free() {
        let f = fixture(StaticRuntime::new()).await;

        f.reconciler.cycle(&f.log).await;

        assert!(!f.targets.path().exists(), "no-op cycle must not write");
        assert_eq!(f.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_event_publishes_target_and_signals_reload() {
        let f = fixture(StaticRuntime::new().with_host_port("w1", "2112/tcp", "32000")).await;
        f.log.push(event(EventAction::Start, "w1", "svc-a"));

        f.reconciler.cycle(&f.log).await;

        let state = f.targets.load().unwrap();
        assert_eq!(state["svc-a"], "host.docker.internal:32000");
        assert_eq!(f.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn die_event_removes_the_job_by_name() {
        let f = fixture(StaticRuntime::new()).await;
        let mut prior = TargetMap::new();
        prior.insert("svc-a".to_string(), "host.docker.internal:32000".to_string());
        f.targets.publish(&prior).unwrap();

        f.log.push(event(EventAction::Die, "w1", "svc-a"));
        f.reconciler.cycle(&f.log).await;

        assert!(f.targets.load().unwrap().is_empty());
        assert_eq!(f.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_then_die_in_one_window_resolves_to_die() {
        let f = fixture(StaticRuntime::new().with_host_port("w1", "2112/tcp", "32000")).await;
        f.log.push(event(EventAction::Start, "w1", "svc-a"));
        f.log.push(event(EventAction::Die, "w1", "svc-a"));

        f.reconciler.cycle(&f.log).await;

        assert!(f.targets.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_port_skips_the_workload() {
        // w1 has no published metrics port; w2 does.
        let f = fixture(StaticRuntime::new().with_host_port("w2", "2112/tcp", "32001")).await;
        f.log.push(event(EventAction::Start, "w1", "svc-a"));
        f.log.push(event(EventAction::Start, "w2", "svc-b"));

        f.reconciler.cycle(&f.log).await;

        let state = f.targets.load().unwrap();
        assert!(!state.contains_key("svc-a"));
        assert_eq!(state["svc-b"], "host.docker.internal:32001");
    }

    #[tokio::test]
    async fn corrupt_state_file_aborts_the_cycle() {
        let f = fixture(StaticRuntime::new().with_host_port("w1", "2112/tcp", "32000")).await;
        std::fs::write(f.targets.path(), "{{{ not yaml").unwrap();

        f.log.push(event(EventAction::Start, "w1", "svc-a"));
        f.reconciler.cycle(&f.log).await;

        // Nothing written, nothing reloaded.
        assert_eq!(
            std::fs::read_to_string(f.targets.path()).unwrap(),
            "{{{ not yaml"
        );
        assert_eq!(f.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cycle_with_no_new_events_leaves_state_unchanged() {
        let f = fixture(StaticRuntime::new().with_host_port("w1", "2112/tcp", "32000")).await;
        f.log.push(event(EventAction::Start, "w1", "svc-a"));
        f.reconciler.cycle(&f.log).await;

        let published = std::fs::read_to_string(f.targets.path()).unwrap();

        // Second cycle drains nothing and must not touch the file.
        f.reconciler.cycle(&f.log).await;
        assert_eq!(std::fs::read_to_string(f.targets.path()).unwrap(), published);
        assert_eq!(f.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reload_is_attempted_even_when_publish_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A missing parent directory: load treats the absent file as empty
        // state, but every write fails.
        let unwritable = dir.path().join("missing-subdir").join("prometheus.yaml");

        let (endpoint, reloads) = reload_server().await;
        let reconciler = Reconciler::new(
            Arc::new(StaticRuntime::new().with_host_port("w1", "2112/tcp", "32000")),
            TargetsFile::new(&unwritable, "60s"),
            ReloadClient::new(endpoint, Duration::from_millis(500)),
            ReconcileConfig::default(),
        );

        let log = EventLog::new();
        log.push(event(EventAction::Start, "w1", "svc-a"));
        reconciler.cycle(&log).await;

        assert_eq!(reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_reloader_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let targets = TargetsFile::new(dir.path().join("prometheus.yaml"), "60s");
        let reconciler = Reconciler::new(
            Arc::new(StaticRuntime::new().with_host_port("w1", "2112/tcp", "32000")),
            targets.clone(),
            ReloadClient::new("http://127.0.0.1:1/-/reload", Duration::from_millis(100)),
            ReconcileConfig::default(),
        );

        let log = EventLog::new();
        log.push(event(EventAction::Start, "w1", "svc-a"));
        reconciler.cycle(&log).await;

        // Publish still happened.
        assert_eq!(
            targets.load().unwrap()["svc-a"],
            "host.docker.internal:32000"
        );
    }
}
