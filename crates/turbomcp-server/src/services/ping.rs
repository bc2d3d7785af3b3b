//! Ping / heartbeat service: connection liveness via a phi-accrual failure
//! detector (spec.md §4.17).
//!
//! Unlike a fixed missed-heartbeat-count detector, phi-accrual adapts its
//! suspicion threshold to the peer's own jitter: a peer with a noisy but
//! consistent RTT won't trip false positives the way a hard timeout would.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponsePayload};
use turbomcp_core::session::{Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;

use crate::error::ServerResult;
use crate::session::SessionManager;

/// Maximum pings in flight at once during one heartbeat tick, so a fleet of
/// thousands of sessions doesn't open thousands of concurrent outbound
/// requests in the same instant.
const MAX_CONCURRENT_PINGS: usize = 64;

type SuspectHook = Box<dyn Fn(Arc<Session>, f64) + Send + Sync>;
type DownHook = Box<dyn Fn(Arc<Session>) + Send + Sync>;

const RING_CAPACITY: usize = 32;
const DEFAULT_PHI_THRESHOLD: f64 = 3.0;
const DEFAULT_FAILURE_BUDGET: u32 = 3;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessStatus {
    Alive,
    Suspect,
    Down,
}

/// One session's heartbeat history: a ring buffer of inter-arrival
/// intervals feeding a phi-accrual estimate, plus a consecutive-failure
/// counter for outright timeouts (spec.md §4.17 "Detector state").
pub struct PhiAccrualDetector {
    intervals: Mutex<VecDeque<f64>>,
    last_heartbeat: Mutex<Option<Instant>>,
    consecutive_failures: AtomicU32,
    phi_threshold: f64,
    failure_budget: u32,
}

impl Default for PhiAccrualDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PHI_THRESHOLD, DEFAULT_FAILURE_BUDGET)
    }
}

impl PhiAccrualDetector {
    pub fn new(phi_threshold: f64, failure_budget: u32) -> Self {
        Self {
            intervals: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
            last_heartbeat: Mutex::new(None),
            consecutive_failures: AtomicU32::new(0),
            phi_threshold,
            failure_budget,
        }
    }

    /// Record a successful heartbeat arriving now, resetting the failure
    /// counter and feeding this interval into the ring buffer.
    pub fn touch(&self) {
        let now = Instant::now();
        let mut last = self.last_heartbeat.lock();
        if let Some(previous) = *last {
            let mut intervals = self.intervals.lock();
            if intervals.len() == RING_CAPACITY {
                intervals.pop_front();
            }
            intervals.push_back(now.duration_since(previous).as_secs_f64());
        }
        *last = Some(now);
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn mean_interval(&self) -> Option<f64> {
        let intervals = self.intervals.lock();
        if intervals.is_empty() {
            return None;
        }
        Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
    }

    /// phi = -log10(1 - (1 - exp(-t/mu))), which reduces to t/(mu * ln 10);
    /// the reduced form avoids taking a log of a value near zero (spec.md
    /// §4.17 "phi formula").
    fn phi(&self) -> f64 {
        let Some(mu) = self.mean_interval().filter(|mu| *mu > 0.0) else {
            return 0.0;
        };
        let Some(last) = *self.last_heartbeat.lock() else {
            return 0.0;
        };
        let t = last.elapsed().as_secs_f64();
        t / (mu * std::f64::consts::LN_10)
    }

    pub fn status(&self) -> LivenessStatus {
        if self.consecutive_failures.load(Ordering::SeqCst) > self.failure_budget {
            LivenessStatus::Down
        } else if self.phi() > self.phi_threshold {
            LivenessStatus::Suspect
        } else {
            LivenessStatus::Alive
        }
    }
}

/// Sends `ping` requests and tracks liveness per session.
pub struct PingService {
    detectors: Mutex<HashMap<SessionId, Arc<PhiAccrualDetector>>>,
    timeout: Duration,
    on_suspect: Mutex<Option<SuspectHook>>,
    on_down: Mutex<Option<DownHook>>,
}

impl Default for PingService {
    fn default() -> Self {
        Self::new(DEFAULT_PING_TIMEOUT)
    }
}

impl PingService {
    pub fn new(timeout: Duration) -> Self {
        Self {
            detectors: Mutex::new(HashMap::new()),
            timeout,
            on_suspect: Mutex::new(None),
            on_down: Mutex::new(None),
        }
    }

    /// Install the hook invoked when a session's detector first crosses the
    /// suspect threshold on a heartbeat tick (spec.md §4.17 "On suspect
    /// invoke `on_suspect(session, φ)`"). Replaces any previously-set hook.
    pub fn set_on_suspect(&self, hook: impl Fn(Arc<Session>, f64) + Send + Sync + 'static) {
        *self.on_suspect.lock() = Some(Box::new(hook));
    }

    /// Install the hook invoked when a session is declared down and about to
    /// be discarded from the heartbeat set (spec.md §4.17 "On down invoke
    /// `on_down(session)` and discard the session").
    pub fn set_on_down(&self, hook: impl Fn(Arc<Session>) + Send + Sync + 'static) {
        *self.on_down.lock() = Some(Box::new(hook));
    }

    pub fn detector_for(&self, session_id: &SessionId) -> Arc<PhiAccrualDetector> {
        Arc::clone(
            self.detectors
                .lock()
                .entry(session_id.clone())
                .or_insert_with(|| Arc::new(PhiAccrualDetector::default())),
        )
    }

    pub fn remove(&self, session_id: &SessionId) {
        self.detectors.lock().remove(session_id);
    }

    /// Reset a session's suspicion clock without sending a ping — useful
    /// when ordinary request traffic just arrived and re-pinging would be
    /// redundant (spec.md §4.17 "`touch(session)` resets the suspicion
    /// clock without sending a ping").
    pub fn touch(&self, session_id: &SessionId) {
        self.detector_for(session_id).touch();
    }

    /// Send one `ping` and wait up to the configured timeout for the pong,
    /// updating that session's detector either way.
    pub async fn ping(&self, sink: &dyn TransportSink, session: &Arc<Session>) -> ServerResult<()> {
        let detector = self.detector_for(&session.id);
        let (id, receiver) = session.begin_outbound();
        let wire = JsonRpcMessage::Request(JsonRpcRequest::new(methods::PING, None, id.clone()));

        if sink.send(&session.id, wire).await.is_err() {
            session.abandon_outbound(&id);
            detector.record_failure();
            return Err(McpError::ServiceUnavailable("failed to deliver ping".to_string()));
        }

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(JsonRpcResponsePayload::Success { .. })) => {
                detector.touch();
                Ok(())
            }
            Ok(Ok(JsonRpcResponsePayload::Error { error })) => {
                detector.record_failure();
                Err(McpError::InvalidParamsWithData(error.message, serde_json::json!({"code": error.code})))
            }
            Ok(Err(_)) => {
                detector.record_failure();
                Err(McpError::Internal("ping response channel dropped".to_string()))
            }
            Err(_) => {
                session.abandon_outbound(&id);
                detector.record_failure();
                Err(McpError::ServiceUnavailable("ping timed out".to_string()))
            }
        }
    }

    /// Runs forever: sleep a jittered interval, ping every session the
    /// `SessionManager` currently knows about (bounded to
    /// `MAX_CONCURRENT_PINGS` in flight at once), classify each via its
    /// detector, and fire `on_suspect`/`on_down` on transition (spec.md
    /// §4.17 "Heartbeat loop"). A session found `Down` is dropped from both
    /// this service and the session table, mirroring a transport disconnect.
    ///
    /// Exits only if the service itself is dropped (its `Arc` strong count
    /// hits zero); the caller spawns this as a background task and is not
    /// expected to join it.
    pub async fn run_heartbeat_loop(self: Arc<Self>, sink: Arc<dyn TransportSink>, sessions: SessionManager, base_interval: Duration) {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PINGS));
        loop {
            tokio::time::sleep(jittered_heartbeat_interval(base_interval)).await;

            let active = sessions.snapshot();
            let mut tasks = Vec::with_capacity(active.len());
            for session in active {
                let service = Arc::clone(&self);
                let sink = Arc::clone(&sink);
                let sessions = sessions.clone();
                let permit = Arc::clone(&semaphore);
                tasks.push(tokio::spawn(async move {
                    let _permit = permit.acquire_owned().await.ok();
                    let _ = service.ping(sink.as_ref(), &session).await;

                    let detector = service.detector_for(&session.id);
                    match detector.status() {
                        LivenessStatus::Suspect => {
                            if let Some(hook) = service.on_suspect.lock().as_ref() {
                                hook(Arc::clone(&session), detector.phi());
                            }
                        }
                        LivenessStatus::Down => {
                            if let Some(hook) = service.on_down.lock().as_ref() {
                                hook(Arc::clone(&session));
                            }
                            service.remove(&session.id);
                            sessions.remove(&session.id);
                        }
                        LivenessStatus::Alive => {}
                    }
                }));
                tokio::task::yield_now().await;
            }
            for task in tasks {
                let _ = task.await;
            }
        }
    }
}

/// The next heartbeat interval, jittered ±20% around the base interval so a
/// large fleet of sessions doesn't synchronize their pings (spec.md §4.17
/// "Heartbeat interval").
pub fn jittered_heartbeat_interval(base: Duration) -> Duration {
    let jitter = rand::thread_rng().gen_range(-0.2..=0.2);
    let factor = 1.0 + jitter;
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_detector_is_alive() {
        let detector = PhiAccrualDetector::default();
        assert_eq!(detector.status(), LivenessStatus::Alive);
    }

    #[test]
    fn consecutive_failures_past_budget_are_down() {
        let detector = PhiAccrualDetector::new(3.0, 2);
        detector.record_failure();
        detector.record_failure();
        assert_eq!(detector.status(), LivenessStatus::Alive);
        detector.record_failure();
        assert_eq!(detector.status(), LivenessStatus::Down);
    }

    #[test]
    fn touch_resets_failure_count() {
        let detector = PhiAccrualDetector::new(3.0, 1);
        detector.record_failure();
        detector.record_failure();
        detector.touch();
        assert_eq!(detector.status(), LivenessStatus::Alive);
    }

    #[test]
    fn jittered_interval_stays_within_twenty_percent() {
        let base = Duration::from_secs(5);
        for _ in 0..50 {
            let jittered = jittered_heartbeat_interval(base);
            assert!(jittered >= Duration::from_secs_f64(4.0) && jittered <= Duration::from_secs_f64(6.0));
        }
    }

    #[derive(Default)]
    struct UnresponsiveSink;

    #[async_trait::async_trait]
    impl TransportSink for UnresponsiveSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> turbomcp_core::transport::TransportResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn heartbeat_loop_declares_an_unresponsive_session_down_and_prunes_it() {
        let service = Arc::new(PingService::new(Duration::from_millis(5)));
        let down: Arc<Mutex<Vec<SessionId>>> = Arc::new(Mutex::new(Vec::new()));
        let down_for_hook = Arc::clone(&down);
        service.set_on_down(move |session| down_for_hook.lock().push(session.id.clone()));

        let sessions = SessionManager::new();
        let session = sessions.get_or_create(&SessionId::generate());

        let loop_service = Arc::clone(&service);
        let loop_sessions = sessions.clone();
        let handle = tokio::spawn(loop_service.run_heartbeat_loop(Arc::new(UnresponsiveSink), loop_sessions, Duration::from_millis(5)));

        // Every tick against `UnresponsiveSink` times out and records a
        // failure; with the default failure_budget of 3 this needs four
        // ticks, so give it generous wall-clock room before asserting.
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.abort();

        assert_eq!(down.lock().as_slice(), &[session.id.clone()]);
        assert!(sessions.get(&session.id).is_none());
    }
}
