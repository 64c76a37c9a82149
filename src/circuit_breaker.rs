//! Circuit breaker for external venue calls
//!
//! Wraps any async call against a remote service with failure isolation,
//! timeout enforcement and fallback execution, so one unhealthy venue
//! cannot cascade into unbounded latency.
//!
//! State machine:
//!
//! ```text
//! CLOSED -> OPEN       (failure_threshold consecutive failures)
//! OPEN -> HALF_OPEN    (reset_timeout elapsed; evaluated lazily on the
//!                       next state query or call attempt - no timers)
//! HALF_OPEN -> CLOSED  (success_threshold consecutive probe successes)
//! HALF_OPEN -> OPEN    (any probe failure; reset clock restarts)
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures (since the last success) that open the circuit
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the circuit
    pub success_threshold: u32,
    /// Per-call deadline; an overrun counts as a failure
    pub timeout: Duration,
    /// Time spent open before the next observation goes half-open
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Failure reported by a breaker-wrapped call. `Open` and `Timeout` mean
/// the venue was never reached (or abandoned); `Inner` carries the venue's
/// own error.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E>
where
    E: std::error::Error,
{
    #[error("Circuit breaker '{0}' is open")]
    Open(String),
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Seconds since the most recent failure, if any
    pub last_failure_secs_ago: Option<f64>,
    pub total_requests: u64,
}

pub type StateChangeListener = Box<dyn Fn(CircuitState, CircuitState) + Send + Sync>;
pub type OutcomeListener = Box<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Consecutive failures since the last success
    failure_count: u32,
    /// Consecutive successes while half-open
    success_count: u32,
    last_failure_time: Option<Instant>,
    opened_at: Option<Instant>,
    /// Single-probe gate while half-open
    probe_in_flight: bool,
    total_requests: u64,
}

/// One instance guards one protected call site (venue connection).
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
    on_state_change: Mutex<Vec<StateChangeListener>>,
    on_success: Mutex<Vec<OutcomeListener>>,
    on_failure: Mutex<Vec<OutcomeListener>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                opened_at: None,
                probe_in_flight: false,
                total_requests: 0,
            }),
            on_state_change: Mutex::new(Vec::new()),
            on_success: Mutex::new(Vec::new()),
            on_failure: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ==========================================
    // Observability
    // ==========================================

    /// Operators alert on state flips without polling
    pub fn on_state_change(&self, listener: StateChangeListener) {
        self.on_state_change.lock().push(listener);
    }

    pub fn on_success(&self, listener: OutcomeListener) {
        self.on_success.lock().push(listener);
    }

    pub fn on_failure(&self, listener: OutcomeListener) {
        self.on_failure.lock().push(listener);
    }

    fn notify_state_change(&self, from: CircuitState, to: CircuitState) {
        for listener in self.on_state_change.lock().iter() {
            listener(from, to);
        }
    }

    fn notify_success(&self) {
        for listener in self.on_success.lock().iter() {
            listener();
        }
    }

    fn notify_failure(&self) {
        for listener in self.on_failure.lock().iter() {
            listener();
        }
    }

    /// Current state. Querying performs the lazy Open -> HalfOpen check
    /// and mutates if the reset timeout is due.
    pub fn state(&self) -> CircuitState {
        let transition = {
            let mut inner = self.inner.lock();
            self.check_reset_due(&mut inner)
        };
        if let Some((from, to)) = transition {
            self.notify_state_change(from, to);
        }
        self.inner.lock().state
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let state = self.state();
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_secs_ago: inner.last_failure_time.map(|t| t.elapsed().as_secs_f64()),
            total_requests: inner.total_requests,
        }
    }

    // ==========================================
    // State transitions (all under the inner lock)
    // ==========================================

    fn check_reset_due(&self, inner: &mut BreakerInner) -> Option<(CircuitState, CircuitState)> {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    inner.probe_in_flight = false;
                    debug!("Circuit '{}' half-open after reset timeout", self.name);
                    return Some((CircuitState::Open, CircuitState::HalfOpen));
                }
            }
        }
        None
    }

    fn trip_open(&self, inner: &mut BreakerInner, from: CircuitState) -> (CircuitState, CircuitState) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.success_count = 0;
        inner.probe_in_flight = false;
        warn!(
            "Circuit '{}' opened after {} consecutive failures",
            self.name, inner.failure_count
        );
        (from, CircuitState::Open)
    }

    fn record_success(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.failure_count = 0;
            match inner.state {
                CircuitState::HalfOpen => {
                    inner.success_count += 1;
                    inner.probe_in_flight = false;
                    if inner.success_count >= self.config.success_threshold {
                        inner.state = CircuitState::Closed;
                        inner.success_count = 0;
                        inner.opened_at = None;
                        info!("Circuit '{}' closed after successful probes", self.name);
                        Some((CircuitState::HalfOpen, CircuitState::Closed))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };
        if let Some((from, to)) = transition {
            self.notify_state_change(from, to);
        }
        self.notify_success();
    }

    fn record_failure(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.failure_count += 1;
            inner.last_failure_time = Some(Instant::now());
            match inner.state {
                CircuitState::Closed => {
                    if inner.failure_count >= self.config.failure_threshold {
                        Some(self.trip_open(&mut inner, CircuitState::Closed))
                    } else {
                        None
                    }
                }
                // Any half-open failure reopens immediately and restarts
                // the reset clock
                CircuitState::HalfOpen => Some(self.trip_open(&mut inner, CircuitState::HalfOpen)),
                CircuitState::Open => None,
            }
        };
        if let Some((from, to)) = transition {
            self.notify_state_change(from, to);
        }
        self.notify_failure();
    }

    /// Reserve the right to make a call; false means the circuit refused.
    fn try_acquire(&self) -> bool {
        let (permitted, transition) = {
            let mut inner = self.inner.lock();
            let transition = self.check_reset_due(&mut inner);
            let permitted = match inner.state {
                CircuitState::Closed => true,
                // Only one probe at a time; everyone else fails fast
                CircuitState::HalfOpen => {
                    if inner.probe_in_flight {
                        false
                    } else {
                        inner.probe_in_flight = true;
                        true
                    }
                }
                CircuitState::Open => false,
            };
            if permitted {
                inner.total_requests += 1;
            }
            (permitted, transition)
        };
        if let Some((from, to)) = transition {
            self.notify_state_change(from, to);
        }
        permitted
    }

    // ==========================================
    // Execution
    // ==========================================

    /// Run `operation` under the breaker. Timeouts count as failures and
    /// drop the underlying future - a late completion is discarded, never
    /// applied.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        E: std::error::Error,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(CircuitBreakerError::Open(self.name.clone()));
        }

        match tokio::time::timeout(self.config.timeout, operation()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
            Err(_) => {
                self.record_failure();
                Err(CircuitBreakerError::Timeout(self.config.timeout))
            }
        }
    }

    /// Like `execute`, but on any primary failure - venue error, timeout,
    /// or open circuit - the fallback runs instead. The fallback itself is
    /// not protected by the breaker.
    pub async fn execute_with_fallback<T, E, F, Fut, Fb, FbFut>(
        &self,
        operation: F,
        fallback: Fb,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        E: std::error::Error,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Fb: FnOnce() -> FbFut,
        FbFut: Future<Output = Result<T, E>>,
    {
        match self.execute(operation).await {
            Ok(value) => Ok(value),
            Err(primary) => {
                debug!("Circuit '{}' primary failed ({}), using fallback", self.name, primary);
                fallback().await.map_err(CircuitBreakerError::Inner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Error)]
    #[error("venue down")]
    struct VenueDown;

    fn quick_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_millis(50),
            reset_timeout: Duration::from_millis(80),
        }
    }

    async fn fail(breaker: &CircuitBreaker) {
        let _ = breaker.execute(|| async { Err::<(), _>(VenueDown) }).await;
    }

    async fn succeed(breaker: &CircuitBreaker) {
        breaker
            .execute(|| async { Ok::<_, VenueDown>(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new("test", quick_config());
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn a_success_resets_the_consecutive_count() {
        let breaker = CircuitBreaker::new("test", quick_config());
        fail(&breaker).await;
        fail(&breaker).await;
        succeed(&breaker).await;
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_circuit_fails_fast_without_invoking() {
        let breaker = CircuitBreaker::new("test", quick_config());
        for _ in 0..3 {
            fail(&breaker).await;
        }

        let invocations = AtomicU32::new(0);
        let result = breaker
            .execute(|| {
                invocations.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), VenueDown>(()) }
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recovers_through_half_open_probes() {
        let breaker = CircuitBreaker::new("test", quick_config());
        for _ in 0..3 {
            fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        // Lazy transition: observing state after the reset timeout is what
        // moves the breaker to half-open
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.stats().failure_count, 0);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("test", quick_config());
        for _ in 0..3 {
            fail(&breaker).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        // The reset clock restarted; still open before the timeout
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure_and_abandons_the_call() {
        let breaker = CircuitBreaker::new("test", quick_config());
        let completed = Arc::new(AtomicBool::new(false));

        let flag = completed.clone();
        let result = breaker
            .execute(|| async move {
                tokio::time::sleep(Duration::from_millis(400)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<(), VenueDown>(())
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::Timeout(_))));
        assert_eq!(breaker.stats().failure_count, 1);

        // The timed-out future was dropped: its late completion never runs
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fallback_runs_on_failure_and_on_open_circuit() {
        let breaker = CircuitBreaker::new("test", quick_config());

        let value = breaker
            .execute_with_fallback(|| async { Err(VenueDown) }, || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);

        for _ in 0..3 {
            fail(&breaker).await;
        }
        let invocations = AtomicU32::new(0);
        let value = breaker
            .execute_with_fallback(
                || {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    async { Err(VenueDown) }
                },
                || async { Ok(7) },
            )
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(invocations.load(Ordering::SeqCst), 0, "open circuit skips the primary");
    }

    #[tokio::test]
    async fn listeners_observe_transitions_and_outcomes() {
        let breaker = CircuitBreaker::new("test", quick_config());
        let flips = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(AtomicU32::new(0));

        let flips_out = flips.clone();
        breaker.on_state_change(Box::new(move |from, to| {
            flips_out.lock().push((from, to));
        }));
        let failure_count = failures.clone();
        breaker.on_failure(Box::new(move || {
            failure_count.fetch_add(1, Ordering::SeqCst);
        }));

        for _ in 0..3 {
            fail(&breaker).await;
        }
        assert_eq!(failures.load(Ordering::SeqCst), 3);
        assert_eq!(
            flips.lock().as_slice(),
            &[(CircuitState::Closed, CircuitState::Open)]
        );
    }

    #[tokio::test]
    async fn stats_track_totals() {
        let breaker = CircuitBreaker::new("test", quick_config());
        succeed(&breaker).await;
        fail(&breaker).await;
        let stats = breaker.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.failure_count, 1);
        assert!(stats.last_failure_secs_ago.is_some());
    }
}
