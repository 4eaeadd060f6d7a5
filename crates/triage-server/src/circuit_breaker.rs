//! Circuit breaker around the sentiment provider.
//!
//! After `failure_threshold` consecutive provider failures the circuit opens
//! and sentiment calls fail fast, so predictions degrade to "no verdict"
//! without waiting on a broken backend. Once `recovery_timeout` has passed
//! the circuit goes half-open and lets `half_open_max_calls` trial calls through;
//! a successful trial closes it again, a failed one re-opens it.
//!
//! Every admitted call holds a [`CallPermit`]. A permit dropped before it is
//! settled (the call was cancelled by a timeout or a client disconnect)
//! counts as a failure, so an abandoned trial call can never leave the
//! circuit half-open with no trials left.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use triage_core::{CircuitBreakerConfig, Result, SentimentProvider, SentimentVerdict, TriageError};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected.
    Open,
    /// A limited number of trial calls pass through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_calls: u32,
    opened_at: Option<Instant>,
    half_opened_at: Option<Instant>,
}

impl Inner {
    fn trip(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.half_opened_at = None;
        self.half_open_calls = 0;
    }
}

/// A thread-safe consecutive-failure circuit breaker.
///
/// Either take a [`CallPermit`] with [`try_acquire`](Self::try_acquire) and
/// settle it, or call [`allow`](Self::allow) before the guarded operation and
/// report the outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure).
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    half_open_max_calls: u32,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a breaker. Zero thresholds are raised to one.
    #[must_use]
    pub fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        half_open_max_calls: u32,
    ) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            half_open_max_calls: half_open_max_calls.max(1),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_calls: 0,
                opened_at: None,
                half_opened_at: None,
            }),
        }
    }

    /// Create a breaker from configuration.
    #[must_use]
    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_millis(config.recovery_timeout_ms),
            config.half_open_max_calls,
        )
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves `Inner` consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the caller may proceed.
    ///
    /// A half-open window whose trial calls have not reported back within
    /// `recovery_timeout` falls back to open.
    pub fn allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.recovery_timeout);
                if recovered {
                    // This call is the first trial.
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 1;
                    inner.half_opened_at = Some(Instant::now());
                    tracing::info!("Sentiment circuit half-open, trying provider");
                }
                recovered
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.half_open_max_calls {
                    inner.half_open_calls += 1;
                    return true;
                }
                let stale = inner
                    .half_opened_at
                    .map_or(true, |at| at.elapsed() >= self.recovery_timeout);
                if stale {
                    inner.trip();
                    tracing::warn!("Sentiment trial calls never reported back, circuit re-opened");
                }
                false
            }
        }
    }

    /// Admit one call, or `None` while the circuit rejects calls.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        self.allow().then_some(CallPermit {
            breaker: self,
            settled: false,
        })
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.half_open_calls = 0;
            inner.opened_at = None;
            inner.half_opened_at = None;
            tracing::info!("Sentiment circuit closed");
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.trip();
                    tracing::warn!(
                        failures = inner.consecutive_failures,
                        "Sentiment circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.trip();
                tracing::warn!("Sentiment trial call failed, circuit re-opened");
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, for health reporting.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }
}

// ---------------------------------------------------------------------------
// Call permit (RAII outcome)
// ---------------------------------------------------------------------------

/// One admitted call.
///
/// Settle it with [`succeed`](Self::succeed) or [`fail`](Self::fail).
/// Dropping it unsettled records a failure.
#[must_use = "an unsettled permit records a failure when dropped"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl CallPermit<'_> {
    /// The call completed successfully.
    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    /// The call failed.
    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Sentiment call abandoned before completion");
            self.breaker.record_failure();
        }
    }
}

// ---------------------------------------------------------------------------
// Guarded provider
// ---------------------------------------------------------------------------

/// [`SentimentProvider`] decorator that routes calls through a
/// [`CircuitBreaker`].
///
/// Rejected input is the caller's fault and counts as a provider success.
/// With a call timeout set, a call that overruns it fails with
/// [`TriageError::ProviderFailure`] and counts against the breaker.
pub struct GuardedSentimentProvider {
    inner: Arc<dyn SentimentProvider>,
    breaker: Arc<CircuitBreaker>,
    call_timeout: Option<Duration>,
}

impl GuardedSentimentProvider {
    /// Wrap `inner` with `breaker`.
    pub fn new(inner: Arc<dyn SentimentProvider>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            inner,
            breaker,
            call_timeout: None,
        }
    }

    /// Bound every provider call by `timeout`.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// The breaker guarding this provider.
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    fn admit(&self) -> Result<CallPermit<'_>> {
        self.breaker.try_acquire().ok_or_else(|| {
            TriageError::ProviderFailure(format!("{} circuit is open", self.inner.name()))
        })
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let permit = self.admit()?;
        let result = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(TriageError::ProviderFailure(format!(
                    "{} timed out after {}ms",
                    self.inner.name(),
                    limit.as_millis()
                )))
            }),
            None => call.await,
        };
        match &result {
            Ok(_) | Err(TriageError::InvalidInput(_)) => permit.succeed(),
            Err(_) => permit.fail(),
        }
        result
    }
}

#[async_trait]
impl SentimentProvider for GuardedSentimentProvider {
    async fn analyze(&self, text: &str) -> Result<SentimentVerdict> {
        self.guarded(self.inner.analyze(text)).await
    }

    async fn batch_analyze(&self, texts: &[String]) -> Result<Vec<SentimentVerdict>> {
        self.guarded(self.inner.batch_analyze(texts)).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn health_check(&self) -> Result<()> {
        if self.breaker.state() == CircuitState::Open {
            return Err(TriageError::ProviderFailure("circuit is open".to_string()));
        }
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_closed_allows_calls() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(5), 1);
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_opens_after_consecutive_failures() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60), 1);
        for _ in 0..3 {
            assert!(cb.allow());
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60), 1);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_trial_success_closes() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        cb.record_failure();
        assert!(!cb.allow());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        // Only one trial call.
        assert!(!cb.allow());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_trial_failure_reopens() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10), 2);
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow());
        assert!(cb.allow());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow());
    }

    #[test]
    fn test_dropped_permit_counts_as_failure() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(60), 1);
        drop(cb.try_acquire().unwrap());
        assert_eq!(cb.state(), CircuitState::Closed);
        drop(cb.try_acquire().unwrap());
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.try_acquire().is_none());
    }

    #[test]
    fn test_dropped_half_open_permit_reopens() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        cb.try_acquire().unwrap().fail();
        std::thread::sleep(Duration::from_millis(20));

        let trial = cb.try_acquire().unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        drop(trial);
        assert_eq!(cb.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        cb.try_acquire().unwrap().succeed();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_unreported_half_open_window_expires() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));

        // Trial admitted but its outcome is never recorded.
        assert!(cb.allow());
        assert!(!cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        std::thread::sleep(Duration::from_millis(20));
        assert!(!cb.allow());
        assert_eq!(cb.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_from_config() {
        let cb = CircuitBreaker::from_config(&CircuitBreakerConfig::default());
        assert_eq!(cb.failure_threshold, 5);
        assert_eq!(cb.recovery_timeout, Duration::from_secs(30));
        assert_eq!(cb.half_open_max_calls, 1);
    }

    /// Fails every call and counts how often it was reached.
    struct CountingFailure {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SentimentProvider for CountingFailure {
        async fn analyze(&self, text: &str) -> Result<SentimentVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.trim().is_empty() {
                return Err(TriageError::InvalidInput("Input text cannot be empty".into()));
            }
            Err(TriageError::ProviderFailure("backend down".into()))
        }

        fn name(&self) -> &'static str {
            "CountingFailure"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Never answers within any reasonable timeout.
    struct Hanging {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SentimentProvider for Hanging {
        async fn analyze(&self, _text: &str) -> Result<SentimentVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(SentimentVerdict::from_scores(0.5, 0.5))
        }

        fn name(&self) -> &'static str {
            "Hanging"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_guarded_provider_fails_fast_when_open() {
        let inner = Arc::new(CountingFailure {
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(2, Duration::from_secs(60), 1));
        let guarded = GuardedSentimentProvider::new(inner.clone(), breaker.clone());

        assert!(guarded.analyze("hello").await.is_err());
        assert!(guarded.analyze("hello").await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(guarded.health_check().await.is_err());

        let err = guarded.analyze("hello").await.unwrap_err();
        assert!(matches!(err, TriageError::ProviderFailure(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_guarded_provider_ignores_invalid_input() {
        let inner = Arc::new(CountingFailure {
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(1, Duration::from_secs(60), 1));
        let guarded = GuardedSentimentProvider::new(inner, breaker.clone());

        for _ in 0..3 {
            let err = guarded.analyze("  ").await.unwrap_err();
            assert!(matches!(err, TriageError::InvalidInput(_)));
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(guarded.name(), "CountingFailure");
    }

    #[tokio::test]
    async fn test_guarded_timeouts_open_circuit() {
        let inner = Arc::new(Hanging {
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(2, Duration::from_secs(60), 1));
        let guarded = GuardedSentimentProvider::new(inner.clone(), breaker.clone())
            .with_call_timeout(Duration::from_millis(20));

        for _ in 0..2 {
            let err = guarded.analyze("hello").await.unwrap_err();
            assert!(err.to_string().contains("timed out"), "{err}");
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = guarded.analyze("hello").await.unwrap_err();
        assert!(err.to_string().contains("circuit is open"), "{err}");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_guarded_call_counts_as_failure() {
        let inner = Arc::new(Hanging {
            calls: AtomicU32::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(1, Duration::from_secs(60), 1));
        let guarded = GuardedSentimentProvider::new(inner, breaker.clone());

        // The caller gives up first; the guarded future is dropped mid-call.
        let outer = tokio::time::timeout(Duration::from_millis(20), guarded.analyze("hello")).await;
        assert!(outer.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
