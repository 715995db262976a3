//! Readiness polling.
//!
//! [`wait_ready`] probes a URL once per interval until it answers, the
//! optional deadline passes, or the owning process exits, whichever comes
//! first. Connection refusals, timeouts, and error statuses all count as
//! "not ready yet".

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::RuntimeError;
use crate::service::ReadinessCheck;

/// A single readiness probe against `url`.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_ready(&self, url: &str) -> bool;
}

/// `GET url`, ready on any 2xx/3xx answer.
#[derive(Clone)]
pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(request_timeout).build();
        Self { agent }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn is_ready(&self, url: &str) -> bool {
        let agent = self.agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || probe_once(&agent, &url))
            .await
            .unwrap_or(false)
    }
}

fn probe_once(agent: &ureq::Agent, url: &str) -> bool {
    match agent.get(url).call() {
        Ok(response) => (200..400).contains(&response.status()),
        Err(ureq::Error::Status(status, _)) => {
            tracing::debug!(url, status, "readiness probe got error status");
            false
        }
        Err(ureq::Error::Transport(err)) => {
            tracing::trace!(url, error = %err, "readiness probe transport error");
            false
        }
    }
}

/// How long a successful wait took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Block the caller until `check.url` is ready.
///
/// `exited` resolves with the owner's exit code when the owning process
/// dies; the wait is then abandoned with [`RuntimeError::DependencyExited`].
/// Exhausting `check.max_wait` yields [`RuntimeError::DependencyUnavailable`].
pub async fn wait_ready<F>(
    name: &str,
    probe: &dyn Probe,
    check: &ReadinessCheck,
    exited: F,
) -> Result<Ready, RuntimeError>
where
    F: Future<Output = i32>,
{
    let started = Instant::now();
    // A bound too large to represent as an instant is no bound at all.
    let deadline_at = check.max_wait.and_then(|max_wait| started.checked_add(max_wait));
    let deadline = async {
        match deadline_at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(exited);

    let unavailable = |started: Instant| RuntimeError::DependencyUnavailable {
        name: name.to_string(),
        url: check.url.clone(),
        waited: started.elapsed(),
    };
    let dependency_exited = |code: i32| RuntimeError::DependencyExited {
        name: name.to_string(),
        code,
    };

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let ready = tokio::select! {
            biased;
            code = &mut exited => return Err(dependency_exited(code)),
            _ = &mut deadline => return Err(unavailable(started)),
            ready = probe.is_ready(&check.url) => ready,
        };

        if ready {
            let elapsed = started.elapsed();
            tracing::info!(
                service = name,
                url = %check.url,
                attempts,
                elapsed_ms = elapsed.as_millis() as u64,
                "service is ready",
            );
            return Ok(Ready { attempts, elapsed });
        }
        tracing::debug!(service = name, url = %check.url, attempt = attempts, "not ready yet");

        tokio::select! {
            biased;
            code = &mut exited => return Err(dependency_exited(code)),
            _ = &mut deadline => return Err(unavailable(started)),
            _ = tokio::time::sleep(check.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio_test::{assert_pending, assert_ready};

    use super::*;

    /// Not ready for the first `failures` probes, ready afterwards.
    struct CountingProbe {
        failures: u32,
        calls: AtomicU32,
    }

    impl CountingProbe {
        fn ready_after(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Probe for CountingProbe {
        async fn is_ready(&self, _url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) >= self.failures
        }
    }

    fn check(interval_secs: u64, max_wait_secs: Option<u64>) -> ReadinessCheck {
        ReadinessCheck {
            url: "http://127.0.0.1:8000/docs".to_string(),
            interval: Duration::from_secs(interval_secs),
            max_wait: max_wait_secs.map(Duration::from_secs),
        }
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn returns_after_exactly_n_intervals() {
        let probe = CountingProbe::ready_after(4);
        let started = Instant::now();

        let ready = wait_ready("backend", &probe, &check(1, None), std::future::pending())
            .await
            .expect("ready");

        assert_eq!(ready.attempts, 5);
        assert_eq!(probe.calls(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(ready.elapsed, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn immediately_ready_service_needs_one_probe() {
        let probe = CountingProbe::ready_after(0);
        let ready = wait_ready("backend", &probe, &check(1, Some(10)), std::future::pending())
            .await
            .expect("ready");
        assert_eq!(ready.attempts, 1);
        assert_eq!(ready.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn never_returns_before_success_is_observed() {
        let probe = CountingProbe::ready_after(3);
        let check = check(2, None);
        let mut wait = tokio_test::task::spawn(wait_ready(
            "frontend",
            &probe,
            &check,
            std::future::pending(),
        ));

        for _ in 0..3 {
            assert_pending!(wait.poll());
            tokio::time::advance(Duration::from_secs(2)).await;
        }
        let ready = assert_ready!(wait.poll()).expect("ready");
        assert_eq!(ready.attempts, 4);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn bounded_wait_fails_with_dependency_unavailable() {
        let probe = CountingProbe::ready_after(u32::MAX);
        let started = Instant::now();

        let err = wait_ready("backend", &probe, &check(1, Some(5)), std::future::pending())
            .await
            .unwrap_err();

        assert!(
            matches!(err, RuntimeError::DependencyUnavailable { ref name, .. } if name == "backend"),
            "got: {err}"
        );
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(err.to_string().contains("within 5s"));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn huge_bound_behaves_as_unbounded() {
        let probe = CountingProbe::ready_after(2);
        let check = ReadinessCheck {
            max_wait: Some(Duration::from_secs(u64::MAX)),
            ..check(1, None)
        };

        let ready = wait_ready("backend", &probe, &check, std::future::pending())
            .await
            .expect("ready");

        assert_eq!(ready.attempts, 3);
        assert_eq!(ready.elapsed, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn owner_exit_cancels_the_wait() {
        let probe = CountingProbe::ready_after(u32::MAX);
        let started = Instant::now();
        let exited = async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            3
        };

        let err = wait_ready("backend", &probe, &check(1, None), exited)
            .await
            .unwrap_err();

        assert!(
            matches!(err, RuntimeError::DependencyExited { code: 3, .. }),
            "got: {err}"
        );
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
        assert_eq!(probe.calls(), 3);
    }
}
