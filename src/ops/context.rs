use crate::base::neterror::NetError;
use crate::ops::config::Config;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Per-call deadline plus an optional bound capability set.
///
/// Contexts are cheap to clone and immutable; the `with_*` methods derive
/// new contexts. A derived deadline never extends the parent's.
#[derive(Clone, Default)]
pub struct Context {
    config: Option<Arc<Config>>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context with no deadline and no bound config.
    pub fn background() -> Self {
        Self::default()
    }

    /// Binds a capability set. Operations invoked with the derived context
    /// dispatch through `config` instead of the process default.
    pub fn with_config(&self, config: Arc<Config>) -> Self {
        Self {
            config: Some(config),
            deadline: self.deadline,
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            config: self.config.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| d <= Instant::now())
    }

    pub fn config(&self) -> Option<&Arc<Config>> {
        self.config.as_ref()
    }

    /// Returns the bound config, or the process-wide default.
    pub fn config_or_default(&self) -> Arc<Config> {
        match &self.config {
            Some(config) => config.clone(),
            None => Config::shared_default(),
        }
    }

    /// Runs `fut` until it completes or the deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, NetError>
    where
        F: Future<Output = Result<T, NetError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut).await?,
            None => fut.await,
        }
    }

    /// Like [`Context::run`], additionally bounded by `timeout`.
    pub async fn run_with_timeout<T, F>(&self, timeout: Duration, fut: F) -> Result<T, NetError>
    where
        F: Future<Output = Result<T, NetError>>,
    {
        self.with_timeout(timeout).run(fut).await
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("has_config", &self.config.is_some())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_derived_deadline_never_extends() {
        let ctx = Context::background().with_timeout(Duration::from_secs(1));
        let outer = ctx.deadline().unwrap();
        let longer = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(longer.deadline(), Some(outer));
        let shorter = ctx.with_timeout(Duration::from_millis(10));
        assert!(shorter.deadline().unwrap() < outer);
    }

    #[tokio::test]
    async fn test_with_config_keeps_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let bound = ctx.with_config(Config::shared_default());
        assert_eq!(bound.deadline(), ctx.deadline());
        assert!(bound.config().is_some());
        assert!(ctx.config().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out() {
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let result: Result<(), NetError> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(NetError::DeadlineExceeded)));
        assert!(ctx.is_expired());
    }

    #[tokio::test]
    async fn test_run_without_deadline() {
        let ctx = Context::background();
        let value = ctx.run(async { Ok::<_, NetError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!ctx.is_expired());
    }
}
