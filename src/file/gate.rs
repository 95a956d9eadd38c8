//! One-shot, multi-waiter completion signal for media analysis.

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    Pending,
    Done,
    Failed(String),
}

impl AnalysisStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, AnalysisStatus::Pending)
    }
}

/// Completion gate backed by a `watch` channel.
///
/// A single writer settles the gate once; every waiter observes the settled
/// status. Only [`AnalysisGate::reset`] moves a failed gate back to pending.
#[derive(Debug)]
pub struct AnalysisGate {
    tx: watch::Sender<AnalysisStatus>,
}

impl AnalysisGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AnalysisStatus::Pending);
        Self { tx }
    }

    pub fn status(&self) -> AnalysisStatus {
        self.tx.borrow().clone()
    }

    /// Settle as done. Returns `false` if the gate was already settled.
    pub fn complete(&self) -> bool {
        self.settle(AnalysisStatus::Done)
    }

    /// Settle as failed. Returns `false` if the gate was already settled.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.settle(AnalysisStatus::Failed(reason.into()))
    }

    /// Re-arm a failed gate. Done gates stay done.
    pub fn reset(&self) -> bool {
        self.tx.send_if_modified(|status| {
            if matches!(status, AnalysisStatus::Failed(_)) {
                *status = AnalysisStatus::Pending;
                true
            } else {
                false
            }
        })
    }

    /// Wait until the gate is settled and return the settled status.
    pub async fn wait(&self) -> AnalysisStatus {
        let mut rx = self.tx.subscribe();
        let status = match rx.wait_for(AnalysisStatus::is_settled).await {
            Ok(status) => status.clone(),
            // The sender lives as long as `self`.
            Err(_) => self.status(),
        };
        status
    }

    fn settle(&self, next: AnalysisStatus) -> bool {
        self.tx.send_if_modified(|status| {
            if status.is_settled() {
                false
            } else {
                *status = next;
                true
            }
        })
    }
}

impl Default for AnalysisGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_complete_wakes_every_waiter() {
        let gate = Arc::new(AnalysisGate::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(gate.complete());

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), AnalysisStatus::Done);
        }
    }

    #[tokio::test]
    async fn test_wait_after_completion_returns_immediately() {
        let gate = AnalysisGate::new();
        gate.complete();
        assert_eq!(gate.wait().await, AnalysisStatus::Done);
    }

    #[test]
    fn test_settling_is_idempotent() {
        let gate = AnalysisGate::new();
        assert!(gate.complete());
        assert!(!gate.complete());
        assert!(!gate.fail("late"));
        assert_eq!(gate.status(), AnalysisStatus::Done);
    }

    #[test]
    fn test_reset_only_rearms_failures() {
        let gate = AnalysisGate::new();
        assert!(!gate.reset());

        gate.fail("unreadable container");
        assert_eq!(
            gate.status(),
            AnalysisStatus::Failed("unreadable container".into())
        );
        assert!(gate.reset());
        assert_eq!(gate.status(), AnalysisStatus::Pending);

        gate.complete();
        assert!(!gate.reset());
    }
}
