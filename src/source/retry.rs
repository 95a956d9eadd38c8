//! Refresh-and-retry wrapper for bearer-token APIs.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::SourceError;

/// Retry policy applied to every authenticated call.
///
/// A 401 triggers a login exchange followed by a retry of the original call.
/// The first refresh happens immediately; when the server keeps rejecting the
/// refreshed session, later cycles sleep with doubling backoff. After
/// `max_refreshes` logins the call fails with [`SourceError::AuthExhausted`].
/// Any other error is returned as-is without retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRetryPolicy {
    pub max_refreshes: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for AuthRetryPolicy {
    fn default() -> Self {
        Self {
            max_refreshes: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl AuthRetryPolicy {
    /// Backoff slept before refresh number `refresh` (0-based).
    pub fn backoff_for(&self, refresh: u32) -> Duration {
        if refresh == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(refresh - 1);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `call`, refreshing the session with `login` on 401.
    pub async fn run<T, Call, CallFut, Login, LoginFut>(
        &self,
        service: &'static str,
        mut call: Call,
        mut login: Login,
    ) -> Result<T, SourceError>
    where
        Call: FnMut() -> CallFut,
        CallFut: Future<Output = Result<T, SourceError>>,
        Login: FnMut() -> LoginFut,
        LoginFut: Future<Output = Result<(), SourceError>>,
    {
        let mut refreshes = 0u32;
        loop {
            match call().await {
                Err(err) if err.is_unauthorized() => {
                    if refreshes >= self.max_refreshes {
                        return Err(SourceError::AuthExhausted {
                            service,
                            attempts: refreshes,
                        });
                    }

                    let wait = self.backoff_for(refreshes);
                    warn!(
                        service,
                        refresh = refreshes + 1,
                        wait_ms = wait.as_millis() as u64,
                        "session rejected, logging in again"
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }

                    refreshes += 1;
                    login().await?;
                }
                other => return other,
            }
        }
    }
}
