//! Bounded polling.

use std::{future::Future, time::Duration};

use tokio::time::Instant;

use crate::AutomationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(100),
        }
    }
}

impl WaitOptions {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Polls `predicate` every `options.interval` until it yields a value.
///
/// The predicate is always polled at least once, and once more at the deadline.
///
/// # Errors
///
/// * [`AutomationError::Timeout`] if nothing was yielded within `options.timeout`
/// * The first error the predicate returns
pub async fn wait_for<T, F, Fut>(
    options: WaitOptions,
    what: &str,
    mut predicate: F,
) -> Result<T, AutomationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, AutomationError>>,
{
    let deadline = Instant::now() + options.timeout;
    let mut attempts = 0_u32;

    loop {
        attempts += 1;
        if let Some(value) = predicate().await? {
            log::trace!("wait_for: '{what}' satisfied after {attempts} attempt(s)");
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            log::debug!("wait_for: '{what}' timed out after {attempts} attempt(s)");
            return Err(AutomationError::Timeout {
                what: what.to_string(),
                after: options.timeout,
            });
        }

        tokio::time::sleep(options.interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test(tokio::test(start_paused = true))]
    async fn returns_once_predicate_holds() {
        let calls = Rc::new(Cell::new(0));

        let value = wait_for(WaitOptions::default(), "third call", || {
            let calls = calls.clone();
            async move {
                calls.set(calls.get() + 1);
                Ok((calls.get() == 3).then_some("done"))
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.get(), 3);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn times_out() {
        let options = WaitOptions::default()
            .timeout(Duration::from_millis(500))
            .interval(Duration::from_millis(100));
        let start = Instant::now();

        let result = wait_for(options, "never", || async { Ok(None::<()>) }).await;

        assert!(matches!(result, Err(AutomationError::Timeout { what, .. }) if what == "never"));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn predicate_errors_stop_polling() {
        let result = wait_for(WaitOptions::default(), "error", || async {
            Err::<Option<()>, _>(AutomationError::NoTableSelected)
        })
        .await;

        assert!(matches!(result, Err(AutomationError::NoTableSelected)));
    }
}
