use std::future::Future;

use scoped_tls::scoped_thread_local;

struct Handle {
    id: String,
}

scoped_thread_local! {
    static FIXTURE: Handle
}

/// Id of the fixture whose case is currently executing on this thread, if any.
#[must_use]
pub fn current_fixture() -> Option<String> {
    if FIXTURE.is_set() {
        Some(FIXTURE.with(|x| x.id.clone()))
    } else {
        None
    }
}

pub fn with_fixture<T>(id: &str, f: impl FnOnce() -> T) -> T {
    let handle = Handle { id: id.to_string() };
    FIXTURE.set(&handle, f)
}

/// Wraps `future` so that every poll of it runs with `id` as the current fixture.
pub fn scoped<F: Future>(id: impl Into<String>, future: F) -> impl Future<Output = F::Output> {
    let id = id.into();
    let mut future = Box::pin(future);

    futures::future::poll_fn(move |cx| with_fixture(&id, || future.as_mut().poll(cx)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn no_fixture_outside_scope() {
        assert!(current_fixture().is_none());
    }

    #[test_log::test]
    fn nested_scopes_shadow() {
        with_fixture("postgres", || {
            assert_eq!(current_fixture().as_deref(), Some("postgres"));

            with_fixture("mongodb", || {
                assert_eq!(current_fixture().as_deref(), Some("mongodb"));
            });

            assert_eq!(current_fixture().as_deref(), Some("postgres"));
        });
    }

    #[test_log::test(tokio::test)]
    async fn scoped_future_sees_fixture_across_awaits() {
        let seen = scoped("redis", async {
            let before = current_fixture();
            tokio::task::yield_now().await;
            (before, current_fixture())
        })
        .await;

        assert_eq!(
            seen,
            (Some("redis".to_string()), Some("redis".to_string()))
        );
        assert!(current_fixture().is_none());
    }
}
