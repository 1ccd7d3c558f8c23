use std::{future::Future, panic::AssertUnwindSafe};

use dbmatrix_fixtures::DatabaseFixture;
use futures::FutureExt as _;

use crate::{Automation, AutomationError, LoginOptions};

/// Runs `body` inside a session logged into `fixture`.
///
/// Logout runs on every exit path of `body`: success, error and panic. A panic is
/// resumed once the session is torn down. Dropping the returned future mid-body skips
/// the logout, so deadlines belong inside `body`.
///
/// # Errors
///
/// * If logging in fails, in which case `body` is not run
/// * Any error returned by `body`
/// * If logging out fails after `body` succeeded
pub async fn with_session<A, T, E, F, Fut>(
    automation: &A,
    fixture: &DatabaseFixture,
    options: &LoginOptions,
    body: F,
) -> Result<T, E>
where
    A: Automation + ?Sized,
    E: From<AutomationError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    log::debug!("with_session: logging into '{}'", fixture.id);
    automation.login(fixture, options).await?;

    let result = AssertUnwindSafe(body()).catch_unwind().await;

    let logout = automation.logout().await;
    if let Err(e) = &logout {
        log::warn!("with_session: logout from '{}' failed: {e}", fixture.id);
    }

    match result {
        Ok(Ok(value)) => {
            logout?;
            Ok(value)
        }
        Ok(Err(e)) => Err(e),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
