//! SSL modes of the login form.
//!
//! Cases log in themselves since every mode needs its own login options.

use dbmatrix_automation::{
    LoginOptions,
    ssl::{certs_dir, is_disabled_mode, load_certificate, resolve_cert_path},
    with_session,
};
use dbmatrix_fixtures::SslModeSpec;
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, ScenarioContext, ScenarioError,
    SkipReason, ensure_eq,
};

pub const GROUP: &str = "ssl";

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::All,
        &MatrixOptions::new().login(false),
        |fixture, registrar| {
            let Some(ssl) = &fixture.ssl else {
                return registrar.skip(
                    "modes",
                    SkipReason::MissingFixtureData(format!("no ssl block in '{}'", fixture.id)),
                );
            };

            let mut registered = 0;

            for spec in &ssl.modes {
                if !spec.should_succeed {
                    log::debug!(
                        "register: '{}' ssl mode '{}' is not expected to connect",
                        fixture.id,
                        spec.mode
                    );
                    continue;
                }

                let spec = spec.clone();
                let ca_cert_path = ssl.ca_cert_path.clone();
                registrar.test(spec.mode.clone(), move |ctx| {
                    connect(ctx, spec.clone(), ca_cert_path.clone())
                })?;
                registered += 1;
            }

            if registered == 0 {
                return registrar.skip(
                    "modes",
                    SkipReason::MissingFixtureData(format!(
                        "no ssl mode of '{}' is expected to connect",
                        fixture.id
                    )),
                );
            }

            Ok(())
        },
    )
}

async fn connect(
    ctx: ScenarioContext,
    spec: SslModeSpec,
    ca_cert_path: Option<String>,
) -> Result<(), ScenarioError> {
    let mut options = LoginOptions::default().ssl_mode(&spec.mode);

    if spec.needs_cert {
        let path = ca_cert_path.ok_or_else(|| {
            ScenarioError::missing_data(format!("ssl mode '{}' needs ssl.caCertPath", spec.mode))
        })?;
        let path = resolve_cert_path(&path, &certs_dir());
        log::debug!("connect: loading CA certificate {}", path.display());
        options = options.ca_certificate(load_certificate(&path)?);
    }

    let automation = ctx.automation();
    with_session(automation, ctx.fixture(), &options, || async {
        let secure = automation.secure_connection_indicator().await?;
        ensure_eq!(
            secure,
            !is_disabled_mode(&spec.mode),
            "secure connection indicator in mode '{}'",
            spec.mode
        );
        Ok(())
    })
    .await
}
