//! SSL mode helpers.

use std::path::{Path, PathBuf};

use crate::AutomationError;

/// Prefix certificate paths carry inside the database containers.
pub const CONTAINER_CERTS_PREFIX: &str = "/certs/";

/// Environment variable naming the host directory the container certificates are
/// mounted from.
pub const CERTS_DIR_ENV_VAR: &str = "DBMATRIX_CERTS_DIR";

pub const DEFAULT_CERTS_DIR: &str = "dev/certs";

/// The one mode that connects without transport security.
pub const DISABLED_MODE: &str = "disabled";

#[must_use]
pub fn is_disabled_mode(mode: &str) -> bool {
    mode.eq_ignore_ascii_case(DISABLED_MODE)
}

/// Host directory holding the certificates, from [`CERTS_DIR_ENV_VAR`].
#[must_use]
pub fn certs_dir() -> PathBuf {
    std::env::var_os(CERTS_DIR_ENV_VAR).map_or_else(|| PathBuf::from(DEFAULT_CERTS_DIR), PathBuf::from)
}

/// Maps an in-container certificate path to the host-visible path under `certs_dir`.
/// Paths outside [`CONTAINER_CERTS_PREFIX`] are returned unchanged.
#[must_use]
pub fn resolve_cert_path(path: &str, certs_dir: &Path) -> PathBuf {
    path.strip_prefix(CONTAINER_CERTS_PREFIX)
        .map_or_else(|| PathBuf::from(path), |relative| certs_dir.join(relative))
}

/// Reads the certificate at `path`.
///
/// # Errors
///
/// * [`AutomationError::Certificate`] if the file cannot be read
pub fn load_certificate(path: &Path) -> Result<String, AutomationError> {
    std::fs::read_to_string(path).map_err(|source| AutomationError::Certificate {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn container_paths_map_to_certs_dir() {
        assert_eq!(
            resolve_cert_path("/certs/ca/postgres-ca.pem", Path::new("dev/certs")),
            PathBuf::from("dev/certs/ca/postgres-ca.pem")
        );
        assert_eq!(
            resolve_cert_path("/etc/ssl/ca.pem", Path::new("dev/certs")),
            PathBuf::from("/etc/ssl/ca.pem")
        );
    }

    #[test_log::test]
    fn disabled_mode_is_case_insensitive() {
        assert!(is_disabled_mode("disabled"));
        assert!(is_disabled_mode("DISABLED"));
        assert!(!is_disabled_mode("require"));
    }

    #[test_log::test]
    fn certificates_load_or_fail_as_environment_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.pem");
        std::fs::write(&path, "-----BEGIN CERTIFICATE-----").unwrap();

        assert_eq!(
            load_certificate(&path).unwrap(),
            "-----BEGIN CERTIFICATE-----"
        );

        let error = load_certificate(&dir.path().join("missing.pem")).unwrap_err();
        assert!(error.is_environment());
    }
}
