//! TLS configuration and certificate loading.
//!
//! The protocol core never sees TLS: it receives whatever stream the
//! acceptor hands back.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Certificate file not found: {0:?}")]
    MissingCertificate(std::path::PathBuf),

    #[error("Private key file not found: {0:?}")]
    MissingKey(std::path::PathBuf),

    #[error("Failed to load TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Load a TLS acceptor from PEM certificate and key files.
pub async fn load_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::MissingCertificate(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsError::MissingKey(key_path.to_path_buf()));
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    Ok(TlsAcceptor::from(config.get_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_reported() {
        let Err(err) = load_tls_acceptor(Path::new("/no/cert.pem"), Path::new("/no/key.pem")).await else {
            panic!("missing certificate accepted");
        };
        assert!(matches!(err, TlsError::MissingCertificate(_)));

        let cert = tempfile::NamedTempFile::new().unwrap();
        let Err(err) = load_tls_acceptor(cert.path(), Path::new("/no/key.pem")).await else {
            panic!("missing key accepted");
        };
        assert!(matches!(err, TlsError::MissingKey(_)));
    }

    #[tokio::test]
    async fn garbage_pem_fails_to_load() {
        let cert = tempfile::NamedTempFile::new().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(cert.path(), "not a certificate").unwrap();
        std::fs::write(key.path(), "not a key").unwrap();

        let Err(err) = load_tls_acceptor(cert.path(), key.path()).await else {
            panic!("garbage PEM accepted");
        };
        assert!(matches!(err, TlsError::Load(_)));
    }
}
