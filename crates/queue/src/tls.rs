//! TLS material for broker connections.
//!
//! Each setting is either PEM text held in memory (it starts with
//! `-----BEGIN`) or a path on disk. In-memory material is parsed straight
//! into the rustls config and never written to a file.
//!
//! The client certificate is PEM (with the key in `mq_use_ssl_key`, or in the
//! same PEM when no key is set) or a PKCS#12 bundle opened with
//! `mq_use_ssl_passphrase`.

use std::path::PathBuf;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, warn};

use bas_core::{ConfigHint, Configuration};

use crate::error::QueueError;

const PEM_PREFIX: &str = "-----BEGIN";

pub const MQ_USE_SSL_CA: &str = "mq_use_ssl_ca";
pub const MQ_USE_SSL_CERT: &str = "mq_use_ssl_cert";
pub const MQ_USE_SSL_KEY: &str = "mq_use_ssl_key";
pub const MQ_USE_SSL_PASSPHRASE: &str = "mq_use_ssl_passphrase";
pub const MQ_USE_SSL_REJECT_UNAUTHORIZED: &str = "mq_use_ssl_reject_unauthorized";

/// Configuration hints for the broker TLS settings
/// (`MQ_USE_SSL_*` env vars, or the `mq:` section of the config file).
pub fn mq_tls_hints() -> Vec<(&'static str, ConfigHint)> {
    vec![
        (
            MQ_USE_SSL_CA,
            ConfigHint::from_env("MQ_USE_SSL_CA").with_file_path(&["mq", "use_ssl_ca"]),
        ),
        (
            MQ_USE_SSL_CERT,
            ConfigHint::from_env("MQ_USE_SSL_CERT").with_file_path(&["mq", "use_ssl_cert"]),
        ),
        (
            MQ_USE_SSL_KEY,
            ConfigHint::from_env("MQ_USE_SSL_KEY").with_file_path(&["mq", "use_ssl_key"]),
        ),
        (
            MQ_USE_SSL_PASSPHRASE,
            ConfigHint::from_env("MQ_USE_SSL_PASSPHRASE")
                .with_file_path(&["mq", "use_ssl_passphrase"]),
        ),
        (
            MQ_USE_SSL_REJECT_UNAUTHORIZED,
            ConfigHint::from_env("MQ_USE_SSL_REJECT_UNAUTHORIZED")
                .with_file_path(&["mq", "use_ssl_reject_unauthorized"])
                .with_default(false),
        ),
    ]
}

/// Where a piece of TLS material lives.
#[derive(Clone, PartialEq, Eq)]
pub enum TlsMaterial {
    /// PEM text supplied directly.
    Pem(String),
    /// File on disk.
    Path(PathBuf),
}

impl TlsMaterial {
    /// Classify a configured value: PEM text if it starts with a PEM header,
    /// otherwise a path.
    pub fn parse(value: &str) -> Self {
        if value.trim_start().starts_with(PEM_PREFIX) {
            Self::Pem(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::Pem(_))
    }

    /// The material as raw bytes.
    pub fn read_bytes(&self) -> Result<Vec<u8>, QueueError> {
        match self {
            Self::Pem(pem) => Ok(pem.as_bytes().to_vec()),
            Self::Path(path) => std::fs::read(path).map_err(|e| {
                QueueError::Tls(format!("cannot read {}: {}", path.display(), e))
            }),
        }
    }
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pem(_) => f.write_str("Pem(<in memory>)"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

fn is_pem(bytes: &[u8]) -> bool {
    bytes.trim_ascii_start().starts_with(PEM_PREFIX.as_bytes())
}

fn pem_certificates(bytes: &[u8]) -> Result<Vec<CertificateDer<'static>>, QueueError> {
    rustls_pemfile::certs(&mut &bytes[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| QueueError::Tls(format!("invalid PEM certificate: {e}")))
}

/// Certificate chain and key presented to the broker.
pub type ClientIdentity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

/// TLS settings for the broker connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MqTlsConfig {
    /// Extra CA certificates (PEM) trusted for the broker.
    pub ca: Option<TlsMaterial>,
    /// Client certificate: PEM, or a `.p12`/`.pfx` bundle.
    pub cert: Option<TlsMaterial>,
    /// PEM private key for a PEM client certificate.
    pub key: Option<TlsMaterial>,
    /// Password of a PKCS#12 bundle.
    pub passphrase: Option<String>,
    /// Verify the broker certificate. Off unless configured.
    pub reject_unauthorized: bool,
}

impl MqTlsConfig {
    /// Read the `mq_use_ssl_*` keys. Hints from [`mq_tls_hints`] must be
    /// registered on `config`.
    pub fn from_configuration(config: &Configuration) -> Result<Self, QueueError> {
        let material = |key: &str| -> Result<Option<TlsMaterial>, QueueError> {
            Ok(config.get_str(key)?.map(|v| TlsMaterial::parse(&v)))
        };

        Ok(Self {
            ca: material(MQ_USE_SSL_CA)?,
            cert: material(MQ_USE_SSL_CERT)?,
            key: material(MQ_USE_SSL_KEY)?,
            passphrase: config.get_str(MQ_USE_SSL_PASSPHRASE)?,
            reject_unauthorized: config
                .get_bool(MQ_USE_SSL_REJECT_UNAUTHORIZED)?
                .unwrap_or(false),
        })
    }

    /// Build the rustls client config used for `amqps` connections.
    pub fn client_config(&self) -> Result<ClientConfig, QueueError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| QueueError::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(self.server_verifier(&provider)?);

        match self.client_identity()? {
            Some((chain, key)) => builder
                .with_client_auth_cert(chain, key)
                .map_err(|e| QueueError::Tls(format!("unusable client certificate: {e}"))),
            None => Ok(builder.with_no_client_auth()),
        }
    }

    /// Verifier for the broker certificate.
    pub fn server_verifier(
        &self,
        provider: &Arc<CryptoProvider>,
    ) -> Result<Arc<dyn ServerCertVerifier>, QueueError> {
        if !self.reject_unauthorized {
            warn!("broker certificate is not verified");
            return Ok(Arc::new(AcceptAnyServerCert(provider.clone())));
        }

        let verifier: Arc<dyn ServerCertVerifier> =
            WebPkiServerVerifier::builder_with_provider(Arc::new(self.root_store()?), provider.clone())
                .build()
                .map_err(|e| QueueError::Tls(format!("cannot verify broker certificate: {e}")))?;
        Ok(verifier)
    }

    /// System roots plus the configured CA.
    fn root_store(&self) -> Result<RootCertStore, QueueError> {
        let mut roots = RootCertStore::empty();
        match rustls_native_certs::load_native_certs() {
            Ok(certs) => {
                let (added, ignored) = roots.add_parsable_certificates(certs);
                debug!(added, ignored, "loaded system root certificates");
            }
            Err(e) => warn!(error = %e, "cannot load system root certificates"),
        }

        if let Some(ca) = &self.ca {
            let certs = pem_certificates(&ca.read_bytes()?)?;
            if certs.is_empty() {
                return Err(QueueError::Tls("no certificate found in CA material".into()));
            }
            roots.add_parsable_certificates(certs);
        }
        Ok(roots)
    }

    /// The client certificate chain and key, if one is configured.
    pub fn client_identity(&self) -> Result<Option<ClientIdentity>, QueueError> {
        let Some(cert) = &self.cert else {
            return Ok(None);
        };
        let cert_bytes = cert.read_bytes()?;
        if !is_pem(&cert_bytes) {
            return pkcs12_identity(&cert_bytes, self.passphrase.as_deref().unwrap_or_default())
                .map(Some);
        }

        let chain = pem_certificates(&cert_bytes)?;
        if chain.is_empty() {
            return Err(QueueError::Tls("no certificate found in client certificate".into()));
        }

        let key_bytes = match &self.key {
            Some(key) => key.read_bytes()?,
            None => cert_bytes,
        };
        let key = rustls_pemfile::private_key(&mut &key_bytes[..])
            .map_err(|e| QueueError::Tls(format!("invalid PEM key: {e}")))?
            .ok_or_else(|| {
                QueueError::Tls(
                    "no unencrypted private key found; use a PKCS#12 bundle for protected keys"
                        .into(),
                )
            })?;

        Ok(Some((chain, key)))
    }
}

fn pkcs12_identity(der: &[u8], password: &str) -> Result<ClientIdentity, QueueError> {
    let store = p12_keystore::KeyStore::from_pkcs12(der, password)
        .map_err(|e| QueueError::Tls(format!("cannot open PKCS#12 bundle: {e}")))?;
    let Some((_, chain)) = store.private_key_chain() else {
        return Err(QueueError::Tls("PKCS#12 bundle holds no private key".into()));
    };

    let key = PrivateKeyDer::from(PrivatePkcs8KeyDer::from(chain.key().to_vec()));
    let certs = chain
        .chain()
        .iter()
        .map(|c| CertificateDer::from(c.as_der().to_vec()))
        .collect();
    Ok((certs, key))
}

// ── Unverified broker ────────────────────────────────────────────────

/// Accepts any broker certificate; handshake signatures are still checked.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
