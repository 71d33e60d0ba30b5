//! TLS and connector setup for [`HyperTransport`](super::HyperTransport).

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::{ClientConfig, ConfigBuilder, RootCertStore, WantsVerifier};

use crate::builder::ClientBuildError;

/// Returns true if the enabled features provide both a crypto provider and
/// root certificates.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(feature = "tls-ring")
        && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

/// A config builder for the feature-selected crypto provider, falling back to
/// a process-wide default installed by the application.
fn provider_builder() -> Option<ConfigBuilder<ClientConfig, WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(not(feature = "tls-ring"))]
    let provider = rustls::crypto::CryptoProvider::get_default().map(Arc::clone);

    ClientConfig::builder_with_provider(provider?)
        .with_safe_default_protocol_versions()
        .ok()
}

fn root_store() -> RootCertStore {
    #[allow(unused_mut)]
    let mut roots = RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native = rustls_native_certs::load_native_certs();
        #[cfg(feature = "tracing")]
        if !native.errors.is_empty() {
            tracing::debug!(errors = ?native.errors, "some native certificates failed to load");
        }
        roots.add_parsable_certificates(native.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    roots
}

/// The TLS config used when none is supplied.
///
/// Returns `None` when no crypto provider is available.
pub fn default_tls_config() -> Option<ClientConfig> {
    Some(
        provider_builder()?
            .with_root_certificates(root_store())
            .with_no_client_auth(),
    )
}

/// Build a connector that speaks plain HTTP and HTTPS over HTTP/1.1 or HTTP/2.
pub fn build_https_connector(
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientBuildError> {
    let config = tls_config
        .or_else(default_tls_config)
        .ok_or(ClientBuildError::NoCryptoProvider)?;

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build())
}
