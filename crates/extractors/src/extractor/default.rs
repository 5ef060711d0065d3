use std::sync::Arc;

use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;

use super::{
    error::ExtractorError,
    factory::ExtractorRegistry,
    http::{HttpFetcher, ReqwestFetcher},
    platforms::{
        bilibili::Bilibili,
        haokan::Haokan,
        universal::Universal,
        youtube::{Youtube, player::PlayerCache},
    },
};

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub fn default_client() -> Result<Client, ExtractorError> {
    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ExtractorError::Other(format!("tls protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| ExtractorError::Other(format!("tls platform verifier: {e}")))?
        .with_no_client_auth();

    let client = Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(DEFAULT_UA)
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Registers every built-in site handler on top of `fetcher`.
///
/// `player_cache` is owned by the YouTube handler registered for both the
/// `youtube` and `youtu` tokens.
pub fn registry_with(
    fetcher: Arc<dyn HttpFetcher>,
    player_cache: Arc<PlayerCache>,
) -> ExtractorRegistry {
    let youtube = Arc::new(Youtube::new(fetcher.clone(), player_cache));

    let mut registry = ExtractorRegistry::new();
    registry
        .register("youtube", youtube.clone())
        .register("youtu", youtube)
        .register("bilibili", Arc::new(Bilibili::new(fetcher.clone())))
        .register("haokan", Arc::new(Haokan::new(fetcher.clone())))
        .register_fallback(Arc::new(Universal::new(fetcher)));
    registry
}

/// Returns a new `ExtractorRegistry` populated with all the supported sites.
pub fn default_registry() -> Result<ExtractorRegistry, ExtractorError> {
    let fetcher: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new(default_client()?));
    Ok(registry_with(fetcher, Arc::new(PlayerCache::new())))
}
