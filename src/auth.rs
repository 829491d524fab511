use crate::config::{Config, KeyringSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::{Gmail, oauth2};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{info, warn};
use yup_oauth2::authenticator_delegate::InstalledFlowDelegate;
use yup_oauth2::storage::{TokenInfo, TokenStorage};
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod, read_application_secret};

/// Full mailbox scope; batchDelete is refused with anything narrower.
pub const SCOPES: &[&str] = &["https://mail.google.com/"];

pub type Connector = HttpsConnector<HttpConnector>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenData {
    tokens: Vec<TokenInfo>,
}

/// Keeps the OAuth token in the OS keyring instead of a token file.
pub struct RingStorage {
    service: String,
    key: String,
}

impl RingStorage {
    pub fn new(settings: &KeyringSettings) -> Self {
        Self {
            service: settings.service.clone(),
            key: settings.token_key.clone(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.key).map_err(|e| anyhow::anyhow!("Keyring error: {}", e))
    }

    async fn get_all(&self) -> Result<TokenData> {
        match self.entry()?.get_password() {
            Ok(serialized) => {
                serde_json::from_str(&serialized).context("Failed to deserialize tokens")
            }
            Err(keyring::Error::NoEntry) => Ok(TokenData::default()),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }

    pub async fn clear_token(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }
}

#[async_trait]
impl TokenStorage for RingStorage {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> Result<()> {
        let data = TokenData {
            tokens: vec![token],
        };
        let serialized = serde_json::to_string(&data).context("Failed to serialize tokens")?;
        self.entry()?
            .set_password(&serialized)
            .map_err(|e| anyhow::anyhow!("Keyring error: {}", e))?;
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        match self.get_all().await {
            Ok(data) => data.tokens.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "could not read stored token");
                None
            }
        }
    }
}

/// Opens the consent page in the default browser.
pub struct BrowserDelegate;

impl InstalledFlowDelegate for BrowserDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        _need_code: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            info!("opening browser for Gmail consent");
            if let Err(e) = open::that(url) {
                warn!(error = %e, "could not open a browser");
            }
            eprintln!("If no browser opened, visit:\n{url}");
            Ok(String::new())
        })
    }
}

pub async fn authenticate(config: &Config) -> Result<oauth2::authenticator::Authenticator<Connector>> {
    let secret = read_application_secret(&config.credentials_path)
        .await
        .with_context(|| format!("Failed to read application secret {}", config.credentials_path))?;

    let auth = InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
        .with_storage(Box::new(RingStorage::new(&config.keyring)))
        .flow_delegate(Box::new(BrowserDelegate))
        .build()
        .await
        .context("Failed to build authenticator")?;

    auth.token(SCOPES).await.context("Failed to obtain Gmail token")?;
    Ok(auth)
}

/// The authenticated Gmail hub the remote client wraps.
pub async fn connect(config: &Config) -> Result<Gmail<Connector>> {
    let auth = authenticate(config).await?;
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native roots")?
        .https_only()
        .enable_http1()
        .build();
    Ok(Gmail::new(hyper::Client::builder().build(connector), auth))
}
