pub mod oauth;
pub mod prompt;
pub mod service_account;
pub mod token;

use std::{fs, path::Path};

use log::{debug, info};

pub use oauth::OAuthConfig;
pub use prompt::{AuthCodePrompt, ConsolePrompt};
pub use service_account::ServiceAccountKey;
pub use token::{Token, TokenCache};

use crate::{
    config::{Config, CredentialSource},
    constants::VISION_SCOPES,
    error::{Error, Result},
};

/// Hands out a valid access token, minting or refreshing one when the
/// current token has expired.
#[derive(Debug)]
pub enum TokenSource {
    ServiceAccount {
        key: ServiceAccountKey,
        scopes: Vec<String>,
        current: Option<Token>,
    },
    User {
        config: OAuthConfig,
        token: Token,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey, scopes: &[&str]) -> Self {
        Self::ServiceAccount {
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            current: None,
        }
    }

    pub fn user(config: OAuthConfig, token: Token) -> Self {
        Self::User { config, token }
    }

    pub async fn token(&mut self, http: &reqwest::Client) -> Result<&Token> {
        match self {
            Self::ServiceAccount {
                key,
                scopes,
                current,
            } => {
                if !current.as_ref().is_some_and(Token::is_valid) {
                    debug!("minting token for {}", key.client_email);
                    *current = Some(key.fetch_token(http, scopes).await?);
                }
                current
                    .as_ref()
                    .ok_or_else(|| Error::Auth("service account token missing".to_string()))
            }
            Self::User { config, token } => {
                if !token.is_valid() {
                    let refresh_token = token.refresh_token().map(str::to_owned).ok_or_else(|| {
                        Error::Auth(
                            "cached token has expired and carries no refresh token".to_string(),
                        )
                    })?;
                    debug!("refreshing expired user token");
                    *token = config.refresh(http, &refresh_token).await?;
                }
                Ok(&*token)
            }
        }
    }
}

/// Builds the token source for the configured credential method. User
/// consent goes through `prompt` only when the cache has no usable token.
pub async fn resolve(
    config: &Config,
    http: &reqwest::Client,
    prompt: &mut dyn AuthCodePrompt,
) -> Result<TokenSource> {
    match &config.credentials {
        CredentialSource::ServiceAccount(path) => {
            let bytes = read_credentials(path, "unable to read service account file")?;
            let key = ServiceAccountKey::from_json(&bytes)?;
            Ok(TokenSource::service_account(key, VISION_SCOPES))
        }
        CredentialSource::ClientId(path) => {
            let bytes = read_credentials(path, "unable to read client id file")?;
            let oauth = OAuthConfig::from_json(&bytes, VISION_SCOPES)?;
            let cache = TokenCache::new(&config.token_cache);
            let token = user_token(&oauth, &cache, http, prompt).await?;
            Ok(TokenSource::user(oauth, token))
        }
    }
}

/// Cached token if there is one, otherwise the result of the interactive
/// consent flow, which is then written to the cache.
pub async fn user_token(
    oauth: &OAuthConfig,
    cache: &TokenCache,
    http: &reqwest::Client,
    prompt: &mut dyn AuthCodePrompt,
) -> Result<Token> {
    cache.prepare()?;
    if let Some(token) = cache.load() {
        info!("using cached token from {}", cache.path().display());
        return Ok(token);
    }

    let state = format!("{:016x}", rand::random::<u64>());
    let auth_url = oauth.auth_code_url(&state)?;
    let code = prompt.prompt(&auth_url)?;
    let token = oauth.exchange(http, &code).await?;

    info!("Saving credential file to: {}", cache.path().display());
    cache.store(&token)?;
    Ok(token)
}

fn read_credentials(path: &Path, context: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(format!("{} {}", context, path.display()), e))
}
