//! Installed-application OAuth2 flow against Google's endpoints.

use chrono::Utc;
use log::debug;
use serde::Deserialize;
use url::Url;

use crate::{
    auth::token::{Token, TokenResponse},
    error::{Error, Result},
};

/// `client_secret_*.json` as downloaded from the Cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    web: Option<ClientSecret>,
    installed: Option<ClientSecret>,
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    client_id: String,
    #[serde(default)]
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Parses a client-ID file. A `web` section wins over `installed`, and the
    /// first redirect URI is the one used.
    pub fn from_json(bytes: &[u8], scopes: &[&str]) -> Result<Self> {
        let file: ClientSecretFile =
            serde_json::from_slice(bytes).map_err(|e| Error::parse("client id file", e))?;
        let secret = file
            .web
            .or(file.installed)
            .ok_or_else(|| Error::Credentials("no credentials found in client id file".to_string()))?;
        let redirect_uri = secret.redirect_uris.into_iter().next().ok_or_else(|| {
            Error::Credentials("missing redirect URL in the client id file".to_string())
        })?;

        Ok(Self {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            auth_uri: secret.auth_uri,
            token_uri: secret.token_uri,
            redirect_uri,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Consent page URL requesting offline access, so the exchange also
    /// yields a refresh token.
    pub fn auth_code_url(&self, state: &str) -> Result<Url> {
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Credentials(format!("invalid auth_uri {:?}: {}", self.auth_uri, e)))
    }

    pub async fn exchange(&self, http: &reqwest::Client, code: &str) -> Result<Token> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        request_token(http, &self.token_uri, &params).await
    }

    /// Exchanges a refresh token. The endpoint usually omits the refresh
    /// token from its reply, in which case the one passed in is kept.
    pub async fn refresh(&self, http: &reqwest::Client, refresh_token: &str) -> Result<Token> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let mut token = request_token(http, &self.token_uri, &params).await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }
}

/// POSTs a form to a token endpoint and decodes the token it returns.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    params: &[(&str, &str)],
) -> Result<Token> {
    debug!("requesting token from {}", token_uri);
    let response = http.post(token_uri).form(params).send().await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {}", err.error, desc),
                None => err.error,
            },
            Err(_) => body.trim().to_string(),
        };
        return Err(Error::Auth(format!(
            "token endpoint returned {}: {}",
            status, detail
        )));
    }

    let resp: TokenResponse =
        serde_json::from_str(&body).map_err(|e| Error::parse("token response", e))?;
    resp.into_token(Utc::now())
}
