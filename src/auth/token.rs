use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Datelike, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_TOKEN_CACHE, TOKEN_EXPIRY_DELTA_SECS},
    error::{Error, Result},
};

/// An OAuth2 bearer token as stored in the cache file.
///
/// The field names match the JSON other OAuth2 clients write, so a cache
/// produced elsewhere can be read back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// Expiry, treating the zero time (`0001-01-01T00:00:00Z`) as "never".
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|at| at.year() > 1)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at() {
            Some(at) => at - Duration::seconds(TOKEN_EXPIRY_DELTA_SECS) > now,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Value for the `Authorization` header. An empty or lowercase `bearer`
    /// type is sent as `Bearer`.
    pub fn authorization(&self) -> String {
        let kind = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", kind, self.access_token)
    }
}

/// Token endpoint success body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    pub(crate) fn into_token(self, now: DateTime<Utc>) -> Result<Token> {
        let expiry = match self.expires_in.filter(|secs| *secs > 0) {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| {
                        Error::Auth(format!("token endpoint returned out-of-range expires_in {}", secs))
                    })?,
            ),
            None => None,
        };
        Ok(Token {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_default(),
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expiry,
        })
    }
}

/// File-backed token cache.
///
/// Writes go through a sibling temp file and a rename, so readers never see
/// a partial token. Two processes writing at once still race; the last
/// rename wins.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_CACHE)
    }
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the cache directory if it does not exist yet.
    pub fn prepare(&self) -> Result<()> {
        let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        create_private_dir(dir).map_err(|e| {
            Error::io(
                format!("unable to create token cache directory {}", dir.display()),
                e,
            )
        })
    }

    /// Returns the cached token, or `None` when the file is missing or does
    /// not decode.
    pub fn load(&self) -> Option<Token> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("no cached token at {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(
                    "ignoring undecodable token cache {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn store(&self, token: &Token) -> Result<()> {
        let context = || format!("unable to cache oauth token at {}", self.path.display());
        let content =
            serde_json::to_vec(token).map_err(|e| Error::io(context(), std::io::Error::other(e)))?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        write_private_file(&tmp_path, &content)
            .and_then(|_| fs::rename(&tmp_path, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                Error::io(context(), e)
            })
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}
