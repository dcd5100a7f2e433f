use std::{ffi::OsString, path::PathBuf};

use crate::error::{Error, Result};

/// Where credentials come from. Exactly one is configured per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    ServiceAccount(PathBuf),
    ClientId(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub credentials: CredentialSource,
    pub input: PathBuf,
    pub token_cache: PathBuf,
}

impl Config {
    /// Validates the raw flag values. Empty strings count as unset.
    ///
    /// Nothing here touches the filesystem, so a bad invocation is rejected
    /// before any credential or image file is opened.
    pub fn new(
        service_account: Option<&str>,
        client_id: Option<&str>,
        input: Option<&str>,
        token_cache: PathBuf,
    ) -> Result<Self> {
        let service_account = service_account.filter(|s| !s.is_empty());
        let client_id = client_id.filter(|s| !s.is_empty());

        let credentials = match (service_account, client_id) {
            (None, None) => {
                return Err(Error::Config(
                    "either --service_account or --client_id must be specified".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "--service_account and --client_id are mutually exclusive".to_string(),
                ));
            }
            (Some(path), None) => CredentialSource::ServiceAccount(PathBuf::from(path)),
            (None, Some(path)) => CredentialSource::ClientId(PathBuf::from(path)),
        };

        let input = match input.filter(|s| !s.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => return Err(Error::Config("--input needs to be specified".to_string())),
        };

        Ok(Self {
            credentials,
            input,
            token_cache,
        })
    }
}

/// Long flags that take a value. The argument following one of them (given
/// without `=`) is a value and is never rewritten.
const VALUE_FLAGS: &[&str] = &[
    "service_account",
    "service-account",
    "client_id",
    "client-id",
    "input",
    "token_cache",
    "token-cache",
];

/// Rewrites Go-style single-dash long flags (`-input`, `-client_id=x`) to the
/// double-dash form clap expects. Single-letter flags such as `-h`, values
/// of value-taking flags, and everything after a bare `--` are left
/// alone.
pub fn normalize_flag_style<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    let mut value_next = false;
    args.into_iter()
        .enumerate()
        .map(|(idx, arg)| {
            if idx == 0 || passthrough {
                return arg;
            }
            if std::mem::take(&mut value_next) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let Some(name) = text.strip_prefix('-') else {
                return arg;
            };
            let (bare, long) = match name.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (name, false),
            };
            let (flag, inline_value) = match bare.split_once('=') {
                Some((flag, _)) => (flag, true),
                None => (bare, false),
            };
            value_next = !inline_value && VALUE_FLAGS.contains(&flag);

            if !long && flag.len() > 1 && flag.chars().all(is_flag_char) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

fn is_flag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
