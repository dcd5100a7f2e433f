use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse {what}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API Error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("text detection failed with code {code}: {message}")]
    Detection { code: i32, message: String },

    #[error("annotate response contained no results")]
    EmptyResponse,

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("failed to sign token assertion")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn parse(what: &'static str, source: serde_json::Error) -> Self {
        Self::Parse { what, source }
    }
}
