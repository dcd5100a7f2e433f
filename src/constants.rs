pub const VISION_ANNOTATE_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Scopes requested for both credential flows.
pub const VISION_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/cloud-vision",
];

pub const TEXT_DETECTION_FEATURE: &str = "TEXT_DETECTION";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub const DEFAULT_TOKEN_CACHE: &str = "./credentials/cache.json";

/// Lifetime requested for service-account assertions.
pub const SERVICE_ACCOUNT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens are treated as expired this many seconds before their real expiry.
pub const TOKEN_EXPIRY_DELTA_SECS: i64 = 10;

pub const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_USER_AGENT: &str = concat!("vision_ocr/", env!("CARGO_PKG_VERSION"));
