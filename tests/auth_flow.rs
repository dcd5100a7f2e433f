mod common;

use std::{fs, io::Cursor};

use chrono::{Duration, Utc};
use url::Url;
use vision_ocr::{
    Config, Error, TokenSource,
    auth::{self, AuthCodePrompt, ConsolePrompt, ServiceAccountKey, Token, TokenCache},
};

/// Fails the test if consent is ever requested.
struct NoPrompt;

impl AuthCodePrompt for NoPrompt {
    fn prompt(&mut self, auth_url: &Url) -> vision_ocr::Result<String> {
        panic!("unexpected authorization prompt for {}", auth_url);
    }
}

fn future_token() -> Token {
    Token {
        access_token: "ya29.cached".to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: Some("1//refresh".to_string()),
        expiry: Some(Utc::now() + Duration::hours(1)),
    }
}

#[tokio::test]
async fn cached_token_skips_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("credentials").join("cache.json"));
    cache.prepare().unwrap();
    cache.store(&future_token()).unwrap();

    // Nothing listens here; any network call would fail the test.
    let oauth = common::oauth_config("http://127.0.0.1:9/token");
    let token = auth::user_token(&oauth, &cache, &common::http(), &mut NoPrompt)
        .await
        .unwrap();

    assert_eq!(token.access_token, "ya29.cached");
}

#[tokio::test]
async fn cache_miss_prompts_and_writes_cache() {
    let (base, server) = common::serve(vec![(
        200,
        r#"{"access_token":"ya29.fresh","token_type":"Bearer","refresh_token":"1//new","expires_in":3599}"#
            .to_string(),
    )])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("credentials").join("cache.json");
    let cache = TokenCache::new(&cache_path);
    let oauth = common::oauth_config(&format!("{}/token", base));
    let mut prompt = ConsolePrompt::new(Cursor::new("4/0AbC\n"), Vec::new());

    let token = auth::user_token(&oauth, &cache, &common::http(), &mut prompt)
        .await
        .unwrap();
    assert_eq!(token.access_token, "ya29.fresh");
    assert_eq!(token.refresh_token.as_deref(), Some("1//new"));

    let shown = String::from_utf8(prompt.into_output()).unwrap();
    assert!(shown.contains("access_type=offline"));
    assert!(shown.contains("client_id=123.apps.googleusercontent.com"));

    let written: Token = serde_json::from_str(&fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(written, token);

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /token"));
    assert!(requests[0].contains("grant_type=authorization_code"));
    assert!(requests[0].contains("code=4%2F0AbC"));
}

#[tokio::test]
async fn undecodable_cache_is_replaced() {
    let (base, server) = common::serve(vec![(
        200,
        r#"{"access_token":"ya29.replaced","expires_in":3600}"#.to_string(),
    )])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    fs::write(&cache_path, "{ truncated").unwrap();

    let cache = TokenCache::new(&cache_path);
    let oauth = common::oauth_config(&format!("{}/token", base));
    let mut prompt = ConsolePrompt::new(Cursor::new("code\n"), Vec::new());
    auth::user_token(&oauth, &cache, &common::http(), &mut prompt)
        .await
        .unwrap();

    assert_eq!(cache.load().unwrap().access_token, "ya29.replaced");
    server.await.unwrap();
}

#[tokio::test]
async fn rejected_code_is_an_auth_error() {
    let (base, server) = common::serve(vec![(
        400,
        r#"{"error":"invalid_grant","error_description":"Malformed auth code."}"#.to_string(),
    )])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("cache.json"));
    let oauth = common::oauth_config(&format!("{}/token", base));
    let mut prompt = ConsolePrompt::new(Cursor::new("bogus\n"), Vec::new());

    let err = auth::user_token(&oauth, &cache, &common::http(), &mut prompt)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(ref msg) if msg.contains("invalid_grant: Malformed auth code.")));
    assert!(cache.load().is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn out_of_range_expires_in_is_an_auth_error() {
    let (base, server) = common::serve(vec![(
        200,
        format!(r#"{{"access_token":"ya29.x","expires_in":{}}}"#, i64::MAX),
    )])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("cache.json"));
    let oauth = common::oauth_config(&format!("{}/token", base));
    let mut prompt = ConsolePrompt::new(Cursor::new("code\n"), Vec::new());

    let err = auth::user_token(&oauth, &cache, &common::http(), &mut prompt)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(ref msg) if msg.contains("expires_in")));
    assert!(cache.load().is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn expired_user_token_is_refreshed() {
    let (base, server) = common::serve(vec![(
        200,
        r#"{"access_token":"ya29.refreshed","token_type":"Bearer","expires_in":3600}"#.to_string(),
    )])
    .await;

    let mut expired = future_token();
    expired.expiry = Some(Utc::now() - Duration::minutes(5));
    let mut source = TokenSource::user(common::oauth_config(&format!("{}/token", base)), expired);

    let token = source.token(&common::http()).await.unwrap();
    assert_eq!(token.access_token, "ya29.refreshed");
    assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));

    let requests = server.await.unwrap();
    assert!(requests[0].contains("grant_type=refresh_token"));
}

#[tokio::test]
async fn expired_token_without_refresh_fails() {
    let mut expired = future_token();
    expired.refresh_token = None;
    expired.expiry = Some(Utc::now() - Duration::minutes(5));
    let mut source = TokenSource::user(common::oauth_config("http://127.0.0.1:9/token"), expired);

    assert!(matches!(
        source.token(&common::http()).await,
        Err(Error::Auth(_))
    ));
}

#[tokio::test]
async fn service_account_exchanges_a_signed_assertion() {
    let (base, server) = common::serve(vec![(
        200,
        r#"{"access_token":"ya29.sa","token_type":"Bearer","expires_in":3599}"#.to_string(),
    )])
    .await;

    let key =
        ServiceAccountKey::from_json(common::service_account_json(&format!("{}/token", base)).as_bytes())
            .unwrap();
    assert_eq!(key.client_email, "ocr-test@ocr-test.iam.gserviceaccount.com");

    let mut source = TokenSource::service_account(key, vision_ocr::constants::VISION_SCOPES);
    let http = common::http();
    assert_eq!(source.token(&http).await.unwrap().access_token, "ya29.sa");
    // Still valid, so no second request is made.
    assert_eq!(source.token(&http).await.unwrap().access_token, "ya29.sa");

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));
    let assertion = requests[0].split("assertion=").nth(1).unwrap().trim();
    assert_eq!(assertion.split('.').count(), 3);
}

#[tokio::test]
async fn resolve_reads_client_id_file_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let client_id = dir.path().join("client_id.json");
    fs::write(&client_id, common::client_id_json("http://127.0.0.1:9/token")).unwrap();

    let cache_path = dir.path().join("credentials").join("cache.json");
    let cache = TokenCache::new(&cache_path);
    cache.prepare().unwrap();
    cache.store(&future_token()).unwrap();

    let config = Config::new(
        None,
        client_id.to_str(),
        Some("image.png"),
        cache_path.clone(),
    )
    .unwrap();

    let source = auth::resolve(&config, &common::http(), &mut NoPrompt)
        .await
        .unwrap();
    assert!(matches!(source, TokenSource::User { ref token, .. } if token.access_token == "ya29.cached"));
}

#[tokio::test]
async fn resolve_rejects_malformed_service_account_offline() {
    let dir = tempfile::tempdir().unwrap();
    let sa = dir.path().join("sa.json");
    fs::write(&sa, "{\"type\": \"service_account\"").unwrap();

    let config = Config::new(
        sa.to_str(),
        None,
        Some("image.png"),
        dir.path().join("cache.json"),
    )
    .unwrap();

    let err = auth::resolve(&config, &common::http(), &mut NoPrompt)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse { what: "service account file", .. }));
}
