use crate::{SocialApiClient, SocialPlatform};
use mockito::Matcher;
use replybot_core::{ApiConfig, CoreError, Credentials, SocialApiError};
use serde_json::json;

fn create_test_credentials() -> Credentials {
    Credentials {
        consumer_key: "test_consumer_key".to_string(),
        consumer_secret: "test_consumer_secret".to_string(),
        access_token: "test_access_token".to_string(),
        access_token_secret: "test_access_token_secret".to_string(),
        openai_api_key: "sk-test".to_string(),
    }
}

fn create_test_client(base_url: String) -> SocialApiClient {
    let config = ApiConfig {
        base_url,
        timeout_secs: 5,
        ..Default::default()
    };
    SocialApiClient::new(&create_test_credentials(), &config).expect("client should build")
}

fn signed() -> Matcher {
    Matcher::Regex(r#"^OAuth .*oauth_consumer_key="test_consumer_key".*oauth_signature=""#.to_string())
}

#[test]
fn test_client_rejects_bad_base_url() {
    let config = ApiConfig {
        base_url: "not a url".to_string(),
        ..Default::default()
    };
    let result = SocialApiClient::new(&create_test_credentials(), &config);
    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[tokio::test]
async fn test_verify_credentials_signs_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/2/users/me")
        .match_query(Matcher::UrlEncoded(
            "user.fields".to_string(),
            "public_metrics".to_string(),
        ))
        .match_header("authorization", signed())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": {"id": "99", "username": "replybot",
                "public_metrics": {"followers_count": 10, "following_count": 20, "tweet_count": 5}}})
            .to_string(),
        )
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let profile = client.verify_credentials().await.unwrap();

    assert_eq!(profile.id, "99");
    assert_eq!(profile.followers, Some(10));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/2/users/me")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let error = client.verify_credentials().await.unwrap_err();

    assert!(matches!(
        error,
        CoreError::SocialApi(SocialApiError::AuthenticationFailed { .. })
    ));
    assert!(error.is_fatal());
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/2/tweets")
        .with_status(429)
        .with_header("retry-after", "120")
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let error = client.create_post("hello", None).await.unwrap_err();

    match error {
        CoreError::SocialApi(SocialApiError::RateLimitExceeded { retry_after }) => {
            assert_eq!(retry_after, 120)
        }
        other => panic!("Expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/2/users/by/username/OpenAI")
        .with_status(503)
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let error = client.resolve_user_id("@OpenAI").await.unwrap_err();

    assert!(matches!(
        error,
        CoreError::SocialApi(SocialApiError::ServerError { status_code: 503 })
    ));
    assert!(!error.is_fatal());
}

#[tokio::test]
async fn test_unknown_user() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/2/users/by/username/ghost")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"errors": [{"title": "Not Found Error", "detail": "Could not find user"}]})
                .to_string(),
        )
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let error = client.resolve_user_id("ghost").await.unwrap_err();
    assert!(matches!(
        error,
        CoreError::SocialApi(SocialApiError::UserNotFound { .. })
    ));
}

#[tokio::test]
async fn test_recent_posts_maps_timeline() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/2/users/44196397/tweets")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("max_results".to_string(), "5".to_string()),
            Matcher::UrlEncoded(
                "tweet.fields".to_string(),
                "created_at,public_metrics,author_id".to_string(),
            ),
        ]))
        .match_header("authorization", signed())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": [
                {"id": "1", "text": "AI ethics?", "author_id": "44196397",
                 "created_at": "2024-05-10T11:30:00.000Z",
                 "public_metrics": {"like_count": 5, "retweet_count": 1, "reply_count": 0, "quote_count": 2}},
                {"id": "2", "text": "missing timestamp"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let posts = client.recent_posts("elonmusk", "44196397", 3).await.unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "1");
    assert_eq!(posts[0].author, "elonmusk");
    assert_eq!(posts[0].shares, 3);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_timeline() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/2/users/1/tweets")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"meta": {"result_count": 0}}).to_string())
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let posts = client.recent_posts("quiet", "1", 5).await.unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_reply_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/2/tweets")
        .match_header("authorization", signed())
        .match_body(Matcher::Json(json!({
            "text": "Great point",
            "reply": {"in_reply_to_tweet_id": "1790"}
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"id": "1791", "text": "Great point"}}).to_string())
        .create_async()
        .await;

    let client = create_test_client(server.url());
    let id = client.create_post("Great point", Some("1790")).await.unwrap();

    assert_eq!(id, "1791");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_share_resolves_own_id_once() {
    let mut server = mockito::Server::new_async().await;
    let me = server
        .mock("GET", "/2/users/me")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"id": "99", "username": "replybot"}}).to_string())
        .expect(1)
        .create_async()
        .await;
    let retweet = server
        .mock("POST", "/2/users/99/retweets")
        .match_body(Matcher::Json(json!({"tweet_id": "1790"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": {"retweeted": true}}).to_string())
        .expect(2)
        .create_async()
        .await;

    let client = create_test_client(server.url());
    client.share("1790").await.unwrap();
    client.share("1790").await.unwrap();

    me.assert_async().await;
    retweet.assert_async().await;
}
