#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::{sync::Arc, time::Duration};

use {
    mockito::{Server, ServerGuard},
    nowplay_oauth::{ManualNavigator, MemoryTokenStore, OAuthConfig, Session, TokenKey, TokenStore},
    nowplay_player::{ApiOutcome, PlaybackPoller, PlayerClient, PlayerCommand, PollEvent},
    secrecy::Secret,
};

struct Harness {
    client: Arc<PlayerClient>,
    store: Arc<MemoryTokenStore>,
    navigator: Arc<ManualNavigator>,
}

fn harness(server: &ServerGuard, access_token: Option<&str>) -> Harness {
    let store = Arc::new(MemoryTokenStore::new());
    if let Some(token) = access_token {
        store
            .set(TokenKey::AccessToken, Secret::new(token.to_string()))
            .unwrap();
    }
    let navigator = Arc::new(ManualNavigator::new());
    let config = OAuthConfig {
        client_id: "client-123".into(),
        auth_url: format!("{}/authorize", server.url()),
        token_url: format!("{}/api/token", server.url()),
        redirect_uri: "http://127.0.0.1:8888/callback".into(),
        scopes: vec![],
        callback_param: "code".into(),
    };
    let session = Session::new(config, store.clone(), navigator.clone(), reqwest::Client::new());
    let client = PlayerClient::new(session.gateway(), &format!("{}/v1", server.url())).unwrap();
    Harness {
        client: Arc::new(client),
        store,
        navigator,
    }
}

const PLAYING: &str = r#"{
    "is_playing": true,
    "progress_ms": 1000,
    "currently_playing_type": "track",
    "item": {"name": "Windowlicker", "duration_ms": 367000, "artists": [{"name": "Aphex Twin"}],
             "album": {"name": "Windowlicker", "images": [{"url": "l"}, {"url": "m"}, {"url": "s"}]}}
}"#;

#[tokio::test]
async fn profile_is_fetched_with_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/me")
        .match_header("authorization", "Bearer at-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"u1","display_name":"Ana","email":"ana@example.com","country":"PT","product":"premium"}"#)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server, Some("at-1"));
    let profile = h.client.profile().await.unwrap().ready().unwrap();
    assert_eq!(profile.display_name.as_deref(), Some("Ana"));
    assert_eq!(profile.product.as_deref(), Some("premium"));
    mock.assert_async().await;
}

#[tokio::test]
async fn profile_error_status_is_reported() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let h = harness(&server, Some("at-1"));
    let err = h.client.profile().await.unwrap_err();
    assert!(matches!(err, nowplay_player::Error::Api { status: 429, .. }));
}

#[tokio::test]
async fn playback_decodes_current_track() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PLAYING)
        .create_async()
        .await;

    let h = harness(&server, Some("at-1"));
    let playback = h.client.playback().await.unwrap().ready().unwrap().unwrap();
    let item = playback.item.unwrap();
    assert_eq!(item.name, "Windowlicker");
    assert_eq!(item.artist_names(), "Aphex Twin");
    assert_eq!(item.artwork_url(), Some("m"));
}

#[tokio::test]
async fn playback_empty_states() {
    for status in [204, 400, 404, 502] {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/me/player")
            .with_status(status)
            .create_async()
            .await;
        let h = harness(&server, Some("at-1"));
        let outcome = h.client.playback().await.unwrap();
        assert!(matches!(outcome, ApiOutcome::Ready(None)), "status {status}");
    }
}

#[tokio::test]
async fn commands_use_expected_methods() {
    let mut server = Server::new_async().await;
    let pause = server
        .mock("PUT", "/v1/me/player/pause")
        .match_header("authorization", "Bearer at-1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let next = server
        .mock("POST", "/v1/me/player/next")
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server, Some("at-1"));
    let status = h.client.command(PlayerCommand::Pause).await.unwrap().ready().unwrap();
    assert_eq!(status, 204);
    let status = h.client.command(PlayerCommand::Next).await.unwrap().ready().unwrap();
    assert_eq!(status, 403);
    pause.assert_async().await;
    next.assert_async().await;
}

#[tokio::test]
async fn calls_without_token_redirect() {
    let mut server = Server::new_async().await;
    let api = server.mock("GET", "/v1/me").expect(0).create_async().await;

    let h = harness(&server, None);
    let outcome = h.client.profile().await.unwrap();
    assert!(matches!(outcome, ApiOutcome::Redirected(_)));
    assert_eq!(h.navigator.visited().len(), 1);
    assert!(h.store.get(TokenKey::Verifier).is_some());
    api.assert_async().await;
}

#[tokio::test]
async fn poller_reports_playing_and_idle() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PLAYING)
        .create_async()
        .await;

    let h = harness(&server, Some("at-1"));
    let (poller, mut events) = PlaybackPoller::spawn(Arc::clone(&h.client), Duration::from_millis(20));

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        PollEvent::Playing(playback) => assert!(playback.is_playing),
        other => panic!("unexpected event {other:?}"),
    }

    poller.stop();
}

#[tokio::test]
async fn poller_stops_after_redirect() {
    let server = Server::new_async().await;
    let h = harness(&server, None);
    let (poller, mut events) = PlaybackPoller::spawn(Arc::clone(&h.client), Duration::from_millis(20));

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, PollEvent::Redirected(_)));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !poller.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(!h.navigator.visited().is_empty());
}

#[test]
fn invalid_base_url_is_named_in_the_error() {
    let session = Session::new(
        OAuthConfig {
            client_id: "client-123".into(),
            auth_url: "http://127.0.0.1:9/authorize".into(),
            token_url: "http://127.0.0.1:9/api/token".into(),
            redirect_uri: "http://127.0.0.1:8888/callback".into(),
            scopes: vec![],
            callback_param: "code".into(),
        },
        Arc::new(MemoryTokenStore::new()),
        Arc::new(ManualNavigator::new()),
        reqwest::Client::new(),
    );
    let err = PlayerClient::new(session.gateway(), "not a url").err().unwrap();
    assert!(err.to_string().starts_with(r#"invalid api base_url "not a url": "#));
}

#[tokio::test]
async fn poller_with_zero_interval_still_ticks() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/me/player")
        .with_status(204)
        .create_async()
        .await;
    let h = harness(&server, Some("at-1"));
    let (poller, mut events) = PlaybackPoller::spawn(Arc::clone(&h.client), Duration::ZERO);

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, PollEvent::NotPlaying));
    poller.stop();
}
