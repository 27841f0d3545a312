use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use mockito::Matcher;
use test_utils::current_user_fixture;
use test_utils::error_fixture;
use test_utils::heartbeat_response_fixture;
use test_utils::projects_fixture;

use super::ApiClient;
use super::KeyValidation;
use crate::configuration::MemorySettings;
use crate::domain::models::Heartbeat;
use crate::domain::models::LastHeartbeat;
use crate::domain::models::Project;
use crate::domain::services::RequestScheduler;
use crate::domain::services::TrackerContext;
use crate::domain::test_support::FakeHost;
use crate::domain::test_support::FakeProgress;

struct Fixture {
    context: Arc<TrackerContext>,
    scheduler: RequestScheduler,
    api: ApiClient,
}

fn fixture(url: &str) -> Fixture {
    let context = Arc::new(TrackerContext::new(Arc::new(MemorySettings::default())));
    let scheduler = RequestScheduler::default();
    let host = Arc::new(FakeHost::new(Some("Scene.unity"), "Foo"));
    let api = ApiClient::new(url, context.clone(), scheduler.clone(), host);

    return Fixture {
        context,
        scheduler,
        api,
    };
}

fn validated_fixture(url: &str) -> Fixture {
    let fixture = fixture(url);
    fixture.context.set_api_key("waka_123");
    fixture.context.set_key_validated(true);

    return fixture;
}

fn api_key(key: &str) -> Matcher {
    return Matcher::UrlEncoded("api_key".to_string(), key.to_string());
}

#[tokio::test]
async fn it_skips_validation_for_empty_keys() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/current")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let fixture = fixture(&server.url());
    fixture.context.set_key_validated(true);
    let progress = FakeProgress::default();

    let res = fixture.api.validate_key("", &progress).await;

    assert_eq!(res, KeyValidation::Empty);
    assert!(!fixture.context.is_key_validated());
    assert_eq!(progress.reports.load(Ordering::SeqCst), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn it_validates_keys() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/current")
        .match_query(api_key("waka_123"))
        .with_status(200)
        .with_body(current_user_fixture())
        .create_async()
        .await;

    let fixture = fixture(&server.url());
    let progress = FakeProgress::default();

    let res = fixture.api.validate_key(" waka_123 ", &progress).await;

    mock.assert_async().await;
    match res {
        KeyValidation::Valid(user) => assert_eq!(user.label(), "Ada L.".to_string()),
        other => panic!("unexpected validation result {other:?}"),
    }
    assert!(fixture.context.is_key_validated());
    assert_eq!(fixture.context.api_key(), "waka_123".to_string());
    assert_eq!(
        fixture.context.user().map(|user| return user.id),
        Some("a1b2c3".to_string())
    );
    assert!(progress.cleared.load(Ordering::SeqCst));

    return Ok(());
}

#[tokio::test]
async fn it_rejects_keys_the_server_reports_invalid() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/current")
        .match_query(api_key("bad"))
        .with_status(401)
        .with_body(error_fixture("invalid api key"))
        .create_async()
        .await;

    let fixture = fixture(&server.url());
    let res = fixture
        .api
        .validate_key("bad", &FakeProgress::default())
        .await;

    mock.assert_async().await;
    assert_eq!(res, KeyValidation::Invalid("invalid api key".to_string()));
    assert!(!fixture.context.is_key_validated());
    assert_eq!(fixture.context.user(), None);
}

#[tokio::test]
async fn it_trusts_the_envelope_over_the_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/users/current")
        .match_query(api_key("bad"))
        .with_status(200)
        .with_body(error_fixture("invalid api key"))
        .create_async()
        .await;

    let fixture = fixture(&server.url());
    let res = fixture
        .api
        .validate_key("bad", &FakeProgress::default())
        .await;

    assert_eq!(res, KeyValidation::Invalid("invalid api key".to_string()));
    assert!(!fixture.context.is_key_validated());
}

#[tokio::test]
async fn it_fails_validation_on_unexpected_bodies() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/users/current")
        .match_query(api_key("waka_123"))
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let fixture = fixture(&server.url());
    let res = fixture
        .api
        .validate_key("waka_123", &FakeProgress::default())
        .await;

    assert_eq!(res, KeyValidation::Failed);
    assert!(!fixture.context.is_key_validated());
}

#[tokio::test]
async fn it_cancels_validation_without_touching_validity() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/users/current")
        .match_query(api_key("waka_123"))
        .with_status(200)
        .with_body(current_user_fixture())
        .create_async()
        .await;

    let fixture = validated_fixture(&server.url());
    let progress = FakeProgress::cancelling();

    let res = fixture.api.validate_key("waka_123", &progress).await;

    assert_eq!(res, KeyValidation::Cancelled);
    assert!(fixture.context.is_key_validated());
    assert_eq!(fixture.context.user(), None);
    assert!(progress.cleared.load(Ordering::SeqCst));
}

#[tokio::test]
async fn it_skips_listing_projects_without_a_validated_key() {
    let fixture = fixture("http://localhost:1");

    assert!(fixture.api.list_projects().is_none());
    assert!(fixture.scheduler.is_empty());
}

#[tokio::test]
async fn it_lists_projects_and_selects_the_application_project() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/users/current/projects")
        .match_query(api_key("waka_123"))
        .with_status(200)
        .with_body(projects_fixture())
        .create_async()
        .await;

    let fixture = validated_fixture(&server.url());
    assert!(fixture.api.list_projects().is_some());
    assert_eq!(fixture.scheduler.len(), 1);
    fixture.scheduler.flush().await;

    mock.assert_async().await;
    assert_eq!(fixture.context.projects().len(), 3);
    assert_eq!(
        fixture.context.active_project(),
        Some(Project::new("p-2", "Foo"))
    );
}

#[tokio::test]
async fn it_keeps_an_existing_project_selection() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/users/current/projects")
        .match_query(api_key("waka_123"))
        .with_status(200)
        .with_body(projects_fixture())
        .create_async()
        .await;

    let fixture = validated_fixture(&server.url());
    fixture
        .context
        .select_project(Some(&Project::new("p-1", "Bar")));
    fixture.api.list_projects();
    fixture.scheduler.flush().await;

    assert_eq!(
        fixture.context.active_project(),
        Some(Project::new("p-1", "Bar"))
    );
}

#[tokio::test]
async fn it_keeps_the_project_cache_on_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/users/current/projects")
        .match_query(api_key("waka_123"))
        .with_status(500)
        .with_body(error_fixture("something broke"))
        .create_async()
        .await;

    let fixture = validated_fixture(&server.url());
    fixture
        .context
        .set_projects(vec![Project::new("p-9", "Cached")]);
    fixture.api.list_projects();
    fixture.scheduler.flush().await;

    assert_eq!(
        fixture.context.projects(),
        vec![Project::new("p-9", "Cached")]
    );
    assert_eq!(fixture.context.active_project(), None);
}

#[tokio::test]
async fn it_cancels_project_listing() {
    let fixture = validated_fixture("http://localhost:1");
    fixture
        .context
        .set_projects(vec![Project::new("p-9", "Cached")]);

    let abort = fixture.api.list_projects().unwrap();
    abort.abort();
    fixture.scheduler.flush().await;

    assert_eq!(
        fixture.context.projects(),
        vec![Project::new("p-9", "Cached")]
    );
}

#[tokio::test]
async fn it_has_nothing_to_recheck_without_a_stored_key() {
    let fixture = fixture("http://localhost:1");

    assert!(fixture.api.revalidate_stored_key().is_none());
    assert!(fixture.scheduler.is_empty());
}

#[tokio::test]
async fn it_rechecks_a_stored_key_then_lists_projects() {
    let mut server = mockito::Server::new_async().await;
    let user_mock = server
        .mock("GET", "/users/current")
        .match_query(api_key("waka_123"))
        .with_status(200)
        .with_body(current_user_fixture())
        .create_async()
        .await;
    let projects_mock = server
        .mock("GET", "/users/current/projects")
        .match_query(api_key("waka_123"))
        .with_status(200)
        .with_body(projects_fixture())
        .create_async()
        .await;

    let fixture = fixture(&server.url());
    fixture.context.set_api_key("waka_123");
    assert!(!fixture.context.is_key_validated());

    assert!(fixture.api.revalidate_stored_key().is_some());
    fixture.scheduler.flush().await;

    user_mock.assert_async().await;
    projects_mock.assert_async().await;
    assert!(fixture.context.is_key_validated());
    assert_eq!(
        fixture.context.user().map(|user| return user.id),
        Some("a1b2c3".to_string())
    );
    assert_eq!(
        fixture.context.active_project(),
        Some(Project::new("p-2", "Foo"))
    );
}

#[tokio::test]
async fn it_keeps_the_stored_validation_when_the_recheck_cannot_connect() {
    let fixture = validated_fixture("http://localhost:1");

    fixture.api.revalidate_stored_key();
    fixture.scheduler.flush().await;

    assert!(fixture.context.is_key_validated());
    assert!(fixture.context.projects().is_empty());
}

#[tokio::test]
async fn it_posts_heartbeats_as_json() -> Result<()> {
    let heartbeat = Heartbeat::new("Scene.unity", 1000, "Foo", "develop", false);

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/users/current/heartbeats")
        .match_query(api_key("waka_123"))
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(serde_json::to_value(&heartbeat)?))
        .with_status(201)
        .with_body(heartbeat_response_fixture("Scene.unity", 1000))
        .create_async()
        .await;

    let fixture = validated_fixture(&server.url());
    fixture.api.post_heartbeat(&heartbeat)?;
    fixture.scheduler.flush().await;

    mock.assert_async().await;
    assert_eq!(
        fixture.context.last_heartbeat(),
        LastHeartbeat {
            id: "hb-1".to_string(),
            entity: "Scene.unity".to_string(),
            entity_type: "app".to_string(),
            time: 1000.0,
        }
    );

    return Ok(());
}

#[tokio::test]
async fn it_leaves_the_snapshot_alone_when_heartbeats_fail() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/users/current/heartbeats")
        .match_query(api_key("waka_123"))
        .with_status(400)
        .with_body(error_fixture("bad heartbeat"))
        .create_async()
        .await;

    let fixture = validated_fixture(&server.url());
    fixture
        .api
        .post_heartbeat(&Heartbeat::new("Scene.unity", 1000, "", "", false))?;
    fixture.scheduler.flush().await;

    assert_eq!(fixture.context.last_heartbeat(), LastHeartbeat::default());
    return Ok(());
}
