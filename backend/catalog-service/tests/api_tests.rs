/// HTTP-level tests for the catalog API
///
/// This test module covers:
/// - Registration, login and bearer authentication
/// - Filtered listing, search and pagination bounds
/// - CSV import through /load-data (insert / update / skip)
/// - Statistics and filter value endpoints
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use catalog_service::{
    build_router,
    config::Config,
    db::memory::{MemoryContentStore, MemoryUserStore},
    AppState,
};
use crypto_core::jwt::{Claims, JwtKeys};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

const CATALOG_CSV: &str = "\
show_id,type,title,director,cast,country,date_added,release_year,rating,duration,listed_in,description
s1,Movie,Dick Johnson Is Dead,Kirsten Johnson,,United States,\"September 25, 2021\",2020,PG-13,90 min,Documentaries,A filmmaker stages his father's death.
s2,TV Show,Blood & Water,,\"Ama Qamata, Khosi Ngema\",South Africa,\"September 24, 2021\",2021,TV-MA,2 Seasons,\"International TV Shows, TV Dramas, TV Mysteries\",A Cape Town teen crosses paths with a swimmer.
s3,TV Show,Ganglands,Julien Leclercq,\"Sami Bouajila, Tracy Gotoas\",\"France, Belgium\",\"September 24, 2021\",2021,TV-MA,1 Season,\"Crime TV Shows, International TV Shows, TV Action & Adventure\",A protector joins a gang of thieves.
s4,Movie,Sankofa,Haile Gerima,\"Kofi Ghanaba, Oyafunmike Ogunlano\",\"United States, Ghana, Burkina Faso\",\"September 24, 2021\",1993.0,TV-MA,125 min,\"Dramas, Independent Movies, International Movies\",An arrogant model is transported back to slavery.
,Movie,Row Without Id,,,,,2000,PG,,Dramas,
";

struct TestApp {
    router: Router,
    users: Arc<MemoryUserStore>,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = SECRET.to_string();
    config.catalog.import_batch_size = 2;
    config
}

fn test_app() -> TestApp {
    let users = Arc::new(MemoryUserStore::new());
    let state = AppState::new(
        users.clone(),
        Arc::new(MemoryContentStore::new()),
        test_config(),
    )
    .unwrap();

    TestApp {
        router: build_router(state),
        users,
    }
}

fn write_csv(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("catalog-test-{}.csv", Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, uri, token, None).await;
    (status, body)
}

async fn register(app: &TestApp, username: &str, email: &str, password: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": password })),
    )
    .await;
    (status, body)
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    (status, body)
}

/// Register and log in a default user, returning the bearer token.
async fn signed_in(app: &TestApp) -> String {
    let (status, _) = register(app, "alice", "alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(app, "alice", "password123").await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

/// Sign in and import the sample catalog.
async fn seeded(app: &TestApp) -> String {
    let token = signed_in(app).await;
    let path = write_csv(CATALOG_CSV);

    let (status, _, body) = send(
        app,
        Method::POST,
        &format!("/load-data?csv_path={}", path.display()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    std::fs::remove_file(path).ok();
    token
}

fn titles(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_public_endpoints() {
    let app = test_app();

    let (status, body) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));

    let (status, body) = get(&app, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["auth"]["login"], "POST /auth/login");

    let (status, body) = get(&app, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_content"], 0);

    let (status, body) = get(&app, "/filters", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ratings"], json!([]));
}

#[tokio::test]
async fn test_register_returns_public_user() {
    let app = test_app();
    let (status, body) = register(&app, "alice", "alice@example.com", "password123").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["is_active"], true);
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let app = test_app();
    register(&app, "alice", "alice@example.com", "password123").await;

    let (status, body) = register(&app, "alice", "other@example.com", "password123").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = register(&app, "alice2", "alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = test_app();

    let cases = [
        ("al", "al@example.com", "password123"),
        ("alice smith", "alice@example.com", "password123"),
        ("alice", "not-an-email", "password123"),
        ("alice", "alice@example.com", "short"),
    ];
    for (username, email, password) in cases {
        let (status, body) = register(&app, username, email, password).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{username} {email}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_rejects_overlong_email() {
    let app = test_app();
    let domain = format!("{}com", format!("{}.", "b".repeat(60)).repeat(4));
    let email = format!("{}@{domain}", "a".repeat(60));
    assert!(email.len() > 255);

    let (status, body) = register(&app, "alice", &email, "password123").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_and_me() {
    let app = test_app();
    let token = signed_in(&app).await;

    let (status, body) = get(&app, "/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, body) = login(&app, "alice", "password123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 30 * 60);
}

#[tokio::test]
async fn test_login_failures() {
    let app = test_app();
    signed_in(&app).await;

    let (status, body) = login(&app, "alice", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = login(&app, "nobody", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = login(&app, "", "password123").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_inactive_user_is_forbidden() {
    let app = test_app();
    let token = signed_in(&app).await;
    assert!(app.users.set_active("alice", false).await);

    let (status, _) = login(&app, "alice", "password123").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(&app, "/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();

    for uri in [
        "/auth/me",
        "/content",
        "/content/",
        "/content/1",
        "/content/search/query?q=x",
        "/content/filters/ratings",
        "/content/stats/overview",
    ] {
        let (status, headers, _) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    let (status, _, _) = send(&app, Method::POST, "/load-data", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/content", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_rejected() {
    let app = test_app();
    signed_in(&app).await;

    let keys = JwtKeys::new(SECRET, "HS256", Duration::from_secs(60)).unwrap();
    let now = chrono::Utc::now().timestamp();
    let expired = keys
        .encode_claims(&Claims {
            sub: "alice".into(),
            uid: 1,
            iat: now - 7200,
            exp: now - 3600,
        })
        .unwrap();
    let (status, _) = get(&app, "/auth/me", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = JwtKeys::new(
        "some-other-service-secret-0123456789abcd",
        "HS256",
        Duration::from_secs(60),
    )
    .unwrap()
    .issue(1, "alice")
    .unwrap();
    let (status, _) = get(&app, "/auth/me", Some(&foreign.access_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ghost = keys.issue(42, "ghost").unwrap();
    let (status, _) = get(&app, "/auth/me", Some(&ghost.access_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_load_data_reports_counts() {
    let app = test_app();
    let token = signed_in(&app).await;
    let path = write_csv(CATALOG_CSV);
    let uri = format!("/load-data?csv_path={}", path.display());

    let (status, _, body) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["records_processed"], 5);
    assert_eq!(body["records_inserted"], 4);
    assert_eq!(body["records_updated"], 0);
    assert_eq!(body["records_skipped"], 1);
    assert_eq!(body["statistics"]["total_content"], 4);
    assert_eq!(body["statistics"]["movies"], 2);
    assert_eq!(body["statistics"]["tv_shows"], 2);

    let (_, _, again) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(again["records_inserted"], 0);
    assert_eq!(again["records_updated"], 0);
    assert_eq!(again["records_skipped"], 5);

    std::fs::write(&path, CATALOG_CSV.replace("2 Seasons", "3 Seasons")).unwrap();
    let (_, _, changed) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(changed["records_updated"], 1);
    assert_eq!(changed["records_skipped"], 4);

    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn test_load_data_errors() {
    let app = test_app();
    let token = signed_in(&app).await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/load-data?csv_path=/no/such/file.csv",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let path = write_csv("title,type\nSomething,Movie\n");
    let (status, _, _) = send(
        &app,
        Method::POST,
        &format!("/load-data?csv_path={}", path.display()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    std::fs::remove_file(path).ok();

    // Default path from configuration does not exist in the test environment
    let (status, _, _) = send(&app, Method::POST, "/load-data", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters() {
    let app = test_app();
    let token = seeded(&app).await;

    let (status, body) = get(&app, "/content/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (_, body) = get(&app, "/content?type=TV%20Show", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Blood & Water", "Ganglands"]);

    let (_, body) = get(&app, "/content?country=united%20states", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Dick Johnson Is Dead", "Sankofa"]);

    let (_, body) = get(&app, "/content?release_year=1993", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Sankofa"]);

    let (_, body) = get(&app, "/content?category=dramas&rating=TV-MA", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Blood & Water", "Sankofa"]);

    let (_, body) = get(&app, "/content?cast=khosi", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Blood & Water"]);

    let (_, body) = get(&app, "/content?director=leclercq", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Ganglands"]);

    let (_, body) = get(&app, "/content?type=&title=&release_year=", Some(&token)).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (_, body) = get(&app, "/content?title=100%25", Some(&token)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_pagination_bounds() {
    let app = test_app();
    let token = seeded(&app).await;

    let (status, body) = get(&app, "/content?limit=2&offset=1", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Blood & Water", "Ganglands"]);

    for uri in [
        "/content?limit=0",
        "/content?limit=101",
        "/content?offset=-1",
        "/content?release_year=soon",
        "/content/search/query?q=a&limit=500",
        "/content/by-rating/PG?offset=-5",
    ] {
        let (status, body) = get(&app, uri, Some(&token)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_maximum_page_size_is_accepted() {
    let app = test_app();
    let token = seeded(&app).await;

    for uri in [
        "/content?limit=100",
        "/content/search/query?q=a&limit=100",
        "/content/by-rating/TV-MA?limit=100",
    ] {
        let (status, body) = get(&app, uri, Some(&token)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(!body.as_array().unwrap().is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn test_get_by_id() {
    let app = test_app();
    let token = seeded(&app).await;

    let (status, body) = get(&app, "/content/1", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["show_id"], "s1");
    assert_eq!(body["type"], "Movie");
    assert_eq!(body["release_year"], 2020);
    assert_eq!(body["cast"], Value::Null);

    let (status, _) = get(&app, "/content/4", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/content/999", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/content/abc", Some(&token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_search() {
    let app = test_app();
    let token = seeded(&app).await;

    let (status, body) = get(&app, "/content/search/query?q=swimmer", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Blood & Water"]);

    let (_, body) = get(&app, "/content/search/query?q=GERIMA", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Sankofa"]);

    let (status, _) = get(&app, "/content/search/query", Some(&token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&app, "/content/search/query?q=", Some(&token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_by_rating_and_category() {
    let app = test_app();
    let token = seeded(&app).await;

    let (_, body) = get(&app, "/content/by-rating/TV-MA", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Blood & Water", "Ganglands", "Sankofa"]);

    let (_, body) = get(&app, "/content/by-rating/TV-MA?limit=1&offset=2", Some(&token)).await;
    assert_eq!(titles(&body), vec!["Sankofa"]);

    let (_, body) = get(&app, "/content/by-rating/TV", Some(&token)).await;
    assert_eq!(body, json!([]));

    let (_, body) = get(
        &app,
        "/content/by-category/International%20TV%20Shows",
        Some(&token),
    )
    .await;
    assert_eq!(titles(&body), vec!["Blood & Water", "Ganglands"]);
}

#[tokio::test]
async fn test_filter_values() {
    let app = test_app();
    let token = seeded(&app).await;

    let (_, ratings) = get(&app, "/content/filters/ratings", Some(&token)).await;
    assert_eq!(ratings, json!(["PG-13", "TV-MA"]));

    let (_, countries) = get(&app, "/content/filters/countries", Some(&token)).await;
    assert_eq!(
        countries,
        json!(["Belgium", "Burkina Faso", "France", "Ghana", "South Africa", "United States"])
    );

    let (_, categories) = get(&app, "/content/filters/categories", Some(&token)).await;
    let categories: Vec<String> = serde_json::from_value(categories).unwrap();
    assert!(categories.contains(&"TV Dramas".to_string()));
    assert!(categories.windows(2).all(|w| w[0] < w[1]));

    let (_, public) = get(&app, "/filters", None).await;
    assert_eq!(public["ratings"], ratings);
    assert_eq!(public["countries"], countries);
}

#[tokio::test]
async fn test_statistics() {
    let app = test_app();
    let token = seeded(&app).await;

    let (status, stats) = get(&app, "/content/stats/overview", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_content"], 4);
    assert_eq!(stats["movies"], 2);
    assert_eq!(stats["tv_shows"], 2);
    assert_eq!(
        stats["by_rating"],
        json!([
            { "rating": "TV-MA", "count": 3 },
            { "rating": "PG-13", "count": 1 }
        ])
    );
    assert_eq!(
        stats["by_category"][0],
        json!({ "category": "International TV Shows", "count": 2 })
    );

    let (_, public) = get(&app, "/stats", None).await;
    assert_eq!(public, stats);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app();
    seeded(&app).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("catalog_import_rows_total"));
}
