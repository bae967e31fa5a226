//! Router-level tests: the full application over an in-memory store with a manual clock.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use film_catalog::{
    service::AccountService,
    session::{ManualClock, SESSION_COOKIE},
    AppConfig, AppState, MemoryStore, SessionStore, Store,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-secret";

struct TestApp {
    store: MemoryStore,
    clock: Arc<ManualClock>,
    state: AppState,
    started: DateTime<Utc>,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn session_cookie(&self) -> Option<Cookie<'static>> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| Cookie::parse(v.to_str().ok()?.to_string()).ok())
            .find(|c| c.name() == SESSION_COOKIE)
    }
}

fn setup_with(config: AppConfig) -> TestApp {
    let store = MemoryStore::new();
    let started = Utc::now();
    let clock = Arc::new(ManualClock::new(started));
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let sessions = Arc::new(SessionStore::with_clock(shared.clone(), config.session_ttl, clock.clone()));
    let state = AppState::with_sessions(shared, sessions, &config).unwrap();
    TestApp { store, clock, state, started }
}

fn setup() -> TestApp {
    setup_with(AppConfig { password_log_n: 4, ..AppConfig::default() })
}

impl TestApp {
    fn router(&self) -> Router {
        film_catalog::app(self.state.clone())
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
        }
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let response = self.router().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        Reply { status, headers, body }
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn get(&self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None, None).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> String {
        let reply = self.post("/sign-in", None, json!({"email": email, "password": password})).await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.session_cookie().unwrap().value().to_string()
    }

    async fn admin_token(&self) -> String {
        AccountService::ensure_admin(&self.store, &self.state.hasher, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();
        self.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn user_token(&self, email: &str) -> String {
        let reply = self.post("/sign-up", None, json!({"email": email, "password": "pw"})).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        self.sign_in(email, "pw").await
    }
}

fn jane() -> Value {
    json!({"name": "Jane Doe", "gender": "Female", "birthday": "1980-01-01"})
}

#[tokio::test]
async fn sign_up_creates_a_plain_user_once() {
    let app = setup();
    let body = json!({"email": "a@b.com", "password": "pw"});

    let first = app.post("/sign-up", None, body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert!(first.body.is_empty());

    let again = app.post("/sign-up", None, body).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.user_count(), 1);

    let user = app.store.find_user_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(user.role, "user");
    assert_ne!(user.password_hash, "pw");
}

#[tokio::test]
async fn sign_up_rejects_bad_email_and_malformed_body() {
    let app = setup();
    let bad_email = app.post("/sign-up", None, json!({"email": "nope", "password": "pw"})).await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let missing = app.post("/sign-up", None, json!({"email": "a@b.com"})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn sign_in_issues_cookie_matching_stored_session() {
    let app = setup();
    app.post("/sign-up", None, json!({"email": "a@b.com", "password": "pw"})).await;

    let reply = app.post("/sign-in", None, json!({"email": "a@b.com", "password": "pw"})).await;
    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.session_cookie().unwrap();
    assert_eq!(cookie.http_only(), Some(true));

    let session = app.store.find_session(cookie.value()).await.unwrap().unwrap();
    assert_eq!(session.expires_at, app.started + chrono::Duration::days(7));
    assert_eq!(
        cookie.expires_datetime().map(|t| t.unix_timestamp()),
        Some(session.expires_at.timestamp())
    );
}

#[tokio::test]
async fn sign_in_failures_are_indistinguishable() {
    let app = setup();
    app.post("/sign-up", None, json!({"email": "a@b.com", "password": "pw"})).await;

    let wrong = app.post("/sign-in", None, json!({"email": "a@b.com", "password": "nope"})).await;
    let unknown = app.post("/sign-in", None, json!({"email": "x@b.com", "password": "pw"})).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
    assert!(wrong.session_cookie().is_none());
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn gated_routes_need_a_known_cookie() {
    let app = setup();
    let film = json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8});

    let missing = app.post("/films/add", None, film.clone()).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let unknown = app.post("/films/add", Some("not-a-session"), film).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.get("/films/get").await.json(), json!([]));
}

#[tokio::test]
async fn expired_session_is_deleted_and_rejected() {
    let app = setup();
    let token = app.admin_token().await;
    assert_eq!(app.store.session_count(), 1);

    app.clock.advance(chrono::Duration::days(7) + chrono::Duration::seconds(1));
    let reply = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.session_count(), 0);

    let again = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expiry_is_checked_before_role() {
    let app = setup();
    let token = app.user_token("user@example.com").await;
    assert_eq!(app.store.session_count(), 1);

    app.clock.advance(chrono::Duration::days(7) + chrono::Duration::seconds(1));
    let reply = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn sign_in_with_out_of_range_expiry_fails_cleanly() {
    let app = setup_with(AppConfig {
        password_log_n: 4,
        session_ttl: chrono::Duration::days(100_000_000),
        ..AppConfig::default()
    });
    let signed_up = app.post("/sign-up", None, json!({"email": "a@b.com", "password": "pw"})).await;
    assert_eq!(signed_up.status, StatusCode::CREATED);

    let reply = app.post("/sign-in", None, json!({"email": "a@b.com", "password": "pw"})).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.session_cookie().is_none());
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn session_is_valid_up_to_its_expiry() {
    let app = setup();
    let token = app.admin_token().await;

    app.clock.advance(chrono::Duration::days(7));
    let reply = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(reply.status, StatusCode::CREATED);
}

#[tokio::test]
async fn non_admin_is_forbidden_and_nothing_is_written() {
    let app = setup();
    let token = app.user_token("user@example.com").await;

    let reply = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let film = json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8, "actors": [1]});
    assert_eq!(app.post("/films/add", Some(&admin), film).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.get("/films/get").await.json(), json!([]));
}

#[tokio::test]
async fn gate_refreshes_the_cookie_with_the_same_expiry() {
    let app = setup();
    let token = app.admin_token().await;
    app.clock.advance(chrono::Duration::days(1));

    let reply = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let cookie = reply.session_cookie().unwrap();
    assert_eq!(cookie.value(), token);
    let expected = app.started + chrono::Duration::days(7);
    assert_eq!(cookie.expires_datetime().map(|t| t.unix_timestamp()), Some(expected.timestamp()));
}

#[tokio::test]
async fn actor_and_film_show_up_in_filmography() {
    let app = setup();
    let token = app.admin_token().await;

    assert_eq!(app.post("/actors/add", Some(&token), jane()).await.status, StatusCode::CREATED);
    let film = json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8, "actors": [1]});
    assert_eq!(app.post("/films/add", Some(&token), film).await.status, StatusCode::CREATED);

    let rows = app.get("/actors/get").await;
    assert_eq!(rows.status, StatusCode::OK);
    assert_eq!(rows.json(), json!([{"actor_name": "Jane Doe", "film_name": "Demo"}]));

    let films = app.get("/films/get").await.json();
    assert_eq!(films, json!([{"id": 1, "name": "Demo", "release_date": "2020-01-01", "rating": 8}]));
}

#[tokio::test]
async fn deleting_an_actor_removes_its_memberships() {
    let app = setup();
    let token = app.admin_token().await;
    app.post("/actors/add", Some(&token), jane()).await;
    app.post("/actors/add", Some(&token), json!({"name": "John Roe", "gender": "Male", "birthday": "1975-05-05"}))
        .await;
    let film = json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8, "actors": [1, 2, 1]});
    app.post("/films/add", Some(&token), film).await;
    assert_eq!(app.store.membership_count(), 2);

    let reply = app.post("/actors/delete", Some(&token), json!({"id": 1})).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(app.store.membership_count(), 1);
    assert_eq!(app.get("/actors/get").await.json(), json!([{"actor_name": "John Roe", "film_name": "Demo"}]));

    let gone = app.post("/actors/delete", Some(&token), json!({"id": 1})).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn film_update_replaces_the_cast() {
    let app = setup();
    let token = app.admin_token().await;
    app.post("/actors/add", Some(&token), jane()).await;
    app.post("/actors/add", Some(&token), json!({"name": "John Roe", "gender": "Male", "birthday": "1975-05-05"}))
        .await;
    app.post("/films/add", Some(&token), json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8, "actors": [1]}))
        .await;

    let update = json!({"id": 1, "name": "Demo II", "release_date": "2021-01-01", "rating": 9, "actors": [2]});
    assert_eq!(app.post("/films/update", Some(&token), update).await.status, StatusCode::CREATED);
    assert_eq!(app.store.cast_of(1), vec![2]);
    assert_eq!(app.get("/actors/get").await.json(), json!([{"actor_name": "John Roe", "film_name": "Demo II"}]));

    let missing = json!({"id": 42, "name": "X", "release_date": "2021-01-01", "rating": 1});
    assert_eq!(app.post("/films/update", Some(&token), missing).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn actor_update_validates_and_applies() {
    let app = setup();
    let token = app.admin_token().await;
    app.post("/actors/add", Some(&token), jane()).await;
    app.post("/films/add", Some(&token), json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8, "actors": [1]}))
        .await;

    let blank = json!({"id": 1, "name": " ", "gender": "Female", "birthday": "1980-01-01"});
    assert_eq!(app.post("/actors/update", Some(&token), blank).await.status, StatusCode::BAD_REQUEST);

    let renamed = json!({"id": 1, "name": "Jane Smith", "gender": "Female", "birthday": "1980-01-01"});
    assert_eq!(app.post("/actors/update", Some(&token), renamed).await.status, StatusCode::CREATED);
    assert_eq!(app.get("/actors/get").await.json(), json!([{"actor_name": "Jane Smith", "film_name": "Demo"}]));
}

#[tokio::test]
async fn malformed_write_bodies_are_bad_requests() {
    let app = setup();
    let token = app.admin_token().await;

    let bad_gender = json!({"name": "X", "gender": "Other", "birthday": "1980-01-01"});
    assert_eq!(app.post("/actors/add", Some(&token), bad_gender).await.status, StatusCode::BAD_REQUEST);

    let bad_date = json!({"name": "X", "release_date": "01/01/2020", "rating": 1});
    assert_eq!(app.post("/films/add", Some(&token), bad_date).await.status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/actors/add")
        .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn films_sort_by_requested_key_descending() {
    let app = setup();
    let token = app.admin_token().await;
    for (name, date, rating) in [("Alpha", "2001-01-01", 5), ("Charlie", "1999-01-01", 9), ("Bravo", "2010-01-01", 7)] {
        let film = json!({"name": name, "release_date": date, "rating": rating});
        assert_eq!(app.post("/films/add", Some(&token), film).await.status, StatusCode::CREATED);
    }

    let names = |v: Value| -> Vec<String> {
        v.as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap().to_string()).collect()
    };
    assert_eq!(names(app.get("/films/get").await.json()), ["Charlie", "Bravo", "Alpha"]);
    assert_eq!(names(app.get("/films/get?sort_by=name").await.json()), ["Charlie", "Bravo", "Alpha"]);
    assert_eq!(names(app.get("/films/get?sort_by=release_date").await.json()), ["Bravo", "Alpha", "Charlie"]);
    assert_eq!(names(app.get("/films/get?sort_by=id;DROP").await.json()), ["Charlie", "Bravo", "Alpha"]);
}

#[tokio::test]
async fn search_matches_film_or_cast_names() {
    let app = setup();
    let token = app.admin_token().await;
    app.post("/actors/add", Some(&token), jane()).await;
    app.post("/films/add", Some(&token), json!({"name": "Demo", "release_date": "2020-01-01", "rating": 8, "actors": [1]}))
        .await;
    app.post("/films/add", Some(&token), json!({"name": "100% Real", "release_date": "2020-01-01", "rating": 3}))
        .await;

    assert_eq!(app.get("/film/get?fragment=Jane").await.json(), json!([{"name": "Demo"}]));
    assert_eq!(app.get("/film/get?fragment=emo").await.json(), json!([{"name": "Demo"}]));
    assert_eq!(app.get("/film/get?fragment=jane").await.json(), json!([]));
    assert_eq!(app.get("/film/get?fragment=%25").await.json(), json!([{"name": "100% Real"}]));
    assert_eq!(app.get("/film/get").await.json().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn sign_out_revokes_the_session() {
    let app = setup();
    let token = app.admin_token().await;

    let reply = app.send(Method::POST, "/sign-out", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.session_cookie().is_some());
    assert_eq!(app.store.session_count(), 0);

    let after = app.post("/actors/add", Some(&token), jane()).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);

    let anonymous = app.send(Method::POST, "/sign-out", None, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = setup_with(AppConfig { password_log_n: 4, max_body_bytes: 64, ..AppConfig::default() });
    let body = json!({"email": "a@b.com", "password": "x".repeat(256)});
    let reply = app.post("/sign-up", None, body).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn ambient_routes_are_public() {
    let app = setup();
    assert_eq!(app.get("/health").await.status, StatusCode::OK);
    assert_eq!(app.get("/ready").await.status, StatusCode::OK);
    let version = app.get("/version").await;
    assert_eq!(version.status, StatusCode::OK);
    assert_eq!(version.json()["name"], "film-catalog");
}
