//! End-to-end tests against a live PostgreSQL. They run only when `DATABASE_URL` is set
//! and skip otherwise. Every test uses its own one-connection pool, so statements are
//! reused from the connection's cache, and its own name suffix, so tests can share one database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use baike::error::NON_FIELD_ERRORS;
use baike::service::entries::EDIT_SUMMARY;
use baike::service::favorites::ALREADY_FAVORITED;
use baike::service::statistics::FALLBACK_CATEGORIES;
use baike::{app, ensure_tables, AppState, Settings};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::path::{Path, PathBuf};
use tower::ServiceExt;

#[derive(Clone)]
struct Harness {
    state: AppState,
    suffix: String,
}

async fn harness() -> Option<Harness> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    ensure_tables(&pool).await.expect("create tables");
    let suffix = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
    let settings = Settings {
        database_url: url,
        media_root: std::env::temp_dir().join(format!("baike-db-{suffix}")),
        ..Settings::default()
    };
    Some(Harness {
        state: AppState::new(pool, settings),
        suffix,
    })
}

impl Harness {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = app(self.state.clone()).oneshot(req).await.expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        };
        self.send(req.unwrap()).await
    }

    fn name(&self, base: &str) -> String {
        format!("{base}_{}", self.suffix)
    }

    /// Registers `base` (suffixed) and returns its token.
    async fn register(&self, base: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register/",
                None,
                Some(json!({
                    "username": self.name(base),
                    "password": "correct-horse-1",
                    "password_confirm": "correct-horse-1",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["token"].as_str().expect("token").to_string()
    }

    async fn category(&self, token: &str, base: &str) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/categories/",
                Some(token),
                Some(json!({ "name": self.name(base) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().expect("category id")
    }

    /// Creates an entry titled `title` (suffixed); `extra` fields are merged into the body.
    async fn entry(&self, token: &str, title: &str, extra: Value) -> i64 {
        let mut body = json!({ "title": self.name(title), "content": "v1" });
        if let (Some(target), Some(more)) = (body.as_object_mut(), extra.as_object()) {
            target.extend(more.clone());
        }
        let (status, body) = self.call(Method::POST, "/api/entries/", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().expect("entry id")
    }

    fn image_dir(&self) -> PathBuf {
        self.state.settings.media_root.join("encyclopedia/images")
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn clearing_then_setting_category_on_one_connection() {
    let Some(h) = harness().await else { return };
    let token = h.register("cat_patch").await;
    let category = h.category(&token, "patched").await;
    let id = h.entry(&token, "patched entry", json!({ "category": category })).await;
    let uri = format!("/api/entries/{id}/");

    let (status, body) = h.call(Method::PATCH, &uri, Some(&token), Some(json!({ "category": null }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["category"].is_null());

    let (status, body) = h
        .call(Method::PATCH, &uri, Some(&token), Some(json!({ "category": category })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["category"]["id"], category);

    let (status, body) = h
        .call(Method::PATCH, &uri, Some(&token), Some(json!({ "is_published": true, "category": null })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["category"].is_null());
}

#[tokio::test]
async fn every_update_writes_a_history_row() {
    let Some(h) = harness().await else { return };
    let token = h.register("historian").await;
    let id = h.entry(&token, "history", json!({})).await;
    let uri = format!("/api/entries/{id}/");

    let (status, _) = h.call(Method::PATCH, &uri, Some(&token), Some(json!({ "content": "v2" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(Method::PATCH, &uri, Some(&token), Some(json!({ "summary": "short" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h.call(Method::GET, &format!("{uri}history/"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("history list");
    assert_eq!(items.len(), 2);
    // newest first; an edit that leaves content alone records it unchanged
    assert_eq!(items[0]["old_content"], "v2");
    assert_eq!(items[0]["new_content"], "v2");
    assert_eq!(items[1]["old_content"], "v1");
    assert_eq!(items[1]["new_content"], "v2");
    assert_eq!(items[1]["edit_summary"], EDIT_SUMMARY);
    assert_eq!(items[1]["editor"]["username"], h.name("historian"));
}

#[tokio::test]
async fn reads_count_views_and_concurrent_likes_all_land() {
    let Some(h) = harness().await else { return };
    let token = h.register("liker").await;
    let id = h.entry(&token, "popular", json!({})).await;
    let uri = format!("/api/entries/{id}/");

    let (_, first) = h.call(Method::GET, &uri, None, None).await;
    assert_eq!(first["data"]["view_count"], 1);
    let (_, second) = h.call(Method::GET, &uri, None, None).await;
    assert_eq!(second["data"]["view_count"], 2);

    let like_uri = format!("{uri}like/");
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let (h, token, like_uri) = (h.clone(), token.clone(), like_uri.clone());
        tasks.push(tokio::spawn(async move {
            h.call(Method::POST, &like_uri, Some(&token), None).await.0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.expect("like task"), StatusCode::OK);
    }
    let (_, body) = h.call(Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["like_count"], 4);
    assert_eq!(body["data"]["view_count"], 3);
}

#[tokio::test]
async fn unpublished_entries_are_not_found() {
    let Some(h) = harness().await else { return };
    let token = h.register("drafter").await;
    let id = h.entry(&token, "draft", json!({ "is_published": false })).await;
    let uri = format!("/api/entries/{id}/");

    for (method, uri) in [
        (Method::GET, uri.clone()),
        (Method::POST, format!("{uri}like/")),
        (Method::GET, format!("{uri}history/")),
        (Method::DELETE, uri.clone()),
    ] {
        let (status, body) = h.call(method.clone(), &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"]["code"], "not_found");
    }
    let (status, _) = h.call(Method::PATCH, &uri, Some(&token), Some(json!({ "content": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = h
        .call(Method::GET, &format!("/api/entries/?search={}", h.name("draft")), None, None)
        .await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn favorites_are_unique_and_private() {
    let Some(h) = harness().await else { return };
    let owner = h.register("fan").await;
    let other = h.register("stranger").await;
    let entry = h.entry(&owner, "beloved", json!({})).await;

    let (status, _) = h
        .call(Method::POST, "/api/favorites/", Some(&owner), Some(json!({ "entry": entry })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = h
        .call(Method::POST, "/api/favorites/", Some(&owner), Some(json!({ "entry": entry })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"][NON_FIELD_ERRORS][0], ALREADY_FAVORITED);

    let check = format!("/api/favorites/check/?entry_id={entry}");
    let (_, body) = h.call(Method::GET, &check, Some(&owner), None).await;
    assert_eq!(body["data"]["is_favorited"], true);
    let (_, body) = h.call(Method::GET, &check, Some(&other), None).await;
    assert_eq!(body["data"]["is_favorited"], false);

    let (_, body) = h.call(Method::GET, "/api/favorites/", Some(&owner), None).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["entry"]["id"], entry);
    let favorite = body["data"][0]["id"].as_i64().expect("favorite id");

    let uri = format!("/api/favorites/{favorite}/");
    let (status, _) = h.call(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = h.call(Method::GET, &check, Some(&owner), None).await;
    assert_eq!(body["data"]["is_favorited"], false);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_entries() {
    let Some(h) = harness().await else { return };
    let token = h.register("curator").await;
    let category = h.category(&token, "doomed").await;
    let entry = h.entry(&token, "survivor", json!({ "category": category })).await;

    let (status, _) = h
        .call(Method::DELETE, &format!("/api/categories/{category}/"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = h.call(Method::GET, &format!("/api/entries/{entry}/"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["category"].is_null());
}

#[tokio::test]
async fn deleting_an_entry_removes_dependents_and_files() {
    let Some(h) = harness().await else { return };
    let token = h.register("uploader").await;
    let entry = h.entry(&token, "illustrated", json!({})).await;
    let uri = format!("/api/entries/{entry}/");

    let boundary = "baike-test-boundary";
    let form = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nfront\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"a.png\"\r\n\
         Content-Type: image/png\r\n\r\n\u{89}PNG\r\n--{b}--\r\n",
        b = boundary
    );
    let req = Request::builder()
        .method(Method::POST)
        .uri(format!("{uri}images/"))
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(form))
        .unwrap();
    let (status, body) = h.send(req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["caption"], "front");
    let url = body["data"]["image"].as_str().expect("image url").to_string();
    assert!(url.starts_with("/media/encyclopedia/images/"));
    assert_eq!(files_in(&h.image_dir()).len(), 1);

    let served = h.send(Request::builder().uri(&url).body(Body::empty()).unwrap()).await;
    assert_eq!(served.0, StatusCode::OK);

    h.call(Method::PATCH, &uri, Some(&token), Some(json!({ "content": "v2" }))).await;
    h.call(Method::POST, "/api/favorites/", Some(&token), Some(json!({ "entry": entry })))
        .await;

    let (status, _) = h.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(files_in(&h.image_dir()).is_empty());

    let pool = &h.state.pool;
    for table in ["entry_images", "entry_history", "favorites"] {
        let left: i64 = sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{table}" WHERE "entry_id" = $1"#))
            .bind(entry)
            .fetch_one(pool)
            .await
            .expect("count");
        assert_eq!(left, 0, "{table}");
    }
    let (status, _) = h.call(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let _ = std::fs::remove_dir_all(&h.state.settings.media_root);
}

#[tokio::test]
async fn statistics_aggregate_the_callers_entries() {
    let Some(h) = harness().await else { return };
    let token = h.register("statistician").await;

    let (status, body) = h.call(Method::GET, "/api/encyclopedia/statistics/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["overall_stats"]["total_entries"], 0);
    assert_eq!(stats["monthly_stats"].as_array().map(Vec::len), Some(0));
    assert_eq!(stats["category_stats"][0]["name"], FALLBACK_CATEGORIES[0].0);

    let category = h.category(&token, "counted").await;
    let shown = h.entry(&token, "stat shown", json!({ "category": category })).await;
    h.entry(&token, "stat hidden", json!({ "category": category, "is_published": false }))
        .await;
    for _ in 0..3 {
        h.call(Method::GET, &format!("/api/entries/{shown}/"), None, None).await;
    }
    h.call(Method::POST, &format!("/api/entries/{shown}/like/"), Some(&token), None)
        .await;
    // someone else's entries never count
    let other = h.register("bystander").await;
    h.entry(&other, "not mine", json!({ "category": category })).await;

    let (_, body) = h.call(Method::GET, "/api/encyclopedia/statistics/", Some(&token), None).await;
    let stats = &body["data"];
    assert_eq!(stats["overall_stats"]["total_entries"], 2);
    assert_eq!(stats["overall_stats"]["total_views"], 3);
    assert_eq!(stats["overall_stats"]["total_likes"], 1);
    assert_eq!(stats["overall_stats"]["avg_views_per_entry"], 1);
    assert_eq!(
        stats["category_stats"],
        json!([{ "name": h.name("counted"), "value": 2 }])
    );
    let months = stats["monthly_stats"].as_array().expect("monthly");
    assert_eq!(months.len(), 1);
    assert_eq!(months[0]["词条数"], 2);
    assert_eq!(months[0]["浏览量"], 3);
    assert_eq!(months[0]["date"].as_str().map(str::len), Some(7));
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let Some(h) = harness().await else { return };
    let token = h.register("searcher").await;
    let marker = format!("pct{}", h.suffix);
    h.entry(&token, &format!("{marker} 100% done"), json!({})).await;
    h.entry(&token, &format!("{marker} 100x done"), json!({})).await;

    let (status, body) = h
        .call(Method::GET, &format!("/api/search/?q={marker}%20100%25"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"]["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["title"].as_str().unwrap().contains("100%"));

    let (_, body) = h
        .call(Method::GET, &format!("/api/search/?q={marker}%20100_"), None, None)
        .await;
    assert_eq!(body["data"]["entries"].as_array().map(Vec::len), Some(0));

    let (_, body) = h
        .call(Method::GET, &format!("/api/entries/?search={marker}%20100%25"), None, None)
        .await;
    assert_eq!(body["meta"]["total"], 1);
}

#[tokio::test]
async fn check_auth_returns_profile_and_logout_revokes_the_token() {
    let Some(h) = harness().await else { return };
    let token = h.register("leaver").await;

    let (status, body) = h.call(Method::GET, "/api/auth/check-auth/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_authenticated"], true);
    let user = &body["data"]["user"];
    assert_eq!(user["username"], h.name("leaver"));
    assert_eq!(user["bio"], "");
    assert_eq!(user["entry_count"], 0);
    assert_eq!(user["favorite_count"], 0);
    assert!(user["updated_at"].is_string());

    let (status, _) = h.call(Method::POST, "/api/auth/logout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(Method::GET, "/api/auth/profile/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = h.call(Method::GET, "/api/auth/check-auth/", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = h
        .call(
            Method::POST,
            "/api/auth/login/",
            None,
            Some(json!({ "username": h.name("leaver"), "password": "correct-horse-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["data"]["token"].as_str().expect("token");
    assert_ne!(fresh, token);
    let (status, _) = h.call(Method::GET, "/api/auth/profile/", Some(fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}
