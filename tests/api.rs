use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use crema::application::api_keys::ApiKeyService;
use crema::application::fixtures;
use crema::application::products::{ListingSettings, ProductService};
use crema::application::repos::{ApiKeysRepo, CreateApiKeyParams, RepoError};
use crema::application::version::AcceptHeaderVersionResolver;
use crema::cache::ListingCache;
use crema::domain::api_keys::ApiKeyRecord;
use crema::domain::version::ApiVersion;
use crema::infra::http::{ApiState, build_router};
use crema::infra::memory::InMemoryRepositories;

const V2_ACCEPT: &str = "application/json; version=2.0";

struct TestApp {
    router: Router,
    cache: Arc<ListingCache>,
    user_token: String,
    admin_token: String,
}

async fn test_app() -> TestApp {
    let repos = Arc::new(InMemoryRepositories::new());
    let api_keys = Arc::new(ApiKeyService::new(repos.clone()));

    let report = fixtures::seed(repos.clone(), repos.clone(), &api_keys)
        .await
        .expect("fixtures should load into an empty store");
    let token_for = |name: &str| {
        report
            .keys
            .iter()
            .find(|issued| issued.record.name == name)
            .map(|issued| issued.token.clone())
            .expect("fixture key should be issued")
    };
    let user_token = token_for("user@starbucks.com");
    let admin_token = token_for("admin@starbucks.com");

    let cache = Arc::new(ListingCache::new(
        "listing",
        std::num::NonZeroUsize::new(64).expect("non-zero capacity"),
    ));
    let products = ProductService::new(repos.clone(), repos.clone(), ListingSettings::default())
        .with_listing_cache(cache.clone());

    let state = ApiState {
        products: Arc::new(products),
        api_keys,
        versions: Arc::new(AcceptHeaderVersionResolver::new(ApiVersion::V1_0)),
        health: repos,
        public_url: Url::parse("http://catalog.test/").expect("valid url"),
    };

    TestApp {
        router: build_router(state),
        cache,
        user_token,
        admin_token,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).expect("request"))
            .await
    }

    async fn write(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    async fn delete(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::delete(uri)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be json")
}

fn names(listing: &Value) -> Vec<&str> {
    listing
        .as_array()
        .expect("listing is an array")
        .iter()
        .map(|item| item["name"].as_str().expect("name is a string"))
        .collect()
}

#[tokio::test]
async fn listing_pages_through_catalog_in_id_order() {
    let app = test_app().await;

    let response = app.get("/api/products?page=1&limit=2").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = json_body(response).await;
    assert_eq!(names(&body), ["Café Latte 1", "Café Latte 2"]);
    assert_eq!(body[0], json!({ "id": 1, "name": "Café Latte 1", "price": 3.92 }));

    let body = json_body(app.get("/api/products?page=2&limit=2").await).await;
    assert_eq!(names(&body), ["Café Latte 3", "Café Latte 4"]);

    let body = json_body(app.get("/api/products?page=99&limit=2").await).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn listing_defaults_to_three_items() {
    let app = test_app().await;

    let body = json_body(app.get("/api/products").await).await;
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn listing_rejects_invalid_pagination() {
    let app = test_app().await;

    for uri in [
        "/api/products?page=0",
        "/api/products?limit=0",
        "/api/products?page=abc",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = json_body(response).await;
        assert_eq!(body["status"], 400, "{uri}");
    }
}

#[tokio::test]
async fn create_invalidates_cached_listings() {
    let app = test_app().await;

    let first = json_body(app.get("/api/products?page=6&limit=3").await).await;
    assert_eq!(names(&first), ["Café Latte 16"]);
    assert!(!app.cache.is_empty());

    let response = app
        .write(
            Method::POST,
            "/api/products",
            Some(&app.admin_token),
            json!({ "name": "Flat White", "price": 4.1 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://catalog.test/api/products/17"
    );
    let created = json_body(response).await;
    assert_eq!(created["id"], 17);
    assert_eq!(created["name"], "Flat White");

    let after = json_body(app.get("/api/products?page=6&limit=3").await).await;
    assert_eq!(names(&after), ["Café Latte 16", "Flat White"]);
}

#[tokio::test]
async fn update_and_delete_are_visible_in_listing() {
    let app = test_app().await;

    let before = json_body(app.get("/api/products?page=1&limit=2").await).await;
    assert_eq!(names(&before), ["Café Latte 1", "Café Latte 2"]);

    let response = app
        .write(
            Method::PUT,
            "/api/products/2",
            Some(&app.admin_token),
            json!({ "name": "Cortado" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let detail = json_body(app.get("/api/products/2").await).await;
    assert_eq!(detail["name"], "Cortado");
    assert_eq!(detail["price"], 4.02);

    let response = app.delete("/api/products/1", &app.admin_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let after = json_body(app.get("/api/products?page=1&limit=2").await).await;
    assert_eq!(names(&after), ["Cortado", "Café Latte 3"]);

    let response = app.get("/api/products/1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_product_returns_error_envelope_and_leaves_cache_alone() {
    let app = test_app().await;
    json_body(app.get("/api/products").await).await;
    let cached = app.cache.len();

    let response = app.get("/api/products/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 404, "message": "Resource not found" })
    );

    let response = app.get("/api/products/not-a-number").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.delete("/api/products/999", &app.admin_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(app.cache.len(), cached);
}

#[tokio::test]
async fn writes_require_admin_credentials() {
    let app = test_app().await;
    let payload = json!({ "name": "Mocha", "price": 4.5 });

    let response = app
        .write(Method::POST, "/api/products", None, payload.clone())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["status"], 401);

    let response = app
        .write(Method::POST, "/api/products", Some("ck_bogus_token"), payload.clone())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .write(
            Method::POST,
            "/api/products",
            Some(&app.user_token),
            payload.clone(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["status"], 403);

    let response = app.delete("/api/products/1", &app.user_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let listing = json_body(app.get("/api/products?page=6&limit=3").await).await;
    assert_eq!(names(&listing), ["Café Latte 16"]);
}

#[tokio::test]
async fn forbidden_is_reported_before_body_errors() {
    let app = test_app().await;

    let response = app
        .send(
            Request::post("/api/products")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", app.user_token))
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn api_key_header_is_accepted() {
    let app = test_app().await;

    let response = app
        .send(
            Request::post("/api/products")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-api-key", app.admin_token.as_str())
                .body(Body::from(json!({ "name": "Ristretto", "price": 2.5 }).to_string()))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn invalid_product_reports_every_violation() {
    let app = test_app().await;

    let response = app
        .write(
            Method::POST,
            "/api/products",
            Some(&app.admin_token),
            json!({ "name": "  ", "price": -1.0 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|violation| violation["field"].as_str())
        .collect();
    assert_eq!(fields, ["name", "price"]);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = test_app().await;

    let response = app
        .send(
            Request::post("/api/products")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
                .body(Body::from("{\"name\": "))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(
            Request::post("/api/products")
                .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
                .body(Body::from("{}"))
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn versioned_rendering_adds_links() {
    let app = test_app().await;

    let v1 = json_body(app.get("/api/products?limit=1").await).await;
    assert!(v1[0].get("_links").is_none());

    let response = app
        .send(
            Request::get("/api/products?limit=1")
                .header(header::ACCEPT, V2_ACCEPT)
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    let v2 = json_body(response).await;
    assert_eq!(v2[0]["_links"], json!({ "self": { "href": "/api/products/1" } }));

    let anonymous = json_body(
        app.send(
            Request::get("/api/products/1")
                .header(header::ACCEPT, V2_ACCEPT)
                .body(Body::empty())
                .expect("request"),
        )
        .await,
    )
    .await;
    assert!(anonymous["_links"].get("update").is_none());

    let admin = json_body(
        app.send(
            Request::get("/api/products/1")
                .header(header::ACCEPT, V2_ACCEPT)
                .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
                .body(Body::empty())
                .expect("request"),
        )
        .await,
    )
    .await;
    assert_eq!(admin["_links"]["update"]["href"], "/api/products/1");
    assert_eq!(admin["_links"]["delete"]["href"], "/api/products/1");
}

#[tokio::test]
async fn unsupported_version_is_rejected() {
    let app = test_app().await;

    let response = app
        .send(
            Request::get("/api/products")
                .header(header::ACCEPT, "application/json; version=banana")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Unsupported API version");
}

#[tokio::test]
async fn unknown_routes_and_methods_use_the_envelope() {
    let app = test_app().await;

    let response = app.get("/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["status"], 404);

    let response = app
        .send(
            Request::patch("/api/products")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["status"], 405);
}

#[tokio::test]
async fn health_probe_reports_no_content() {
    let app = test_app().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

/// Key store whose backing database is down.
struct UnreachableKeys;

#[async_trait]
impl ApiKeysRepo for UnreachableKeys {
    async fn create_key(&self, _: CreateApiKeyParams) -> Result<ApiKeyRecord, RepoError> {
        Err(RepoError::Timeout)
    }

    async fn find_by_prefix(&self, _: &str) -> Result<Option<ApiKeyRecord>, RepoError> {
        Err(RepoError::Persistence("connection refused".into()))
    }

    async fn update_last_used(&self, _: Uuid, _: OffsetDateTime) -> Result<(), RepoError> {
        Err(RepoError::Timeout)
    }

    async fn revoke_key(&self, _: Uuid, _: OffsetDateTime) -> Result<(), RepoError> {
        Err(RepoError::Timeout)
    }
}

#[tokio::test]
async fn key_store_outage_is_an_internal_error() {
    let repos = Arc::new(InMemoryRepositories::new());
    let products = ProductService::new(repos.clone(), repos.clone(), ListingSettings::default());
    let router = build_router(ApiState {
        products: Arc::new(products),
        api_keys: Arc::new(ApiKeyService::new(Arc::new(UnreachableKeys))),
        versions: Arc::new(AcceptHeaderVersionResolver::new(ApiVersion::V1_0)),
        health: repos,
        public_url: Url::parse("http://catalog.test/").expect("valid url"),
    });

    let token = format!("ck_abcdef_{}", "s".repeat(40));
    let response = router
        .clone()
        .oneshot(
            Request::get("/api/products")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "status": 500, "message": "An unexpected error occurred" })
    );

    let response = router
        .oneshot(Request::get("/api/products").body(Body::empty()).expect("request"))
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
}
