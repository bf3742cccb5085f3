//! End-to-end router tests over the seeded demo dataset.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Action, Error};
use server::{Authorizer, JsonApiRouter, ServerConfig, demo};

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        base_url: "http://api.test".to_owned(),
        max_page_size: 100,
    }
}

fn app() -> Router {
    demo::router(demo::build_state(test_config()).expect("demo state"))
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/vnd.api+json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    };
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).expect("json body"))
    };
    (status, value)
}

async fn get(uri: &str) -> (StatusCode, Option<Value>) {
    send(app(), Method::GET, uri, None).await
}

fn pointer<'a>(doc: &'a Value, index: usize) -> &'a str {
    doc["errors"][index]["source"]["pointer"]
        .as_str()
        .expect("error pointer")
}

#[tokio::test]
async fn lists_users() {
    let (status, body) = get("/users").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["links"]["self"], "http://api.test/users");
    assert_eq!(body["data"][0]["type"], "users");
    assert_eq!(body["data"][0]["attributes"]["username"], "alice");
}

#[tokio::test]
async fn paginates_with_meta_and_links() {
    let (status, body) = get("/users?page[number]=1&page[size]=1").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    let pagination = &body["meta"]["pagination"];
    assert_eq!(pagination["total"], 2);
    assert_eq!(pagination["count"], 1);
    assert_eq!(pagination["per_page"], 1);
    assert_eq!(pagination["current_page"], 1);
    assert_eq!(pagination["total_pages"], 2);
    assert_eq!(
        body["links"]["next"],
        "http://api.test/users?page[number]=2&page[size]=1"
    );
}

#[tokio::test]
async fn filters_and_sorts() {
    let (_, body) = get("/users?filter[username]=bob").await;
    let data = body.unwrap()["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["id"], "u2");

    let (_, body) = get("/users?sort=-username").await;
    let data = body.unwrap()["data"].clone();
    assert_eq!(data[0]["attributes"]["username"], "bob");
}

#[tokio::test]
async fn shows_a_user_with_relationship_linkage() {
    let (status, body) = get("/users/u1").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    let data = &body["data"];
    assert_eq!(data["id"], "u1");
    assert_eq!(data["links"]["self"], "http://api.test/users/u1");

    let roles = &data["relationships"]["roles"];
    assert_eq!(roles["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        roles["links"]["self"],
        "http://api.test/users/u1/relationships/roles"
    );
    assert_eq!(roles["links"]["related"], "http://api.test/users/u1/roles");

    // Inverse relationship linkage is computed from the target side.
    let pages = &data["relationships"]["pages"];
    assert_eq!(pages["data"][0]["id"], "p1");
}

#[tokio::test]
async fn missing_resource_is_a_structured_404() {
    let (status, body) = get("/users/u999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = body.unwrap();
    assert_eq!(body["errors"][0]["code"], "404");
}

#[tokio::test]
async fn creates_a_page_with_location_header() {
    let app = app();
    let body = json!({
        "data": {
            "type": "pages",
            "id": "p9",
            "attributes": {"title": "New", "body": "text", "published": false},
            "relationships": {"author": {"data": {"type": "users", "id": "u2"}}}
        }
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/pages")
        .header(header::CONTENT_TYPE, "application/vnd.api+json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://api.test/pages/p9"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(doc["data"]["id"], "p9");
    assert_eq!(doc["data"]["relationships"]["author"]["data"]["id"], "u2");

    let (status, shown) = send(app, Method::GET, "/pages/p9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown.unwrap()["data"]["attributes"]["title"], "New");
}

#[tokio::test]
async fn create_generates_an_id_when_none_is_supplied() {
    let (status, body) = send(
        app(),
        Method::POST,
        "/roles",
        Some(json!({"data": {"type": "roles", "attributes": {"name": "ops"}}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!body.unwrap()["data"]["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_attribute_is_a_400_with_pointer() {
    let (status, body) = send(
        app(),
        Method::PATCH,
        "/users/u1",
        Some(json!({"data": {"attributes": {"unknownField": "x"}}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert_eq!(pointer(&body, 0), "/data/attributes/unknownField");
}

#[tokio::test]
async fn readonly_attribute_is_a_400_naming_the_capability() {
    let (status, body) = send(
        app(),
        Method::PATCH,
        "/users/u1",
        Some(json!({"data": {"attributes": {"created_at": "2020-01-01T00:00:00Z"}}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body.unwrap()["errors"][0]["detail"]
        .as_str()
        .unwrap()
        .to_owned();
    assert!(detail.contains("set_created_at"), "detail: {detail}");
}

#[tokio::test]
async fn body_without_data_is_a_422() {
    let (status, body) = send(app(), Method::PATCH, "/users/u1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(pointer(&body.unwrap(), 0), "/data");
}

#[tokio::test]
async fn updates_attributes() {
    let app = app();
    let (status, body) = send(
        app.clone(),
        Method::PATCH,
        "/users/u1",
        Some(json!({"data": {"type": "users", "attributes": {"username": "alicia"}}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"]["attributes"]["username"], "alicia");

    let (_, shown) = send(app, Method::GET, "/users/u1", None).await;
    assert_eq!(shown.unwrap()["data"]["attributes"]["username"], "alicia");
}

#[tokio::test]
async fn update_with_dangling_identifier_is_a_404() {
    let (status, _) = send(
        app(),
        Method::PATCH,
        "/users/u1",
        Some(json!({"data": {"relationships": {"roles": {"data": [
            {"type": "roles", "id": "999"}
        ]}}}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deletes_a_role() {
    let app = app();
    let (status, body) = send(app.clone(), Method::DELETE, "/roles/r3", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());

    let (status, _) = send(app, Method::GET, "/roles/r3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shows_related_collections_and_resources() {
    let (status, body) = get("/users/u1/roles").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["type"], "roles");

    let (status, body) = get("/pages/p1/author").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["data"]["type"], "users");
    assert_eq!(body["data"]["id"], "u1");

    // Inverse related collection, filtered through the back-reference.
    let (status, body) = get("/users/u1/pages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"][0]["id"], "p1");
}

#[tokio::test]
async fn relationship_endpoints_serve_bare_identifiers() {
    let (status, body) = get("/users/u1/relationships/roles").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    let first = &body["data"][0];
    assert_eq!(first["type"], "roles");
    assert_eq!(first["id"], "r1");
    assert!(first.get("attributes").is_none());
    assert_eq!(
        body["links"]["related"],
        "http://api.test/users/u1/roles"
    );
}

#[tokio::test]
async fn replaces_and_clears_a_to_one_relationship() {
    let app = app();
    let (status, body) = send(
        app.clone(),
        Method::PATCH,
        "/pages/p1/relationships/author",
        Some(json!({"data": {"type": "users", "id": "u2"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"]["id"], "u2");

    let (status, body) = send(
        app,
        Method::PATCH,
        "/pages/p1/relationships/author",
        Some(json!({"data": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"], Value::Null);
}

#[tokio::test]
async fn adds_and_removes_to_many_members() {
    let app = app();
    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/users/u1/relationships/roles",
        Some(json!({"data": [{"type": "roles", "id": "r3"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["data"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        app.clone(),
        Method::DELETE,
        "/users/u1/relationships/roles",
        Some(json!({"data": [{"type": "roles", "id": "r1"}, {"type": "roles", "id": "r3"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());

    let (_, body) = send(app, Method::GET, "/users/u1/relationships/roles", None).await;
    let data = body.unwrap()["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["id"], "r2");
}

#[tokio::test]
async fn replaces_a_to_many_collection() {
    let app = app();
    let (status, _) = send(
        app.clone(),
        Method::PATCH,
        "/users/u1/relationships/roles",
        Some(json!({"data": [{"type": "roles", "id": "r2"}, {"type": "roles", "id": "r3"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(app, Method::GET, "/users/u1/relationships/roles", None).await;
    let ids: Vec<String> = body.unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(ids, vec!["r2", "r3"]);
}

#[tokio::test]
async fn type_mismatch_in_relationship_payload_is_a_400() {
    let (status, body) = send(
        app(),
        Method::POST,
        "/users/u1/relationships/roles",
        Some(json!({"data": [{"type": "pages", "id": "p1"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(pointer(&body.unwrap(), 0), "/data/0");
}

#[tokio::test]
async fn includes_and_sparse_fieldsets() {
    let (status, body) = get("/users/u1?include=roles&fields[roles]=name").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    let included = body["included"].as_array().unwrap();
    assert_eq!(included.len(), 2);
    assert!(included[0]["attributes"].get("name").is_some());

    let (_, body) = get("/users/u1?fields[users]=username").await;
    let attributes = &body.unwrap()["data"]["attributes"];
    assert!(attributes.get("username").is_some());
    assert!(attributes.get("email").is_none());
}

#[tokio::test]
async fn undeclared_include_path_is_a_422() {
    let (status, body) = get("/users/u1?include=friends").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = body.unwrap();
    assert_eq!(
        body["errors"][0]["source"]["parameter"],
        "include"
    );
}

#[tokio::test]
async fn explicit_routes_win_over_generated_ones() {
    let state = demo::build_state(test_config()).unwrap();
    let router = JsonApiRouter::new()
        .route(
            Method::GET,
            "/users",
            axum::routing::get(|| async { "custom" }),
        )
        .build(state);

    let response = router
        .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"custom");
}

struct ReadOnly;

impl Authorizer for ReadOnly {
    fn authorize(&self, action: Action, resource_type: &str, _: Option<&str>) -> Result<(), Error> {
        match action {
            Action::List | Action::Show => Ok(()),
            _ => Err(Error::Forbidden(format!(
                "`{resource_type}` is read-only"
            ))),
        }
    }
}

#[tokio::test]
async fn denied_actions_map_to_403_documents() {
    let state = demo::build_state(test_config())
        .unwrap()
        .with_authorizer(Arc::new(ReadOnly));
    let router = demo::router(state);

    let (status, body) = send(router.clone(), Method::DELETE, "/users/u1", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body.unwrap()["errors"][0]["code"], "403");

    let (status, _) = send(router, Method::GET, "/users/u1", None).await;
    assert_eq!(status, StatusCode::OK);
}
