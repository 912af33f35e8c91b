mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use common::TestContext;
use studio_site_server::configure_api;

const PASSWORD: &str = "correct horse";

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data($ctx.state.clone())
                .service(web::scope("/api").configure(configure_api)),
        )
        .await
    };
}

fn context_with_operator() -> TestContext {
    TestContext::with_config(|config| {
        config.operator.password_hash = Some(bcrypt::hash(PASSWORD, 4).unwrap());
    })
}

#[actix_web::test]
async fn test_login_returns_tokens_that_open_protected_routes() {
    let ctx = context_with_operator();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "admin", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let tokens: Value = test::read_body_json(resp).await;
    assert_eq!(tokens["token_type"], "Bearer");
    let access = tokens["access_token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", format!("Bearer {}", access)))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["username"], "admin");

    let req = test::TestRequest::get()
        .uri("/api/gallery")
        .insert_header(("x-auth-token", access.to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_login_with_wrong_credentials_is_unauthenticated() {
    let ctx = context_with_operator();
    let app = init_app!(ctx);

    for (username, password) in [("admin", "wrong"), ("someone", PASSWORD)] {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "username": username, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let error: Value = test::read_body_json(resp).await;
        assert_eq!(error["error"], "Unauthenticated");
    }
}

#[actix_web::test]
async fn test_login_is_disabled_without_configured_password() {
    let ctx = TestContext::new();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "admin", "password": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_refresh_issues_new_access_token_only_for_refresh_tokens() {
    let ctx = context_with_operator();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "admin", "password": PASSWORD }))
        .to_request();
    let tokens: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refresh_token": tokens["refresh_token"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let refreshed: Value = test::read_body_json(resp).await;
    assert!(refreshed["access_token"].as_str().is_some());

    let req = test::TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refresh_token": tokens["access_token"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_refresh_token_is_not_accepted_by_guard() {
    let ctx = context_with_operator();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "admin", "password": PASSWORD }))
        .to_request();
    let tokens: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((
            "Authorization",
            format!("Bearer {}", tokens["refresh_token"].as_str().unwrap()),
        ))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_malformed_json_body_is_bad_request() {
    let ctx = context_with_operator();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "BadRequest");
}
