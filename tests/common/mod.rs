#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::{test, web};
use serde_json::json;
use studyai_server::{AppState, Settings};

pub const SESSION_COOKIE: &str = "studyai_session";

/// Fresh state on a private in-memory database.
pub async fn test_state(settings: Settings) -> web::Data<AppState> {
    let state = AppState::new(settings)
        .await
        .expect("Failed to build test state");
    web::Data::new(state)
}

pub async fn default_state() -> web::Data<AppState> {
    test_state(Settings::new_for_test().expect("Failed to load test config")).await
}

pub fn register_request(username: &str) -> test::TestRequest {
    test::TestRequest::post().uri("/api/register").set_json(json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "password123"
    }))
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .expect("response carries no session cookie")
        .into_owned()
}
