use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use warp::http::StatusCode;

use workshop_backend::db::mock::MockDb;
use workshop_backend::environment::{Config, Environment};
use workshop_backend::routes;
use workshop_backend::urls::Urls;

const WORKSHOPS_PATH: &str = "workshops";
const AUTH_PATH: &str = "auth";
const BOUNDARY: &str = "thisisaboundary1234";

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct-horse-battery-staple";

#[derive(Debug, Deserialize)]
struct ErrorReply {
    message: String,
}

#[tokio::test]
async fn signing_up_and_logging_in_works() {
    let environment = make_environment();

    let response = signup(&environment, "Alice", "alice@example.com", "s3cret!").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = parse_body(response.body());
    assert_eq!(body["student"]["email"], "alice@example.com");
    assert_eq!(body["student"]["name"], "Alice");
    assert!(
        body["student"].get("password").is_none() && body["student"].get("passwordHash").is_none(),
        "signup response must not leak credentials"
    );

    // the same email cannot sign up twice, even with different casing
    let response = signup(&environment, "Alice Again", " ALICE@example.com ", "other").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let filter = routes::make_login_route(environment.clone());

    let response = warp::test::request()
        .path("/auth/login")
        .method("POST")
        .json(&json!({"email": "alice@example.com", "password": "s3cret!", "role": "student"}))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["message"], "Login successful");

    // a wrong password and an unknown email must be indistinguishable
    let wrong_password = warp::test::request()
        .path("/auth/login")
        .method("POST")
        .json(&json!({"email": "alice@example.com", "password": "wrong", "role": "student"}))
        .reply(&filter)
        .await;
    let unknown_email = warp::test::request()
        .path("/auth/login")
        .method("POST")
        .json(&json!({"email": "nobody@example.com", "password": "s3cret!", "role": "student"}))
        .reply(&filter)
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    let first: ErrorReply = parse_body(wrong_password.body());
    let second: ErrorReply = parse_body(unknown_email.body());
    assert_eq!(
        first.message, second.message,
        "login failures must not reveal whether the email exists"
    );
}

#[tokio::test]
async fn admin_login_uses_the_configured_pair() {
    let environment = make_environment();
    let filter = routes::make_login_route(environment.clone());

    let response = warp::test::request()
        .path("/auth/login")
        .method("POST")
        .json(&json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "role": "admin"}))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);

    let response = warp::test::request()
        .path("/auth/login")
        .method("POST")
        .json(&json!({"email": ADMIN_EMAIL, "password": "wrong", "role": "admin"}))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn workshop_crud_works() {
    let environment = make_environment();

    {
        let retrieve_filter = routes::make_workshop_retrieve_route(environment.clone());
        let response = warp::test::request()
            .path(&format!("/workshops/{}", uuid::Uuid::new_v4()))
            .method("GET")
            .reply(&retrieve_filter)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // a malformed ID cannot name a workshop either
        let response = warp::test::request()
            .path("/workshops/not-a-uuid")
            .method("GET")
            .reply(&retrieve_filter)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let id = create_workshop(&environment, "Intro to AI").await;

    {
        let retrieve_filter = routes::make_workshop_retrieve_route(environment.clone());
        let response = warp::test::request()
            .path(&format!("/workshops/{}", id))
            .method("GET")
            .reply(&retrieve_filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = parse_body(response.body());
        assert_eq!(body["title"], "Intro to AI");
        assert_eq!(body["description"], "An introduction");
        assert_eq!(body["image"], "http://x/img.png");
        assert_eq!(body["date"], "2025-01-10");
        assert_eq!(body["registrations"], json!([]));
        assert_eq!(body["hasVideo"], false);
    }

    {
        let list_filter = routes::make_workshops_list_route(environment.clone());
        let response = warp::test::request()
            .path("/workshops")
            .method("GET")
            .reply(&list_filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = parse_body(response.body());
        assert_eq!(body.as_array().expect("list must be an array").len(), 1);
    }

    {
        // merge a metadata-only update
        let update_filter = routes::make_workshop_update_route(environment.clone());
        let body = make_multipart_body(BOUNDARY, &[("title", "Intro to ML")], None);

        let response = warp::test::request()
            .path(&format!("/workshops/{}", id))
            .method("PUT")
            .header("content-type", multipart_content_type(BOUNDARY))
            .header("content-length", body.len())
            .body(body)
            .reply(&update_filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = parse_body(response.body());
        assert_eq!(body["workshop"]["title"], "Intro to ML");
        assert_eq!(
            body["workshop"]["description"], "An introduction",
            "unsupplied fields must be left alone"
        );
    }

    {
        let delete_filter = routes::make_workshop_delete_route(environment.clone());
        let response = warp::test::request()
            .path(&format!("/workshops/{}", id))
            .method("DELETE")
            .reply(&delete_filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = warp::test::request()
            .path(&format!("/workshops/{}", id))
            .method("DELETE")
            .reply(&delete_filter)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let retrieve_filter = routes::make_workshop_retrieve_route(environment.clone());
        let response = warp::test::request()
            .path(&format!("/workshops/{}", id))
            .method("GET")
            .reply(&retrieve_filter)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn workshop_creation_validates_fields() {
    let environment = make_environment();
    let filter = routes::make_workshop_create_route(environment.clone());

    let response = warp::test::request()
        .path("/workshops")
        .method("POST")
        .json(&json!({
            "title": " ",
            "description": "An introduction",
            "image": "http://x/img.png",
            "date": "2025-01-10"
        }))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let reply: ErrorReply = parse_body(response.body());
    assert_eq!(reply.message, "title is required");

    // a missing date never reaches the handler
    let response = warp::test::request()
        .path("/workshops")
        .method("POST")
        .json(&json!({
            "title": "Intro to AI",
            "description": "An introduction",
            "image": "http://x/img.png"
        }))
        .reply(&filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registering_for_a_workshop_works_once() {
    let environment = make_environment();

    signup(&environment, "Alice", "alice@example.com", "s3cret!").await;
    let id = create_workshop(&environment, "Intro to AI").await;

    let register_filter = routes::make_workshop_register_route(environment.clone());

    let response = warp::test::request()
        .path(&format!("/workshops/{}/register", id))
        .method("POST")
        .json(&json!({"studentEmail": "alice@example.com", "phoneNumber": "555-0100"}))
        .reply(&register_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let reply: ErrorReply = parse_body(response.body());
    assert_eq!(reply.message, "Successfully registered!");

    // registering the same pair twice must conflict
    let response = warp::test::request()
        .path(&format!("/workshops/{}/register", id))
        .method("POST")
        .json(&json!({"studentEmail": "alice@example.com", "phoneNumber": "555-0199"}))
        .reply(&register_filter)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // an unknown student and an unknown workshop both come back as 404
    let response = warp::test::request()
        .path(&format!("/workshops/{}/register", id))
        .method("POST")
        .json(&json!({"studentEmail": "nobody@example.com", "phoneNumber": "555-0100"}))
        .reply(&register_filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = warp::test::request()
        .path(&format!("/workshops/{}/register", uuid::Uuid::new_v4()))
        .method("POST")
        .json(&json!({"studentEmail": "alice@example.com", "phoneNumber": "555-0100"}))
        .reply(&register_filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // a blank phone number is rejected
    let response = warp::test::request()
        .path(&format!("/workshops/{}/register", id))
        .method("POST")
        .json(&json!({"studentEmail": "alice@example.com", "phoneNumber": "  "}))
        .reply(&register_filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // the roster shows the registration exactly once
    let roster_filter = routes::make_workshop_registrations_route(environment.clone());
    let response = warp::test::request()
        .path(&format!("/workshops/{}/registrations", id))
        .method("GET")
        .reply(&roster_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    let registrations = body["registrations"]
        .as_array()
        .expect("registrations must be an array");
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0]["studentEmail"], "alice@example.com");
    assert_eq!(registrations[0]["studentName"], "Alice");
    assert_eq!(registrations[0]["phoneNumber"], "555-0100");
    assert_eq!(registrations[0]["workshopTitle"], "Intro to AI");

    // the workshop record reflects the true registration count
    let retrieve_filter = routes::make_workshop_retrieve_route(environment.clone());
    let response = warp::test::request()
        .path(&format!("/workshops/{}", id))
        .method("GET")
        .reply(&retrieve_filter)
        .await;
    let body: Value = parse_body(response.body());
    assert_eq!(body["registrations"], json!(["alice@example.com"]));

    // and the student sees the workshop in their list
    let registered_filter = routes::make_registered_workshops_route(environment.clone());
    let response = warp::test::request()
        .path("/workshops/registered-workshops/alice@example.com")
        .method("GET")
        .reply(&registered_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    let workshops = body.as_array().expect("registered workshops must be an array");
    assert_eq!(workshops.len(), 1);
    assert_eq!(workshops[0]["title"], "Intro to AI");
}

#[tokio::test]
async fn deleting_a_workshop_cascades_to_registrations() {
    let environment = make_environment();

    signup(&environment, "Alice", "alice@example.com", "s3cret!").await;
    let id = create_workshop(&environment, "Intro to AI").await;

    let register_filter = routes::make_workshop_register_route(environment.clone());
    let response = warp::test::request()
        .path(&format!("/workshops/{}/register", id))
        .method("POST")
        .json(&json!({"studentEmail": "alice@example.com", "phoneNumber": "555-0100"}))
        .reply(&register_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let delete_filter = routes::make_workshop_delete_route(environment.clone());
    let response = warp::test::request()
        .path(&format!("/workshops/{}", id))
        .method("DELETE")
        .reply(&delete_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // the roster no longer surfaces the workshop's registrations
    let roster_filter = routes::make_workshop_registrations_route(environment.clone());
    let response = warp::test::request()
        .path(&format!("/workshops/{}/registrations", id))
        .method("GET")
        .reply(&roster_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(body["registrations"], json!([]));

    // and neither does the student's own list
    let registered_filter = routes::make_registered_workshops_route(environment.clone());
    let response = warp::test::request()
        .path("/workshops/registered-workshops/alice@example.com")
        .method("GET")
        .reply(&registered_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn video_delivery_honors_byte_ranges() {
    let environment = make_environment();
    let id = create_workshop(&environment, "Intro to AI").await;

    let video_filter = routes::make_workshop_video_route(environment.clone());

    // nothing stored yet
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // upload a 300-byte payload
    let payload: Vec<u8> = (0..300u16).map(|b| (b % 256) as u8).collect();

    {
        let update_filter = routes::make_workshop_update_route(environment.clone());
        let body = make_multipart_body(BOUNDARY, &[], Some(("video/mp4", &payload)));

        let response = warp::test::request()
            .path(&format!("/workshops/{}", id))
            .method("PUT")
            .header("content-type", multipart_content_type(BOUNDARY))
            .header("content-length", body.len())
            .body(body)
            .reply(&update_filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = parse_body(response.body());
        assert_eq!(body["workshop"]["hasVideo"], true);
    }

    // no Range header: the full payload
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), payload.as_slice());
    assert_eq!(header(&response, "content-type"), "video/mp4");
    assert_eq!(header(&response, "accept-ranges"), "bytes");
    assert_eq!(header(&response, "content-length"), "300");

    // a bounded range: exactly the requested slice
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .header("range", "bytes=0-99")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.body().as_ref(), &payload[0..100]);
    assert_eq!(header(&response, "content-range"), "bytes 0-99/300");
    assert_eq!(header(&response, "content-length"), "100");

    // an open-ended range runs to the final byte
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .header("range", "bytes=250-")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.body().as_ref(), &payload[250..300]);
    assert_eq!(header(&response, "content-range"), "bytes 250-299/300");

    // malformed syntax is rejected outright
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .header("range", "bytes=abc")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // a range past the payload is unsatisfiable
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .header("range", "bytes=300-")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn uploading_a_video_clears_the_external_url() {
    let environment = make_environment();
    let id = create_workshop(&environment, "Intro to AI").await;

    let update_filter = routes::make_workshop_update_route(environment.clone());

    // point the workshop at an external video first
    let body = make_multipart_body(
        BOUNDARY,
        &[("videoUrl", "https://videos.example.com/intro.mp4")],
        None,
    );
    let response = warp::test::request()
        .path(&format!("/workshops/{}", id))
        .method("PUT")
        .header("content-type", multipart_content_type(BOUNDARY))
        .header("content-length", body.len())
        .body(body)
        .reply(&update_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(
        body["workshop"]["videoUrl"],
        "https://videos.example.com/intro.mp4"
    );
    assert_eq!(body["workshop"]["hasVideo"], false);

    // an uploaded payload replaces the external URL
    let payload = b"not really a video".to_vec();
    let body = make_multipart_body(BOUNDARY, &[], Some(("video/mp4", &payload)));
    let response = warp::test::request()
        .path(&format!("/workshops/{}", id))
        .method("PUT")
        .header("content-type", multipart_content_type(BOUNDARY))
        .header("content-length", body.len())
        .body(body)
        .reply(&update_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(body["workshop"]["hasVideo"], true);
    assert_eq!(body["workshop"]["videoUrl"], Value::Null);

    // and setting an external URL again clears the stored payload
    let body = make_multipart_body(
        BOUNDARY,
        &[("videoUrl", "https://videos.example.com/redux.mp4")],
        None,
    );
    let response = warp::test::request()
        .path(&format!("/workshops/{}", id))
        .method("PUT")
        .header("content-type", multipart_content_type(BOUNDARY))
        .header("content-length", body.len())
        .body(body)
        .reply(&update_filter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = parse_body(response.body());
    assert_eq!(body["workshop"]["hasVideo"], false);

    let video_filter = routes::make_workshop_video_route(environment.clone());
    let response = warp::test::request()
        .path(&format!("/workshops/{}/video", id))
        .method("GET")
        .reply(&video_filter)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn make_environment() -> Environment {
    Environment::new(
        Arc::new(log::Logger::root(log::Discard, log::o!())),
        Arc::new(MockDb::default()),
        Arc::new(Urls::new(
            "https://www.example.com/",
            WORKSHOPS_PATH,
            AUTH_PATH,
        )),
        Config::new(ADMIN_EMAIL.to_owned(), ADMIN_PASSWORD.to_owned()),
    )
}

async fn signup(
    environment: &Environment,
    name: &str,
    email: &str,
    password: &str,
) -> warp::http::Response<bytes::Bytes> {
    let filter = routes::make_signup_route(environment.clone());

    warp::test::request()
        .path("/auth/register")
        .method("POST")
        .json(&json!({"name": name, "email": email, "password": password}))
        .reply(&filter)
        .await
}

async fn create_workshop(environment: &Environment, title: &str) -> String {
    let filter = routes::make_workshop_create_route(environment.clone());

    let response = warp::test::request()
        .path("/workshops")
        .method("POST")
        .json(&json!({
            "title": title,
            "description": "An introduction",
            "image": "http://x/img.png",
            "date": "2025-01-10"
        }))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let location = header(&response, "location");
    assert!(
        location.starts_with("https://www.example.com/workshops/"),
        "location header must point at the new workshop: {}",
        location
    );

    let body: Value = parse_body(response.body());

    body["workshop"]["id"]
        .as_str()
        .expect("get workshop ID from response")
        .to_owned()
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).expect("parse response body as JSON")
}

fn header(response: &warp::http::Response<bytes::Bytes>, name: &str) -> String {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("get {} header", name))
        .to_str()
        .expect("convert header to string")
        .to_owned()
}

fn make_multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    video: Option<(&str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }

    if let Some((content_type, data)) = video {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"upload.mp4\"\r\nContent-Type: {}\r\n\r\n",
                boundary, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    body
}

fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={}", boundary)
}
