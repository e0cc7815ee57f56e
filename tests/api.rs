use std::future::IntoFuture;
use std::time::Duration;

use agora::api::{create_router, App};
use agora::auth::{Authenticator, TOKEN_HEADER};
use agora::database::{self, Database, Sql};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use futures::future::join_all;
use secrecy::SecretString;
use serde_json::{json, Value};

async fn server() -> TestServer {
    server_on(database::memory().await.unwrap())
}

fn server_on(database: Database) -> TestServer {
    let auth = Authenticator::new(SecretString::new("test secret".into()), Duration::from_secs(3600));
    let app = App::new(database, auth, Duration::from_secs(5));

    TestServer::new(create_router(app)).unwrap()
}

fn registration(email: &str, first_name: &str) -> Value {
    json!({
        "email": email,
        "firstName": first_name,
        "lastName": "Tester",
        "gender": "female",
        "birthDate": "1990-01-01",
        "contactNumber": "0123456789",
        "password": "secret password",
        "address": "1 Main Street",
        "state": "NY",
        "city": "Springfield",
        "zip": "123456",
    })
}

/// Registers a user and signs in, returning the user id and a token.
async fn sign_up(server: &TestServer, email: &str, first_name: &str) -> (String, String) {
    let user: Value = server
        .post("/api/users/register")
        .json(&registration(email, first_name))
        .await
        .json();

    let login: Value = server
        .post("/api/auth")
        .json(&json!({ "email": email, "password": "secret password" }))
        .await
        .json();

    (
        user["id"].as_str().unwrap().to_string(),
        login["token"].as_str().unwrap().to_string(),
    )
}

fn token(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(TOKEN_HEADER),
        HeaderValue::from_str(token).unwrap(),
    )
}

async fn create_post(server: &TestServer, auth: &str, text: &str) -> String {
    let (name, value) = token(auth);
    let post: Value = server
        .post("/api/posts")
        .add_header(name, value)
        .json(&json!({ "post": text }))
        .await
        .json();

    post["id"].as_str().unwrap().to_string()
}

async fn counts(server: &TestServer, auth: &str, post_id: &str) -> Value {
    let (name, value) = token(auth);
    server
        .get(&format!("/api/posts/{post_id}/counts"))
        .add_header(name, value)
        .await
        .json()
}

#[tokio::test]
async fn registration_and_login() {
    let server = server().await;

    let response = server
        .post("/api/users/register")
        .json(&registration("ada@example.com", "Ada"))
        .await;
    response.assert_status_ok();
    let user: Value = response.json();
    assert_eq!(user["fullName"], "Ada Tester");
    assert_eq!(user["status"], "active");
    assert!(user.get("password").is_none());

    let duplicate = server
        .post("/api/users/register")
        .json(&registration("ada@example.com", "Ada"))
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json::<Value>()["message"], "User already exists");

    let wrong = server
        .post("/api/auth")
        .json(&json!({ "email": "ada@example.com", "password": "not it" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::BAD_REQUEST);

    let login = server
        .post("/api/auth")
        .json(&json!({ "email": "ada@example.com", "password": "secret password" }))
        .await;
    login.assert_status_ok();
    let issued = login.json::<Value>()["token"].as_str().unwrap().to_string();
    assert_eq!(login.header(TOKEN_HEADER), issued.as_str());

    let me: Value = server
        .get("/api/users/me")
        .add_header(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {issued}")).unwrap(),
        )
        .await
        .json();
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["online"], true);
}

#[tokio::test]
async fn invalid_registration_is_rejected() {
    let server = server().await;
    let mut body = registration("ada@example.com", "Ada");
    body["zip"] = json!("123");

    let response = server.post("/api/users/register").json(&body).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["message"],
        "\"zip\" length must be at least 6 characters long"
    );
}

#[tokio::test]
async fn routes_require_a_valid_token() {
    let server = server().await;

    let missing = server.get("/api/posts").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.json::<Value>()["message"],
        "Access denied. No token provided."
    );

    let (name, value) = token("not a token");
    let invalid = server.get("/api/posts").add_header(name, value).await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json::<Value>()["message"], "Invalid token");
}

#[tokio::test]
async fn comment_count_follows_comments() {
    let server = server().await;
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;
    let post_id = create_post(&server, &auth, "hello").await;

    let mut comment_ids = Vec::new();
    for text in ["first", "second"] {
        let (name, value) = token(&auth);
        let comment: Value = server
            .post("/api/comments")
            .add_header(name, value)
            .json(&json!({ "postId": post_id, "comment": text }))
            .await
            .json();
        assert_eq!(comment["createdBy"]["firstName"], "Ada");
        comment_ids.push(comment["id"].as_str().unwrap().to_string());
    }

    assert_eq!(counts(&server, &auth, &post_id).await["commentCount"], 2);

    let (name, value) = token(&auth);
    server
        .delete(&format!("/api/comments/{}", comment_ids[0]))
        .add_header(name, value)
        .await
        .assert_status_ok();
    assert_eq!(counts(&server, &auth, &post_id).await["commentCount"], 1);

    let (name, value) = token(&auth);
    let posts: Value = server.get("/api/posts").add_header(name, value).await.json();
    assert_eq!(posts[0]["id"], post_id.as_str());
    assert_eq!(posts[0]["commentCount"], 1);
    assert_eq!(posts[0]["likeCount"], 0);

    let (name, value) = token(&auth);
    server
        .delete(&format!("/api/comments/{}", comment_ids[1]))
        .add_header(name, value)
        .await
        .assert_status_ok();
    assert_eq!(counts(&server, &auth, &post_id).await["commentCount"], 0);

    let (name, value) = token(&auth);
    let comments: Value = server
        .get(&format!("/api/comments/post/{post_id}"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(comments.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn toggling_a_like_twice_leaves_no_like() {
    let server = server().await;
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;
    let post_id = create_post(&server, &auth, "hello").await;

    let (name, value) = token(&auth);
    let liked: Value = server
        .post(&format!("/api/posts/{post_id}/like"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(liked["likeCount"], 1);

    let (name, value) = token(&auth);
    let unliked: Value = server
        .post(&format!("/api/posts/{post_id}/like"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(unliked["likeCount"], 0);
}

#[tokio::test]
async fn liking_is_idempotent() {
    let server = server().await;
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;
    let (_, other) = sign_up(&server, "bob@example.com", "Bob").await;
    let post_id = create_post(&server, &auth, "hello").await;

    for caller in [&auth, &auth, &other] {
        let (name, value) = token(caller);
        server
            .post("/api/likes")
            .add_header(name, value)
            .json(&json!({ "postId": post_id }))
            .await
            .assert_status_ok();
    }
    assert_eq!(counts(&server, &auth, &post_id).await["likeCount"], 2);

    let (name, value) = token(&auth);
    server
        .delete(&format!("/api/likes/{post_id}"))
        .add_header(name, value)
        .await
        .assert_status_ok();
    assert_eq!(counts(&server, &auth, &post_id).await["likeCount"], 1);

    let (name, value) = token(&auth);
    let again = server
        .delete(&format!("/api/likes/{post_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(counts(&server, &auth, &post_id).await["likeCount"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_likes_share_one_like() {
    let server = server().await;
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;
    let post_id = create_post(&server, &auth, "hello").await;

    for round in 0..5 {
        let requests = (0..4).map(|_| {
            let (name, value) = token(&auth);
            server
                .post("/api/likes")
                .add_header(name, value)
                .json(&json!({ "postId": post_id }))
                .into_future()
        });
        let responses = join_all(requests).await;

        let statuses: Vec<_> = responses.iter().map(|response| response.status_code()).collect();
        assert!(statuses.iter().all(|status| *status == StatusCode::OK), "round {round}: {statuses:?}");

        let ids: Vec<Value> = responses.iter().map(|response| response.json::<Value>()["id"].clone()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]), "round {round}: {ids:?}");
        assert_eq!(counts(&server, &auth, &post_id).await["likeCount"], 1);

        let (name, value) = token(&auth);
        server
            .delete(&format!("/api/likes/{post_id}"))
            .add_header(name, value)
            .await
            .assert_status_ok();
        assert_eq!(counts(&server, &auth, &post_id).await["likeCount"], 0);
    }
}

#[tokio::test]
async fn failed_counter_updates_keep_the_comment_until_recounted() {
    let database = database::memory().await.unwrap();
    let server = server_on(database.clone());
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;
    let post_id = create_post(&server, &auth, "hello").await;

    let comment = |text: &'static str| {
        let (name, value) = token(&auth);
        server
            .post("/api/comments")
            .add_header(name, value)
            .json(&json!({ "postId": post_id, "comment": text }))
    };

    comment("first").await.assert_status_ok();

    // the counter refuses to grow past one
    database
        .sql("DEFINE FIELD count ON comment_counts ASSERT $value < 2")
        .execute()
        .await
        .unwrap();

    comment("second").await.assert_status_ok();
    assert_eq!(counts(&server, &auth, &post_id).await["commentCount"], 1);

    let (name, value) = token(&auth);
    let comments: Value = server
        .get(&format!("/api/comments/post/{post_id}"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(comments.as_array().unwrap().len(), 2);

    database
        .sql("REMOVE FIELD count ON comment_counts")
        .execute()
        .await
        .unwrap();

    let (name, value) = token(&auth);
    let report: Value = server
        .post(&format!("/api/posts/{post_id}/recount"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(report["comments"]["previous"], 1);
    assert_eq!(report["comments"]["current"], 2);
    assert_eq!(report["likes"]["current"], 0);

    assert_eq!(counts(&server, &auth, &post_id).await["commentCount"], 2);
}

#[tokio::test]
async fn post_is_kept_when_its_images_cannot_be_recorded() {
    let database = database::memory().await.unwrap();
    let server = server_on(database.clone());
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;

    database
        .sql("DEFINE FIELD userId ON images ASSERT $value = NONE")
        .execute()
        .await
        .unwrap();

    let (name, value) = token(&auth);
    let response = server
        .post("/api/posts")
        .add_header(name, value)
        .json(&json!({
            "post": "with a picture",
            "images": [{ "name": "cat", "url": "https://example.com/cat.png" }],
        }))
        .await;
    response.assert_status_ok();
    let post: Value = response.json();
    assert_eq!(post["images"][0]["name"], "cat");

    let (name, value) = token(&auth);
    let posts: Value = server.get("/api/posts").add_header(name, value).await.json();
    assert_eq!(posts[0]["id"], post["id"]);

    let (name, value) = token(&auth);
    let images: Value = server.get("/api/images").add_header(name, value).await.json();
    assert_eq!(images.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn ownership_and_references_are_checked() {
    let server = server().await;
    let (_, ada) = sign_up(&server, "ada@example.com", "Ada").await;
    let (_, bob) = sign_up(&server, "bob@example.com", "Bob").await;
    let post_id = create_post(&server, &ada, "hello").await;

    let (name, value) = token(&ada);
    let comment: Value = server
        .post("/api/comments")
        .add_header(name, value)
        .json(&json!({ "postId": post_id, "comment": "mine" }))
        .await
        .json();

    let (name, value) = token(&bob);
    let foreign = server
        .delete(&format!("/api/comments/{}", comment["id"].as_str().unwrap()))
        .add_header(name, value)
        .await;
    assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = token(&bob);
    let edit = server
        .patch(&format!("/api/posts/{post_id}"))
        .add_header(name, value)
        .json(&json!({ "post": "not yours" }))
        .await;
    assert_eq!(edit.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = token(&bob);
    let dangling = server
        .post("/api/comments")
        .add_header(name, value)
        .json(&json!({ "postId": "missing", "comment": "hi" }))
        .await;
    assert_eq!(dangling.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(dangling.json::<Value>()["message"], "Invalid post");

    let (name, value) = token(&bob);
    let missing = server
        .get("/api/posts/missing/counts")
        .add_header(name, value)
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    assert_eq!(counts(&server, &ada, &post_id).await["commentCount"], 1);
}

#[tokio::test]
async fn deleting_a_post_drops_its_children_and_counters() {
    let server = server().await;
    let (_, auth) = sign_up(&server, "ada@example.com", "Ada").await;
    let post_id = create_post(&server, &auth, "hello").await;

    let (name, value) = token(&auth);
    server
        .post("/api/comments")
        .add_header(name, value)
        .json(&json!({ "postId": post_id, "comment": "hi" }))
        .await
        .assert_status_ok();
    let (name, value) = token(&auth);
    server
        .post(&format!("/api/posts/{post_id}/like"))
        .add_header(name, value)
        .await
        .assert_status_ok();

    let (name, value) = token(&auth);
    server
        .delete(&format!("/api/posts/{post_id}"))
        .add_header(name, value)
        .await
        .assert_status_ok();

    let (name, value) = token(&auth);
    let report: Value = server
        .post(&format!("/api/posts/{post_id}/recount"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(report["comments"]["previous"], Value::Null);
    assert_eq!(report["comments"]["current"], 0);
    assert_eq!(report["likes"]["current"], 0);
}

#[tokio::test]
async fn friend_requests() {
    let server = server().await;
    let (ada_id, ada) = sign_up(&server, "ada@example.com", "Ada").await;
    let (bob_id, bob) = sign_up(&server, "bob@example.com", "Bob").await;

    let (name, value) = token(&ada);
    let request: Value = server
        .post("/api/friends")
        .add_header(name, value)
        .json(&json!({ "recipient": bob_id }))
        .await
        .json();
    assert_eq!(request["requester"], ada_id.as_str());
    assert_eq!(request["status"], "requested");

    let (name, value) = token(&ada);
    let again = server
        .post("/api/friends")
        .add_header(name, value)
        .json(&json!({ "recipient": bob_id }))
        .await;
    assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);

    let (name, value) = token(&bob);
    let notifications: Value = server
        .get("/api/friends/notifications")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(notifications.as_array().unwrap().len(), 1);

    let (name, value) = token(&bob);
    let accepted: Value = server
        .patch(&format!("/api/friends/{}", request["id"].as_str().unwrap()))
        .add_header(name, value)
        .json(&json!({ "status": "accepted" }))
        .await
        .json();
    assert_eq!(accepted["status"], "accepted");

    let (name, value) = token(&ada);
    let friends: Value = server.get("/api/friends").add_header(name, value).await.json();
    assert_eq!(friends[0]["status"], "accepted");
}

#[tokio::test]
async fn messages_form_a_conversation() {
    let server = server().await;
    let (ada_id, ada) = sign_up(&server, "ada@example.com", "Ada").await;
    let (bob_id, bob) = sign_up(&server, "bob@example.com", "Bob").await;

    for (auth, recipient, text) in [(&ada, &bob_id, "hi bob"), (&bob, &ada_id, "hi ada")] {
        let (name, value) = token(auth);
        server
            .post("/api/messages")
            .add_header(name, value)
            .json(&json!({ "recipient": recipient, "message": text }))
            .await
            .assert_status_ok();
    }

    let (name, value) = token(&ada);
    let conversation: Value = server
        .get(&format!("/api/messages/{bob_id}"))
        .add_header(name, value)
        .await
        .json();

    assert_eq!(conversation[0]["message"], "hi bob");
    assert_eq!(conversation[1]["message"], "hi ada");
}
