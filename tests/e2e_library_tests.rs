//! End-to-end tests for the library endpoints

mod common;

use common::{
    TestClient, TestServer, JAZZ_KEY, JAZZ_PROGRESSION_REPLY, JAZZ_SIGNATURE,
    ROCK_KEY, ROCK_PROGRESSION_REPLY, ROCK_SIGNATURE,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_empty_library() {
    let server = TestServer::spawn(vec![]).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_library().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], json!([]));
}

#[tokio::test]
async fn test_library_lists_in_registration_order() {
    let server = TestServer::spawn(vec![
        Ok(ROCK_PROGRESSION_REPLY.into()),
        Ok(JAZZ_PROGRESSION_REPLY.into()),
    ])
    .await;
    let client = TestClient::new(server.base_url.clone());

    client.generate_progression("driving", "Rock", "Guitar").await;
    client.generate_progression("happy", "Jazz", "Piano").await;

    let body: Value = client.list_library().await.json().await.unwrap();
    let entries = body["result"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["signature"], ROCK_SIGNATURE);
    assert_eq!(entries[0]["key"], ROCK_KEY);
    assert_eq!(entries[0]["chords"], json!(["C#m", "A", "E", "B"]));
    assert_eq!(entries[1]["signature"], JAZZ_SIGNATURE);
}

#[tokio::test]
async fn test_library_item_by_encoded_and_raw_key() {
    let server = TestServer::spawn(vec![Ok(ROCK_PROGRESSION_REPLY.into())]).await;
    let client = TestClient::new(server.base_url.clone());

    let generated: Value = client
        .generate_progression("driving", "Rock", "Guitar")
        .await
        .json()
        .await
        .unwrap();

    let by_key: Value = client.get_library_item(ROCK_KEY).await.json().await.unwrap();
    let by_raw: Value = client
        .get_library_item(ROCK_SIGNATURE)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(by_key, by_raw);

    let item = &by_key["result"];
    assert_eq!(item["signature"], ROCK_SIGNATURE);
    assert_eq!(item["key"], ROCK_KEY);
    assert_eq!(item["progression"][0], generated["result"]);
    assert_eq!(item["explanation"], json!([]));
}

#[tokio::test]
async fn test_unknown_library_item_is_empty() {
    let server = TestServer::spawn(vec![]).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_library_item(JAZZ_KEY).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["progression"], json!([]));
    assert_eq!(body["result"]["explanation"], json!([]));
}

#[tokio::test]
async fn test_misplaced_marker_is_invalid_key() {
    let server = TestServer::spawn(vec![]).await;
    let client = TestClient::new(server.base_url.clone());

    for key in ["_sharp_C,G", "C_flat_,G"] {
        let response = client.get_library_item(key).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "for {}", key);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "invalid_key");
    }
}

#[tokio::test]
async fn test_home_reports_provider() {
    let server = TestServer::spawn(vec![]).await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.home().await.json().await.unwrap();
    assert_eq!(body["provider"], "scripted");
    assert_eq!(body["model"], "scripted-model");
    assert!(body["uptime"].as_str().unwrap().starts_with("0d"));
}
