//! API integration tests
//!
//! Need a running server with an empty-ish database:
//! `API_KEY=dev-key cargo run`, then `API_KEY=dev-key cargo test -- --ignored`.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";

fn api_key() -> String {
    std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".to_string())
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("{}{:010}", prefix, nanos)
}

/// Create a category and a book with the given number of copies
async fn create_book(client: &Client, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/categories", BASE_URL))
        .header("Api-Key", api_key())
        .json(&json!({ "name": unique("cat-") }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let category: Value = response.json().await.expect("Failed to parse response");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Api-Key", api_key())
        .json(&json!({
            "title": "The Dispossessed",
            "author": "Ursula K. Le Guin",
            "isbn": unique("978"),
            "total_quantity": copies,
            "category_id": category["id"]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["available_quantity"], copies);
    book["id"].as_i64().expect("No book ID")
}

async fn borrow(client: &Client, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/borrowings/borrow", BASE_URL))
        .header("Api-Key", api_key())
        .json(&json!({
            "book_id": book_id,
            "borrower_name": "Integration Guest",
            "borrower_room_number": "101",
            "borrower_hotel": "Test Hotel"
        }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn return_borrowing(client: &Client, borrowing_id: i64) -> reqwest::Response {
    client
        .patch(format!("{}/borrowings/return/{}", BASE_URL, borrowing_id))
        .header("Api-Key", api_key())
        .send()
        .await
        .expect("Failed to send request")
}

async fn available(client: &Client, book_id: i64) -> i64 {
    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    book["available_quantity"].as_i64().expect("No quantity")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return() {
    let client = Client::new();
    let book_id = create_book(&client, 3).await;

    let response = borrow(&client, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let borrowing: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(borrowing["is_returned"], false);
    assert!(borrowing["returned_at"].is_null());
    assert_eq!(available(&client, book_id).await, 2);

    let id = borrowing["id"].as_i64().expect("No borrowing ID");
    let response = return_borrowing(&client, id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["is_returned"], true);
    assert!(returned["returned_at"].is_string());
    assert_eq!(available(&client, book_id).await, 3);

    let response = return_borrowing(&client, id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_borrow_unavailable_and_missing() {
    let client = Client::new();
    let book_id = create_book(&client, 0).await;

    assert_eq!(borrow(&client, book_id).await.status(), StatusCode::CONFLICT);
    assert_eq!(available(&client, book_id).await, 0);
    assert_eq!(borrow(&client, i32::MAX as i64).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows() {
    let client = Client::new();
    let book_id = create_book(&client, 3).await;

    let requests: Vec<_> = (0..10)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { borrow(&client, book_id).await.status() })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for request in requests {
        match request.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(conflicts, 7);
    assert_eq!(available(&client, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_total_quantity_guard() {
    let client = Client::new();
    let book_id = create_book(&client, 3).await;
    assert_eq!(borrow(&client, book_id).await.status(), StatusCode::CREATED);
    assert_eq!(borrow(&client, book_id).await.status(), StatusCode::CREATED);

    let response = client
        .patch(format!("{}/books/{}", BASE_URL, book_id))
        .header("Api-Key", api_key())
        .json(&json!({ "total_quantity": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .patch(format!("{}/books/{}", BASE_URL, book_id))
        .header("Api-Key", api_key())
        .json(&json!({ "total_quantity": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["total_quantity"], 5);
    assert_eq!(book["available_quantity"], 3);
}

#[tokio::test]
#[ignore]
async fn test_update_book_null_clears_category() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let response = client
        .patch(format!("{}/books/{}", BASE_URL, book_id))
        .header("Api-Key", api_key())
        .json(&json!({ "category_id": null, "image_url": null }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let book: Value = response.json().await.expect("Failed to parse response");
    assert!(book["category_id"].is_null());
    assert!(book["image_url"].is_null());
    assert_eq!(book["title"], "The Dispossessed");
}

#[tokio::test]
#[ignore]
async fn test_list_books_huge_page() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?page={}", BASE_URL, i64::MAX))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["books"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_delete_book_with_open_borrowing() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    let borrowing: Value = borrow(&client, book_id).await.json().await.unwrap();

    let delete = |client: Client| async move {
        client
            .delete(format!("{}/books/{}", BASE_URL, book_id))
            .header("Api-Key", api_key())
            .send()
            .await
            .expect("Failed to send request")
            .status()
    };

    assert_eq!(delete(client.clone()).await, StatusCode::CONFLICT);
    let id = borrowing["id"].as_i64().unwrap();
    assert_eq!(return_borrowing(&client, id).await.status(), StatusCode::OK);
    assert_eq!(delete(client.clone()).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_list_books_pagination() {
    let client = Client::new();
    create_book(&client, 1).await;

    let body: Value = client
        .get(format!("{}/books?per_page=1&page=1", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert!(body["books"].is_array());
    assert_eq!(body["pagination"]["per_page"], 1);
    assert_eq!(body["pagination"]["has_prev"], false);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/categories", BASE_URL))
        .json(&json!({ "name": "forbidden" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
