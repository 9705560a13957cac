//! Purchase orders, wastage and the image gallery through the full router.

mod common;

use std::str::FromStr;

use axum::{
    body::Body,
    http::{Method, Request},
};
use common::{id_of, response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal serialized as string")).unwrap()
}

#[tokio::test]
async fn order_lifecycle_locks_after_submission() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let item = app.create_item(&catalog, "Butter").await;
    let supplier = app.create_supplier("Creamery").await;

    let order = app
        .create(
            "/api/orders",
            json!({
                "supplierId": id_of(&supplier),
                "lines": [
                    { "itemId": id_of(&item), "quantity": "3" },
                    { "itemId": id_of(&item), "quantity": "2", "unitPrice": "7.25" }
                ]
            }),
        )
        .await;
    let order_id = id_of(&order);
    assert_eq!(order["status"], "draft");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(decimal(&order["totalAmount"]), dec!(44.50));
    assert_eq!(order["lines"].as_array().unwrap().len(), 2);

    let status_uri = format!("/api/orders/{order_id}/status");
    let response = app
        .authed(Method::PATCH, &status_uri, Some(json!({ "status": "submitted" })))
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .authed(
            Method::PUT,
            &format!("/api/orders/{order_id}"),
            Some(json!({ "notes": "too late" })),
        )
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .authed(Method::PATCH, &status_uri, Some(json!({ "status": "draft" })))
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .authed(Method::DELETE, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .authed(Method::GET, "/api/orders?status=submitted", None)
        .await;
    let listed = response_json(response).await;
    assert_eq!(listed["pagination"]["total"], 1);
}

#[tokio::test]
async fn order_without_lines_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .authed(Method::POST, "/api/orders", Some(json!({ "lines": [] })))
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .authed(Method::GET, "/api/orders?status=shipped", None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn wastage_is_costed_at_the_item_price() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let item = app.create_item(&catalog, "Lettuce").await;

    let record = app
        .create(
            "/api/wastage",
            json!({ "itemId": id_of(&item), "quantity": "2.5", "reason": "wilted" }),
        )
        .await;
    assert_eq!(decimal(&record["cost"]), dec!(25));

    let updated = response_json(
        app.authed(
            Method::PUT,
            &format!("/api/wastage/{}", id_of(&record)),
            Some(json!({ "quantity": "1" })),
        )
        .await,
    )
    .await;
    assert_eq!(decimal(&updated["cost"]), dec!(10));

    let listed = response_json(
        app.authed(
            Method::GET,
            &format!("/api/wastage?item={}", id_of(&item)),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listed["pagination"]["total"], 1);
}

fn multipart_upload(token: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "gallery-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nLogo\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"logo.png\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/gallery")
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn gallery_upload_and_delete_reach_the_image_store() {
    let app = TestApp::new().await;
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3, 4];

    let response = app.send(multipart_upload(app.token(), "image/png", &png)).await;
    assert_eq!(response.status(), 201);
    let image = response_json(response).await;
    assert_eq!(image["title"], "Logo");
    let public_id = image["publicId"].as_str().unwrap().to_string();
    assert!(app.images.contains(&public_id));
    assert_eq!(app.images.size_of(&public_id), Some(png.len()));

    let response = app
        .authed(Method::DELETE, &format!("/api/gallery/{}", id_of(&image)), None)
        .await;
    assert_eq!(response.status(), 200);
    assert!(!app.images.contains(&public_id));
    assert!(app.images.is_empty());
}

#[tokio::test]
async fn gallery_rejects_non_images_and_oversized_files() {
    let app = TestApp::with_config(|cfg| cfg.max_upload_bytes = 16).await;

    let response = app
        .send(multipart_upload(app.token(), "text/plain", b"hello"))
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .send(multipart_upload(app.token(), "image/png", &[7u8; 64]))
        .await;
    assert_eq!(response.status(), 413);
    assert!(app.images.is_empty());
}
