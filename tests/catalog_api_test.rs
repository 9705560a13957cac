//! Catalog endpoints driven through the full router: units, items, packaging
//! hierarchies and supplier selections.

mod common;

use std::str::FromStr;

use axum::http::Method;
use common::{id_of, response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

#[tokio::test]
async fn unit_base_unit_is_validated() {
    let app = TestApp::new().await;

    let created = app
        .create("/api/units", json!({ "name": "Litre", "baseUnit": "liter" }))
        .await;
    assert_eq!(created["baseUnit"], "liter");

    let response = app
        .authed(
            Method::POST,
            "/api/units",
            Some(json!({ "name": "Gallon", "baseUnit": "gallon" })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"], "baseUnit must be one of: kg, liter, pieces");
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/units")
        .header("authorization", format!("Bearer {}", app.token()))
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\": "))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn item_with_missing_fields_persists_nothing() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;

    let response = app
        .authed(
            Method::POST,
            "/api/items",
            Some(json!({ "nameEn": "Tomato", "unitId": catalog.unit_id })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let list = response_json(app.authed(Method::GET, "/api/items", None).await).await;
    assert_eq!(list["pagination"]["total"], 0);
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn item_code_and_pricing_follow_the_tax() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let item = app.create_item(&catalog, "Tomato").await;

    let code = item["itemCode"].as_str().unwrap();
    assert!(code.starts_with("ITM-"));
    assert_eq!(code.len(), 12);

    let uri = format!("/api/items/{}/pricing", id_of(&item));
    let response = app.authed(Method::GET, &uri, None).await;
    assert_eq!(response.status(), 200);
    let pricing = response_json(response).await;

    let base = &pricing["embedded"][0];
    assert_eq!(base["slot"], "base");
    assert_eq!(decimal(&base["pricing"]["vatAmount"]), dec!(1.5));
    assert_eq!(decimal(&base["pricing"]["priceInclVAT"]), dec!(11.5));

    let pack = &pricing["embedded"][1];
    assert_eq!(pack["slot"], "pack");
    assert_eq!(decimal(&pack["totalUnits"]), dec!(12));
    assert_eq!(decimal(&pack["pricing"]["priceExclVAT"]), dec!(120));
}

#[tokio::test]
async fn sub_category_must_belong_to_the_category() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let other = app
        .create("/api/categories", json!({ "nameEn": "Dairy" }))
        .await;
    let cheese = app
        .create(
            "/api/sub-categories",
            json!({ "nameEn": "Cheese", "parentId": id_of(&other) }),
        )
        .await;

    let response = app
        .authed(
            Method::POST,
            "/api/items",
            Some(json!({
                "nameEn": "Brie",
                "baseUnit": "kg",
                "unitId": catalog.unit_id,
                "categoryId": catalog.category_id,
                "subCategoryId": id_of(&cheese),
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"], "subCategoryId does not belong to categoryId");
}

#[tokio::test]
async fn deleting_an_item_reports_cascade_counts() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let item = app.create_item(&catalog, "Flour").await;
    let item_id = id_of(&item);
    let supplier = app.create_supplier("Mill & Co").await;

    let bag = app
        .create(
            "/api/packaging",
            json!({ "itemId": item_id, "packagingType": "pack", "amount": "25", "unit": "kg" }),
        )
        .await;
    app.create(
        "/api/packaging",
        json!({
            "itemId": item_id,
            "packagingType": "bulk",
            "amount": "40",
            "unit": "bag",
            "parentPackagingId": id_of(&bag),
        }),
    )
    .await;
    app.create(
        "/api/supplier-items",
        json!({ "supplierId": id_of(&supplier), "itemId": item_id, "packagingType": "base" }),
    )
    .await;

    let response = app
        .authed(Method::DELETE, &format!("/api/items/{item_id}"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Item deleted successfully");
    assert_eq!(body["deletedPackagingCount"], 2);
    assert_eq!(body["deletedSupplierItemCount"], 1);

    let gone = app
        .authed(Method::GET, &format!("/api/items/{item_id}"), None)
        .await;
    assert_eq!(gone.status(), 404);
    let rows = response_json(
        app.authed(Method::GET, &format!("/api/packaging?item={item_id}"), None)
            .await,
    )
    .await;
    assert_eq!(rows["pagination"]["total"], 0);
}

#[tokio::test]
async fn packaging_cannot_become_its_own_ancestor() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let item = app.create_item(&catalog, "Eggs").await;
    let item_id = id_of(&item);

    let tray = app
        .create(
            "/api/packaging",
            json!({ "itemId": item_id, "packagingType": "pack", "amount": "30", "unit": "piece" }),
        )
        .await;
    let crate_row = app
        .create(
            "/api/packaging",
            json!({
                "itemId": item_id,
                "packagingType": "bulk",
                "amount": "12",
                "unit": "tray",
                "parentPackagingId": id_of(&tray),
            }),
        )
        .await;

    let response = app
        .authed(
            Method::PUT,
            &format!("/api/packaging/{}", id_of(&tray)),
            Some(json!({ "parentPackagingId": id_of(&crate_row) })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("cycle"));

    let hierarchy = response_json(
        app.authed(
            Method::GET,
            &format!("/api/packaging/item/{item_id}/hierarchy"),
            None,
        )
        .await,
    )
    .await;
    let entries = hierarchy["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["packagingId"], id_of(&tray));
    assert_eq!(entries[1]["parentPackagingId"], id_of(&tray));
    assert_eq!(decimal(&entries[1]["totalUnits"]), dec!(360));
}

#[tokio::test]
async fn supplier_selection_replace_is_all_or_nothing() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    let item = app.create_item(&catalog, "Milk").await;
    let item_id = id_of(&item);
    let first = id_of(&app.create_supplier("Dairy One").await);
    let second = id_of(&app.create_supplier("Dairy Two").await);
    let uri = format!("/api/items/{item_id}/suppliers");

    let response = app
        .authed(
            Method::PUT,
            &uri,
            Some(json!({ "selections": { "base": [first], "pack": [first, second] } })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let replaced = response_json(response).await;
    assert_eq!(replaced["insertedCount"], 3);

    // An unknown slot rejects the whole payload and keeps the previous rows.
    let response = app
        .authed(
            Method::PUT,
            &uri,
            Some(json!({ "selections": { "base": [second], "additional_7": [first] } })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .authed(
            Method::PUT,
            &uri,
            Some(json!({ "selections": { "base": [uuid::Uuid::new_v4()] } })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"], "selections references a missing supplier");

    let current = response_json(app.authed(Method::GET, &uri, None).await).await;
    assert_eq!(current["selections"]["base"], json!([first]));
    assert_eq!(current["selections"]["pack"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn referenced_units_cannot_be_deleted() {
    let app = TestApp::new().await;
    let catalog = app.seed_catalog().await;
    app.create_item(&catalog, "Rice").await;

    let response = app
        .authed(
            Method::DELETE,
            &format!("/api/units/{}", catalog.unit_id),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);
}
