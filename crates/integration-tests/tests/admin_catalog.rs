//! Integration tests for catalog management in the admin panel.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (vitrine-cli migrate)
//! - The admin server running (cargo run -p vitrine-admin)

use reqwest::StatusCode;
use reqwest::header::LOCATION;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use vitrine_admin::db::{CategoryRepository, KitRepository, ProductRepository};
use vitrine_core::catalog::DEFAULT_BUCKET;
use vitrine_core::{KitId, ProductId};
use vitrine_integration_tests::{TestContext, unique_name};

fn id_from_location(location: &str) -> ProductId {
    location
        .trim_start_matches("/products/")
        .trim_end_matches("/edit")
        .parse()
        .expect("Location should point at the product edit page")
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_product_form_round_trip() {
    let ctx = TestContext::new().await;
    let client = ctx.admin_client().await;
    let name = unique_name("Camiseta");

    let resp = client
        .post(ctx.admin("/products"))
        .form(&[
            ("name", name.as_str()),
            ("description", "Algodão"),
            ("price", "59,90"),
            ("sizes", "P, M, G"),
        ])
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()[LOCATION].to_str().expect("ascii location").to_string();
    let id = id_from_location(&location);

    let product = ProductRepository::new(&ctx.pool)
        .get(id)
        .await
        .expect("Failed to load product")
        .expect("Product should exist");
    assert_eq!(product.name, name);
    assert_eq!(product.price, Decimal::new(5990, 2));
    assert_eq!(product.sizes, vec!["P", "M", "G"]);
    assert_eq!(product.stock.total(), 0);

    let resp = client
        .post(ctx.admin(&format!("/products/{id}/stock")))
        .form(&[("stock_P", "2"), ("stock_M", "0"), ("stock_G", "5")])
        .send()
        .await
        .expect("Failed to update stock");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let product = ProductRepository::new(&ctx.pool)
        .get(id)
        .await
        .expect("Failed to load product")
        .expect("Product should exist");
    assert_eq!(product.stock.recorded("P"), 2);
    assert_eq!(product.stock.recorded("G"), 5);
    assert_eq!(product.stock.recorded(DEFAULT_BUCKET), 0);

    ctx.delete_product(id).await;
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_invalid_product_rerenders_form() {
    let ctx = TestContext::new().await;
    let client = ctx.admin_client().await;

    let resp = client
        .post(ctx.admin("/products"))
        .form(&[("name", ""), ("price", "10")])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("flash-error"));
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_kit_reorder_round_trip() {
    let ctx = TestContext::new().await;
    let client = ctx.admin_client().await;
    let product = ctx.create_product(&unique_name("Caneca"), Decimal::TEN, 3).await;

    for name in [unique_name("Kit A"), unique_name("Kit B")] {
        let resp = client
            .post(ctx.admin("/kits"))
            .form(&[
                ("name", name.as_str()),
                ("price", "25"),
                ("product_id", &product.to_string()),
            ])
            .send()
            .await
            .expect("Failed to create kit");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    let mut order: Vec<KitId> = KitRepository::new(&ctx.pool)
        .list()
        .await
        .expect("Failed to list kits")
        .into_iter()
        .map(|k| k.id)
        .collect();
    order.reverse();

    let resp = client
        .post(ctx.admin("/api/kits/reorder"))
        .json(&json!({ "ids": order }))
        .send()
        .await
        .expect("Failed to reorder kits");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert_eq!(body["ids"], json!(order));

    // Dropping a kit from the order is refused
    let resp = client
        .post(ctx.admin("/api/kits/reorder"))
        .json(&json!({ "ids": order.get(1..).unwrap_or_default() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    ctx.delete_product(product).await;
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_category_order_must_match_members() {
    let ctx = TestContext::new().await;
    let client = ctx.admin_client().await;
    let name = unique_name("Presentes");

    let resp = client
        .post(ctx.admin("/categories"))
        .form(&[("name", name.as_str()), ("parent_id", "")])
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let category = CategoryRepository::new(&ctx.pool)
        .list()
        .await
        .expect("Failed to list categories")
        .into_iter()
        .find(|c| c.name == name)
        .expect("Category should exist");

    let resp = client
        .post(ctx.admin(&format!("/api/categories/{}/order", category.id)))
        .json(&json!({ "ids": [] }))
        .send()
        .await
        .expect("Failed to save order");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(ctx.admin(&format!("/api/categories/{}/order", category.id)))
        .json(&json!({ "ids": [i32::MAX] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = client
        .post(ctx.admin(&format!("/categories/{}/delete", category.id)))
        .send()
        .await
        .expect("Failed to delete category");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_upload_rejects_non_images() {
    let ctx = TestContext::new().await;
    let client = ctx.admin_client().await;

    let form = reqwest::multipart::Form::new()
        .text("folder", "products")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"plain text".to_vec())
                .file_name("notes.txt")
                .mime_str("text/plain")
                .expect("valid mime"),
        );

    let resp = client
        .post(ctx.admin("/api/uploads"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
