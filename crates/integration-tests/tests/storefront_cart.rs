//! Integration tests for the storefront cart and WhatsApp checkout.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (vitrine-cli migrate)
//! - The storefront server running (cargo run -p vitrine-storefront)
//!
//! Products are inserted straight into the database, so each test waits out
//! the storefront's catalog cache before using them.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::LOCATION;
use rust_decimal::Decimal;
use vitrine_integration_tests::{TestContext, client, eventually, unique_name};

const CACHE_WAIT: Duration = Duration::from_secs(75);

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_storefront_health() {
    let ctx = TestContext::new().await;

    let resp = client()
        .get(ctx.storefront("/health"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_empty_cart_cannot_check_out() {
    let ctx = TestContext::new().await;

    let resp = client()
        .post(ctx.storefront("/checkout"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_to_cart_and_check_out() {
    let ctx = TestContext::new().await;
    let name = unique_name("Caneca");
    let product = ctx.create_product(&name, Decimal::new(3490, 2), 3).await;
    let client = client();

    let url = ctx.storefront(&format!("/products/{product}"));
    let visible = eventually(CACHE_WAIT, || {
        let request = client.get(&url);
        async move {
            request
                .send()
                .await
                .is_ok_and(|resp| resp.status() == StatusCode::OK)
        }
    })
    .await;
    assert!(visible, "product should appear once the catalog cache refreshes");

    let resp = client
        .post(ctx.storefront("/cart/add"))
        .form(&[("product_id", product.to_string()), ("quantity", "2".to_string())])
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["HX-Trigger"], "cart-updated");
    let badge = resp.text().await.expect("Failed to read body");
    assert!(badge.contains(">2<"), "badge should count two items: {badge}");

    // More than the three in stock
    let resp = client
        .post(ctx.storefront("/cart/add"))
        .form(&[("product_id", product.to_string()), ("quantity", "5".to_string())])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .post(ctx.storefront("/checkout"))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()[LOCATION].to_str().expect("ascii location");
    assert!(location.starts_with("https://wa.me/"), "{location}");
    assert!(location.contains("Caneca"), "message should list the product: {location}");

    let resp = client
        .get(ctx.storefront("/cart/count"))
        .send()
        .await
        .expect("Failed to read cart count");
    let badge = resp.text().await.expect("Failed to read body");
    assert!(badge.contains(">0<"), "cart should be empty after checkout: {badge}");

    ctx.delete_product(product).await;
}
