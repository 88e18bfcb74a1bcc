//! HTTP tests for the order routes, backed by the in-memory adapters so they
//! run without Postgres.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use storefront_orders::application::audit::AuditRecorder;
use storefront_orders::configure_routes;
use storefront_orders::handlers::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
use storefront_orders::infrastructure::audit_repo::InMemoryAuditStore;
use storefront_orders::infrastructure::memory::InMemoryOrderRepository;
use storefront_orders::infrastructure::payment::SandboxPaymentGateway;
use storefront_orders::OrderService;

const CUSTOMER: i32 = 7;
const ADMIN: i32 = 1;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn service(
    repo: &InMemoryOrderRepository,
    audit: &InMemoryAuditStore,
    recorder: AuditRecorder,
) -> OrderService {
    OrderService::new(
        Arc::new(repo.clone()),
        Arc::new(SandboxPaymentGateway),
        Arc::new(audit.clone()),
        recorder,
    )
}

fn order_body(product_id: i32, quantity: i32, total: &str) -> Value {
    json!({
        "items": [{ "id": product_id, "quantity": quantity }],
        "totalAmount": total,
        "shippingAddress": {
            "name": "Somchai Jaidee",
            "address": "99 Sukhumvit Road, Bangkok",
            "phone": "+66 81 234 5678"
        }
    })
}

macro_rules! app {
    ($svc:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($svc))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn place_order_returns_201_and_the_order_is_readable_by_its_owner() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("49.99"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(order_body(product, 2, "99.98"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let order_id = body["orderId"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{order_id}"))
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], "99.98");
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["price_at_purchase"], "49.99");
    assert!(order["tracking_number"].is_null());
    // Placing does not touch stock.
    assert_eq!(repo.stock_of(product), Some(10));
}

#[actix_web::test]
async fn stale_cart_total_is_rejected_with_409_and_nothing_is_written() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("55.00"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(order_body(product, 2, "99.98"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("Price mismatch"));
    assert_eq!(repo.order_count(), 0);
}

#[actix_web::test]
async fn inactive_product_is_unprocessable() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, false);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(order_body(product, 1, "10.00"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn bad_shipping_details_are_a_bad_request() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let mut body = order_body(product, 1, "10.00");
    body["shippingAddress"]["phone"] = json!("call me");
    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repo.order_count(), 0);
}

#[actix_web::test]
async fn requests_without_identity_are_unauthorized() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .set_json(order_body(product, 1, "10.00"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_moves_an_order_through_fulfillment() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("49.99"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(order_body(product, 3, "149.97"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = created["orderId"].as_i64().unwrap();

    let patch = |status: &str| {
        test::TestRequest::patch()
            .uri(&format!("/api/admin/orders/{order_id}/status"))
            .insert_header((USER_ID_HEADER, ADMIN.to_string()))
            .insert_header((USER_ROLE_HEADER, "admin"))
            .set_json(json!({ "status": status }))
            .to_request()
    };

    let paid: Value = test::call_and_read_body_json(&app, patch("paid")).await;
    assert_eq!(paid["status"], "paid");
    assert_eq!(repo.stock_of(product), Some(7));

    let shipped: Value = test::call_and_read_body_json(&app, patch("shipped")).await;
    assert_eq!(shipped["status"], "shipped");
    let tracking = shipped["tracking_number"].as_str().unwrap().to_string();
    assert!(tracking.starts_with("TH"));
    assert_eq!(tracking.len(), 11);

    let completed: Value = test::call_and_read_body_json(&app, patch("completed")).await;
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["tracking_number"], tracking.as_str());

    let resp = test::call_service(&app, patch("cancelled")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(repo.stock_of(product), Some(7));
}

#[actix_web::test]
async fn unknown_status_is_a_bad_request_even_for_a_missing_order() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::patch()
        .uri("/api/admin/orders/424242/status")
        .insert_header((USER_ID_HEADER, ADMIN.to_string()))
        .insert_header((USER_ROLE_HEADER, "admin"))
        .set_json(json!({ "status": "refunded" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::patch()
        .uri("/api/admin/orders/424242/status")
        .insert_header((USER_ID_HEADER, ADMIN.to_string()))
        .insert_header((USER_ROLE_HEADER, "admin"))
        .set_json(json!({ "status": "paid" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn customers_cannot_use_admin_routes_or_read_other_orders() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(order_body(product, 1, "10.00"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = created["orderId"].as_i64().unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/orders/{order_id}/status"))
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(json!({ "status": "paid" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{order_id}"))
        .insert_header((USER_ID_HEADER, "8"))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/user/{CUSTOMER}"))
        .insert_header((USER_ID_HEADER, "8"))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/admin/orders")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(repo.stock_of(product), Some(10));
}

#[actix_web::test]
async fn order_history_is_newest_first_and_admin_listing_is_paginated() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 100, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let mut ids = Vec::new();
    for quantity in 1..=3 {
        let total = format!("{}.00", quantity * 10);
        let req = test::TestRequest::post()
            .uri("/api/orders/place-order")
            .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
            .insert_header((USER_ROLE_HEADER, "customer"))
            .set_json(order_body(product, quantity, &total))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        ids.push(created["orderId"].as_i64().unwrap());
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/user/{CUSTOMER}"))
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .to_request();
    let history: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let listed: Vec<i64> = history.iter().map(|o| o["id"].as_i64().unwrap()).collect();
    let mut expected = ids.clone();
    expected.reverse();
    assert_eq!(listed, expected);

    let req = test::TestRequest::get()
        .uri("/api/admin/orders?page=1&limit=2")
        .insert_header((USER_ID_HEADER, ADMIN.to_string()))
        .insert_header((USER_ROLE_HEADER, "admin"))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn payment_intent_is_priced_from_the_catalog() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("49.99"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::post()
        .uri("/api/orders/create-payment-intent")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(json!({ "items": [{ "id": product, "quantity": 2 }] }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["clientSecret"].as_str().unwrap().starts_with("pi_"));
}

#[actix_web::test]
async fn status_changes_show_up_in_the_audit_log() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, true);
    let (recorder, _writer) = AuditRecorder::spawn(Arc::new(audit.clone()));
    let app = app!(service(&repo, &audit, recorder));

    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(order_body(product, 1, "10.00"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = created["orderId"].as_i64().unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/orders/{order_id}/status"))
        .insert_header((USER_ID_HEADER, ADMIN.to_string()))
        .insert_header((USER_ROLE_HEADER, "admin"))
        .set_json(json!({ "status": "paid" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // Entries are written in the background.
    for _ in 0..50 {
        if audit.entries().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/admin/audit-logs?action=UPDATE_ORDER_STATUS")
        .insert_header((USER_ID_HEADER, ADMIN.to_string()))
        .insert_header((USER_ROLE_HEADER, "admin"))
        .to_request();
    let entries: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["user_id"], ADMIN);
    assert_eq!(entries[0]["record_id"], order_id);
    assert_eq!(entries[0]["old_values"]["status"], "pending");
    assert_eq!(entries[0]["new_values"]["status"], "paid");
}

#[actix_web::test]
async fn health_reports_up() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "UP");
    assert_eq!(body["database"], "Connected");
}

#[actix_web::test]
async fn exponent_totals_are_rejected_at_the_boundary() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    for total in ["1e-100000000", "1E+100000000", "-10.00", "10.001"] {
        let req = test::TestRequest::post()
            .uri("/api/orders/place-order")
            .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
            .insert_header((USER_ROLE_HEADER, "customer"))
            .set_json(order_body(product, 1, total))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "totalAmount {total}");
    }
    assert_eq!(repo.order_count(), 0);
}

#[actix_web::test]
async fn oversized_quantities_are_rejected_at_the_boundary() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let product = repo.add_product(dec("10.00"), 10, true);
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let mut body = order_body(product, i32::MAX, "10.00");
    body["items"] = json!([
        { "id": product, "quantity": i32::MAX },
        { "id": product, "quantity": i32::MAX }
    ]);
    let req = test::TestRequest::post()
        .uri("/api/orders/place-order")
        .insert_header((USER_ID_HEADER, CUSTOMER.to_string()))
        .insert_header((USER_ROLE_HEADER, "customer"))
        .set_json(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repo.stock_of(product), Some(10));
}

#[actix_web::test]
async fn page_beyond_offset_range_is_a_bad_request() {
    let repo = InMemoryOrderRepository::new();
    let audit = InMemoryAuditStore::new();
    let app = app!(service(&repo, &audit, AuditRecorder::disabled()));

    let req = test::TestRequest::get()
        .uri("/api/admin/orders?page=9223372036854775807&limit=100")
        .insert_header((USER_ID_HEADER, ADMIN.to_string()))
        .insert_header((USER_ROLE_HEADER, "admin"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
