use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::order_service::OrderService;
use crate::domain::order::{CartLine, Order, OrderLine, PlaceOrder, ShippingInfo};
use crate::domain::pricing;
use crate::errors::AppError;

use super::identity::{source_address, Identity};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    /// Product id
    pub id: i32,
    pub quantity: i32,
}

impl From<&CartItemRequest> for CartLine {
    fn from(item: &CartItemRequest) -> Self {
        CartLine {
            product_id: item.id,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippingAddressRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<CartItemRequest>,
    /// Plain decimal total as a string, at most two fraction digits, e.g. "199.98".
    /// Only checked against the catalog total; never stored.
    pub total_amount: String,
    pub shipping_address: ShippingAddressRequest,
}

impl PlaceOrderRequest {
    fn into_domain(self) -> Result<PlaceOrder, AppError> {
        let asserted_total = pricing::parse_amount(&self.total_amount)?;
        let shipping = ShippingInfo::parse(
            &self.shipping_address.name,
            &self.shipping_address.address,
            &self.shipping_address.phone,
        )?;
        let lines = self.items.iter().map(CartLine::from).collect();
        Ok(PlaceOrder::new(lines, asserted_total, shipping)?)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: String,
    pub order_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentIntentRequest {
    pub items: Vec<CartItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price_at_purchase: String,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(l: OrderLine) -> Self {
        OrderLineResponse {
            id: l.id,
            product_id: l.product_id,
            quantity: l.quantity,
            price_at_purchase: l.price_at_purchase.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub user_id: i32,
    pub total_amount: String,
    pub shipping_name: String,
    pub shipping_address: String,
    pub shipping_phone: String,
    pub status: String,
    pub tracking_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderLineResponse>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            user_id: o.user_id,
            total_amount: o.total_amount.to_string(),
            shipping_name: o.shipping.name,
            shipping_address: o.shipping.address,
            shipping_phone: o.shipping.phone,
            status: o.status.to_string(),
            tracking_number: o.tracking_number,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            items: o.lines.into_iter().map(OrderLineResponse::from).collect(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/orders/place-order
///
/// Places an order for the calling user. Prices come from the catalog; the
/// submitted total must match them to within one minor currency unit.
#[utoipa::path(
    post,
    path = "/api/orders/place-order",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = PlaceOrderResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "No identity"),
        (status = 409, description = "Price mismatch or insufficient stock"),
        (status = 422, description = "Product unavailable"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    service: web::Data<OrderService>,
    identity: Identity,
    req: HttpRequest,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let Identity(actor) = identity;
    let request = body.into_inner().into_domain()?;
    let source = source_address(&req);

    let order = web::block(move || service.place_order(actor.user_id, &request, source))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(PlaceOrderResponse {
        message: "Order created".to_string(),
        order_id: order.id,
    }))
}

/// POST /api/orders/create-payment-intent
///
/// Asks the payment processor for a client secret covering the cart, priced
/// from the catalog.
#[utoipa::path(
    post,
    path = "/api/orders/create-payment-intent",
    request_body = PaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = PaymentIntentResponse),
        (status = 400, description = "Malformed request"),
        (status = 422, description = "Product unavailable"),
        (status = 502, description = "Payment processor error"),
    ),
    tag = "orders"
)]
pub async fn create_payment_intent(
    service: web::Data<OrderService>,
    _identity: Identity,
    body: web::Json<PaymentIntentRequest>,
) -> Result<HttpResponse, AppError> {
    let lines: Vec<CartLine> = body.items.iter().map(CartLine::from).collect();

    let intent = web::block(move || service.create_payment_intent(&lines))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// GET /api/orders/user/{user_id}
///
/// Returns the user's orders, newest first, each with its lines.
#[utoipa::path(
    get,
    path = "/api/orders/user/{user_id}",
    params(
        ("user_id" = i32, Path, description = "Owner's user id"),
    ),
    responses(
        (status = 200, description = "Orders of the user", body = [OrderResponse]),
        (status = 403, description = "Neither the owner nor an admin"),
    ),
    tag = "orders"
)]
pub async fn list_user_orders(
    service: web::Data<OrderService>,
    identity: Identity,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let Identity(actor) = identity;
    let user_id = path.into_inner();

    let orders = web::block(move || service.list_orders_for_user(&actor, user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/orders/{id}
///
/// Returns the order together with its order lines.
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Neither the owner nor an admin"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<OrderService>,
    identity: Identity,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let Identity(actor) = identity;
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(&actor, order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
