pub mod admin;
pub mod health;
pub mod identity;
pub mod orders;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::place_order,
        orders::create_payment_intent,
        orders::list_user_orders,
        orders::get_order,
        admin::update_order_status,
        admin::list_orders,
        admin::audit_logs,
        health::health,
    ),
    components(schemas(
        orders::CartItemRequest,
        orders::ShippingAddressRequest,
        orders::PlaceOrderRequest,
        orders::PlaceOrderResponse,
        orders::PaymentIntentRequest,
        orders::PaymentIntentResponse,
        orders::OrderLineResponse,
        orders::OrderResponse,
        admin::UpdateStatusRequest,
        admin::ListOrdersResponse,
        admin::AuditEntryResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "orders", description = "Order placement and history"),
        (name = "admin", description = "Fulfillment and audit"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;
