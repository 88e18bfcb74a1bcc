use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::application::order_service::OrderService;
use crate::domain::audit::{AuditEntry, AuditFilter};
use crate::domain::order::OrderStatus;
use crate::errors::AppError;

use super::identity::{source_address, Identity};
use super::orders::OrderResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of pending, paid, shipped, completed, cancelled
    pub status: String,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogParams {
    pub user_id: Option<i32>,
    pub action: Option<String>,
    #[serde(default = "default_audit_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_audit_limit() -> i64 {
    100
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditEntryResponse {
    pub user_id: Option<i32>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<i32>,
    #[schema(value_type = Object)]
    pub old_values: Option<Value>,
    #[schema(value_type = Object)]
    pub new_values: Option<Value>,
    pub ip_address: Option<String>,
    pub timestamp: String,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        AuditEntryResponse {
            user_id: e.user_id,
            action: e.action,
            table_name: e.table_name,
            record_id: e.record_id,
            old_values: e.old_values,
            new_values: e.new_values,
            ip_address: e.ip_address,
            timestamp: e.timestamp.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// PATCH /api/admin/orders/{id}/status
///
/// Moves an order to a new status. Paying decrements stock; shipping assigns
/// a tracking number once.
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(
        ("id" = i32, Path, description = "Order id"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed or insufficient stock"),
    ),
    tag = "admin"
)]
pub async fn update_order_status(
    service: web::Data<OrderService>,
    identity: Identity,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let Identity(actor) = identity;
    let order_id = path.into_inner();
    let status: OrderStatus = body.status.trim().parse()?;
    let source = source_address(&req);

    let order =
        web::block(move || service.update_order_status(&actor, order_id, status, source))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /api/admin/orders
///
/// Returns a paginated list of all orders (without their lines).
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    service: web::Data<OrderService>,
    identity: Identity,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let Identity(actor) = identity;
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || service.list_all_orders(&actor, page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /api/admin/audit-logs
///
/// Newest audit entries first, optionally filtered by user and action.
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditLogParams),
    responses(
        (status = 200, description = "Audit entries", body = [AuditEntryResponse]),
        (status = 403, description = "Not an admin"),
    ),
    tag = "admin"
)]
pub async fn audit_logs(
    service: web::Data<OrderService>,
    identity: Identity,
    query: web::Query<AuditLogParams>,
) -> Result<HttpResponse, AppError> {
    let Identity(actor) = identity;
    let params = query.into_inner();
    let filter = AuditFilter {
        user_id: params.user_id,
        action: params.action,
        limit: params.limit,
        offset: params.offset,
    };

    let entries = web::block(move || service.audit_entries(&actor, &filter))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<AuditEntryResponse> = entries.into_iter().map(AuditEntryResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
