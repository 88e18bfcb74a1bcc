use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::order_service::OrderService;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub database: &'static str,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health(service: web::Data<OrderService>) -> HttpResponse {
    let db = web::block(move || service.health()).await;

    match db {
        Ok(Ok(())) => HttpResponse::Ok().json(HealthResponse {
            status: "UP",
            timestamp: Utc::now().to_rfc3339(),
            database: "Connected",
        }),
        Ok(Err(e)) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "DOWN",
                timestamp: Utc::now().to_rfc3339(),
                database: "Disconnected",
            })
        }
        Err(e) => {
            log::error!("Health check task failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "DOWN",
                timestamp: Utc::now().to_rfc3339(),
                database: "Unknown",
            })
        }
    }
}
