use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use dotenvy::dotenv;
use storefront_orders::application::audit::AuditRecorder;
use storefront_orders::config::Config;
use storefront_orders::infrastructure::audit_repo::DieselAuditStore;
use storefront_orders::infrastructure::order_repo::DieselOrderRepository;
use storefront_orders::infrastructure::payment::SandboxPaymentGateway;
use storefront_orders::{build_server, create_pool, run_migrations, OrderService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(e)
    })?;

    let pool = create_pool(&config.database_url, &config.pool).map_err(std::io::Error::other)?;
    run_migrations(&pool).map_err(std::io::Error::other)?;

    let (recorder, audit_writer) =
        AuditRecorder::spawn(Arc::new(DieselAuditStore::new(pool.clone())));
    let service = OrderService::new(
        Arc::new(DieselOrderRepository::new(pool.clone())),
        Arc::new(SandboxPaymentGateway),
        Arc::new(DieselAuditStore::new(pool)),
        recorder,
    )
    .with_rules(config.transition_rules())
    .with_currency(config.currency.clone());

    log::info!(
        "Starting server at http://{}:{} ({:?} transitions)",
        config.host,
        config.port,
        config.transition_policy
    );

    build_server(web::Data::new(service), &config.host, config.port)?.await?;

    // The writer stops once the server has dropped its recorder; give it a
    // moment to flush what is queued.
    if tokio::time::timeout(Duration::from_secs(5), audit_writer)
        .await
        .is_err()
    {
        log::warn!("Audit writer did not drain before shutdown");
    }
    Ok(())
}
