pub use controller::*;
use clap::Parser;
use tracing_subscriber::{EnvFilter, Registry, prelude::*};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Responder, get, middleware, web::Data};

#[get("/metrics")]
async fn metrics(c: Data<Manager>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    HttpResponse::Ok()
        .content_type("application/openmetrics-text; version=1.0.0; charset=utf-8")
        .body(metrics)
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<Manager>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::parse();

    // Setup tracing layers
    let telemetry = tracing_opentelemetry::layer();
    let logger = tracing_subscriber::fmt::layer();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let collector = Registry::default().with(telemetry).with(logger).with(env_filter);

    // Initialize tracing
    tracing::subscriber::set_global_default(collector).expect("install the tracing subscriber");
    tracing::info!(
        "Starting with registration {}, retrying every {}s",
        if config.enabled_registration { "enabled" } else { "disabled" },
        config.requeue_seconds
    );

    // Start kubernetes controllers
    let (manager, controller_kyma, controller_mapping) = Manager::new(&config).await;

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(manager.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind(&config.listen)?
    .shutdown_timeout(5);

    tokio::select! {
        _ = controller_kyma => tracing::warn!("Kyma controller exited"),
        _ = controller_mapping => tracing::warn!("CompassManagerMapping controller exited"),
        _ = server.run() => tracing::info!("actix exited"),
    }
    Ok(())
}
