mod classifier;
mod config;
mod error;
mod handlers;
mod models;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::handlers::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env();
    let classifier = Classifier::load(&cfg.model_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let state = web::Data::new(AppState {
        classifier: Arc::new(classifier),
    });

    info!(model = %cfg.model_path.display(), bind = %cfg.bind_addr, "starting server");

    HttpServer::new(move || {
        // Permissive CORS: the browser frontend is served from its own origin.
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(web::resource("/predict").route(web::post().to(handlers::predict)))
            .service(web::resource("/health").route(web::get().to(handlers::health)))
    })
    .bind(&cfg.bind_addr)?
    .run()
    .await
}
