mod auth;
mod config;
mod inference;
mod routes;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use auth::jwt::JwtService;
use auth::middleware::AuthMiddleware;
use auth::user_store::UserStore;
use config::AppConfig;
use inference::model::ClassifierHandle;
use inference::preprocess::ImagePreprocessor;
use inference::service::InferenceService;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    // A failed load is logged inside `load`; the server still starts so that
    // accounts and static files stay usable.
    let classifier = ClassifierHandle::load(&config.pipeline.model.path);
    if !classifier.is_available() {
        log::error!("Starting in degraded mode: /api/predict will answer 503");
    }

    let resize_method = config.pipeline.preprocessing.resize_method;
    log::info!("Resizing uploads with {:?} filter", resize_method);
    let preprocessor = ImagePreprocessor::new(resize_method.filter());

    let inference_service = web::Data::new(InferenceService::new(preprocessor, classifier));
    let user_store = UserStore::connect(&config.database_url).await.map_err(|e| {
        log::error!("Failed to open user database {}: {}", config.database_url, e);
        std::io::Error::other(e.to_string())
    })?;
    let user_store = web::Data::new(user_store);
    let jwt_service = JwtService::new(&config.jwt_secret);
    let auth_middleware = AuthMiddleware::new(jwt_service.clone());
    let jwt_service = web::Data::new(jwt_service);

    let static_dir = config.static_dir.clone();
    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(inference_service.clone())
            .app_data(user_store.clone())
            .app_data(jwt_service.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone(), auth_middleware.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
