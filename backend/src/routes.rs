use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use log::info;
use serde_json::json;
use std::path::PathBuf;

use crate::auth;
use crate::auth::middleware::{AuthMiddleware, AuthenticatedUser};
use crate::inference::error::InferenceError;
use crate::inference::preprocess::RawUpload;
use crate::inference::service::InferenceService;

pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    static_dir: PathBuf,
    auth_middleware: AuthMiddleware,
) {
    cfg.service(web::resource("/auth/signup").route(web::post().to(auth::routes::signup)))
        .service(web::resource("/auth/login").route(web::post().to(auth::routes::login)))
        .service(
            web::scope("/auth")
                .wrap(auth_middleware.clone())
                .route("/logout", web::post().to(auth::routes::logout))
                .route("/me", web::get().to(auth::routes::me)),
        )
        .service(
            web::scope("/api")
                .wrap(auth_middleware)
                .route("/predict", web::post().to(handle_predict)),
        )
        .service(web::resource("/status").route(web::get().to(model_status)))
        .service(Files::new("/static", static_dir));
}

/// Reads the multipart field named `file`. A request without one yields an
/// empty upload.
async fn read_upload(payload: &mut Multipart) -> Result<RawUpload, InferenceError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| InferenceError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(|mime| mime.to_string());
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| InferenceError::Upload(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
        }

        return Ok(RawUpload {
            content_type,
            file_name,
            ..RawUpload::new(bytes)
        });
    }
    Ok(RawUpload::default())
}

async fn handle_predict(
    user: AuthenticatedUser,
    service: web::Data<InferenceService>,
    mut payload: Multipart,
) -> Result<HttpResponse, InferenceError> {
    let upload = read_upload(&mut payload).await?;
    let file_name = upload.file_name.clone().unwrap_or_default();

    let service = service.into_inner();
    let outcome = web::block(move || service.infer(upload))
        .await
        .map_err(|e| InferenceError::Backend(e.to_string()))??;

    info!(
        "Prediction for {} on '{}': {} ({:.3})",
        user.username, file_name, outcome.label, outcome.confidence
    );
    Ok(HttpResponse::Ok().json(outcome.into_response()))
}

async fn model_status(service: web::Data<InferenceService>) -> HttpResponse {
    match service.classifier().unavailable_reason() {
        None => HttpResponse::Ok().json(json!({ "model": "loaded" })),
        Some(reason) => HttpResponse::ServiceUnavailable().json(json!({
            "model": "unavailable",
            "reason": reason
        })),
    }
}
