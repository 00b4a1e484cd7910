use actix_web::{web, HttpResponse, Result};
use log::{error, info, warn};
use shared::Credentials;

use super::jwt::JwtService;
use super::middleware::AuthenticatedUser;
use super::models::{AuthResponse, AuthUser};
use super::user_store::{UserStore, UserStoreError};

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn signup(
    credentials: web::Json<Credentials>,
    user_store: web::Data<UserStore>,
) -> Result<HttpResponse> {
    match user_store
        .signup(&credentials.username, &credentials.password)
        .await
    {
        Ok(user) => Ok(HttpResponse::Created().json(AuthUser::from(user))),
        Err(e @ UserStoreError::UsernameTaken) => {
            info!("Signup rejected, username taken: {}", credentials.username);
            Ok(HttpResponse::Conflict().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
        Err(e @ UserStoreError::MissingField) => Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        })),
        Err(e) => Ok(store_failure(e)),
    }
}

fn store_failure(e: UserStoreError) -> HttpResponse {
    error!("User store failure: {}", e);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Internal server error".to_string(),
    })
}

pub async fn login(
    credentials: web::Json<Credentials>,
    user_store: web::Data<UserStore>,
    jwt_service: web::Data<JwtService>,
) -> Result<HttpResponse> {
    let authenticated = match user_store
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(authenticated) => authenticated,
        Err(e) => return Ok(store_failure(e)),
    };
    let Some(user) = authenticated else {
        warn!("Failed login for username: {}", credentials.username);
        return Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Invalid username or password.".to_string(),
        }));
    };

    let auth_user = AuthUser::from(user);
    match jwt_service.generate_token(&auth_user) {
        Ok(token) => {
            info!("User logged in: {}", auth_user.username);
            Ok(HttpResponse::Ok().json(AuthResponse {
                token,
                user: auth_user,
            }))
        }
        Err(e) => {
            error!("Failed to issue session token for {}: {:?}", auth_user.username, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to create session".to_string(),
            }))
        }
    }
}

pub async fn logout(
    user: AuthenticatedUser,
    jwt_service: web::Data<JwtService>,
) -> Result<HttpResponse> {
    jwt_service.revoke(&user.claims);
    info!("User logged out: {}", user.username);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn me(user: AuthenticatedUser, user_store: web::Data<UserStore>) -> Result<HttpResponse> {
    match user_store.get_user_by_id(user.id).await {
        Ok(Some(user_data)) => Ok(HttpResponse::Ok().json(AuthUser::from(user_data))),
        Err(e) => Ok(store_failure(e)),
        Ok(None) => {
            warn!("Session for {} refers to an unknown user", user.id);
            Ok(HttpResponse::NotFound().json(ErrorResponse {
                error: "User not found".to_string(),
            }))
        }
    }
}
