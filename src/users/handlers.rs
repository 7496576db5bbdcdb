use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{extractors::AuthUser, jwt::JwtKeys, password},
    error::ApiError,
    state::AppState,
    users::{
        dto::{MessageResponse, ProfileResponse, SignInRequest, SignInResponse, UpdateNameRequest},
        repo_types::{User, UserProfile},
        services, validate,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(sign_in))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/update-photo", post(update_photo))
        .route("/update-name", post(update_name))
        .route("/delete-photo", delete(delete_photo))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("{e}"))
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

#[derive(Default)]
struct RegisterForm {
    name: String,
    email: String,
    password: String,
    photo: Option<(Bytes, String)>,
}

async fn read_register_form(mp: &mut Multipart) -> Result<RegisterForm, ApiError> {
    let mut form = RegisterForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        match field.name().map(|s| s.to_string()).as_deref() {
            Some("name") => form.name = field.text().await.map_err(internal)?,
            Some("email") => form.email = field.text().await.map_err(internal)?,
            Some("password") => form.password = field.text().await.map_err(internal)?,
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field.bytes().await.map_err(internal)?;
                form.photo = Some((data, content_type));
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /api/register (multipart: name, email, password, optional photo)
#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let form = read_register_form(&mut mp).await?;

    let errors = validate::validate_registration(&form.name, &form.email, &form.password);
    if !errors.is_empty() {
        warn!(count = errors.len(), "registration rejected by validation");
        return Err(ApiError::Validation(errors));
    }

    // Explicit duplicate check; the unique index catches the race below.
    if User::find_by_email(&state.db, &form.email).await?.is_some() {
        warn!(email = %form.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    // Hash before any persistence so a hashing failure leaves no row.
    let hash = password::hash_password(&form.password)?;

    let photo = match form.photo {
        Some((body, content_type)) => {
            Some(services::store_photo(&state, body, &content_type).await?)
        }
        None => None,
    };

    let user = match User::create(&state.db, &form.name, &form.email, &hash, photo.as_deref()).await
    {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %form.email, "duplicate email on insert");
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::Internal(e));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(MessageResponse {
        success: true,
        message: "User registered successfully".into(),
    }))
}

/// POST /api/signin
#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let errors = validate::validate_sign_in(&payload.email, &payload.password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Unknown email and wrong password must be indistinguishable to the
    // caller.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "sign-in unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let ok = password::verify_password(&payload.password, &user.password_hash)?;
    if !ok {
        warn!(user_id = %user.id, "sign-in invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, "user signed in");
    Ok(Json(SignInResponse {
        success: true,
        message: "User signed in successfully".into(),
        token,
    }))
}

/// POST /api/logout — stateless acknowledgment; bearer tokens simply age
/// out.
#[instrument]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".into(),
    })
}

/// GET /api/profile
#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = UserProfile::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "profile requested for missing user");
            ApiError::NotFound("User not found".into())
        })?;
    Ok(Json(ProfileResponse::from_profile(&state.config, profile)))
}

/// POST /api/update-photo (multipart: photo)
#[instrument(skip(state, mp))]
pub async fn update_photo(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    mut mp: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut upload: Option<(Bytes, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("photo") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field.bytes().await.map_err(internal)?;
            upload = Some((data, content_type));
        }
    }
    let (body, content_type) =
        upload.ok_or_else(|| ApiError::Validation(vec!["Photo file is required".into()]))?;

    let current = UserProfile::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let filename = services::store_photo(&state, body, &content_type).await?;

    let updated = UserProfile::update_photo(&state.db, claims.sub, &filename)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // Old file cleanup runs only once the row points at the new photo; a
    // crash in between orphans a file, which is accepted.
    if let Some(old) = current.photo.as_deref() {
        services::remove_photo(&state, old).await;
    }

    info!(user_id = %claims.sub, photo = %filename, "photo updated");
    Ok(Json(ProfileResponse::from_profile(&state.config, updated)))
}

/// POST /api/update-name
#[instrument(skip(state, payload))]
pub async fn update_name(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateNameRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let errors = validate::validate_name(&payload.name);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let updated = UserProfile::update_name(&state.db, claims.sub, &payload.name)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %claims.sub, "name updated");
    Ok(Json(ProfileResponse::from_profile(&state.config, updated)))
}

/// DELETE /api/delete-photo — clears the reference, then best-effort
/// removes the file.
#[instrument(skip(state))]
pub async fn delete_photo(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let current = UserProfile::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let updated = UserProfile::clear_photo(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if let Some(old) = current.photo.as_deref() {
        services::remove_photo(&state, old).await;
    }

    info!(user_id = %claims.sub, "photo deleted");
    Ok(Json(ProfileResponse::from_profile(&state.config, updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_response_serialization() {
        let response = MessageResponse {
            success: true,
            message: "User registered successfully".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("User registered successfully"));
    }
}
