use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::users::repo_types::UserProfile;
use crate::users::services::photo_url;

/// Request body for sign-in. Missing fields default to empty strings so
/// the validator reports them instead of a serde rejection.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    #[serde(default)]
    pub name: String,
}

/// Generic acknowledgment body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Returned after a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
}

/// Public profile view; the stored filename is resolved to a
/// fully-qualified URL here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
}

impl ProfileResponse {
    pub fn from_profile(config: &AppConfig, profile: UserProfile) -> Self {
        let photo_url = profile.photo.as_deref().map(|f| photo_url(config, f));
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            photo_url,
        }
    }
}
