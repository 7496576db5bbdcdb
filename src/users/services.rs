use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::AppState;

/// Write an uploaded photo to storage under a fresh server-generated
/// name; callers persist the returned filename.
pub async fn store_photo(
    st: &AppState,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let filename = format!("{}.{}", Uuid::new_v4(), ext);
    st.storage
        .put_object(&filename, body)
        .await
        .with_context(|| format!("put_object {}", filename))?;
    Ok(filename)
}

/// Best-effort removal of a previously stored photo; a failure is logged
/// and never fails the surrounding request.
pub async fn remove_photo(st: &AppState, filename: &str) {
    if let Err(e) = st.storage.delete_object(filename).await {
        warn!(error = %e, filename = %filename, "failed to delete old photo");
    }
}

/// Resolve a stored filename to the URL clients can fetch it from.
pub fn photo_url(config: &AppConfig, filename: &str) -> String {
    format!(
        "{}/uploads/{}",
        config.public_base_url.trim_end_matches('/'),
        filename
    )
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
