//! Identification endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use flora_common::api::{IdentificationResult, IdentifyRequest};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::SubmittedImage;
use crate::AppState;

/// POST /identify
///
/// Body `{ "image": "<base64 or data URL>" }`. Returns 400 for an undecodable
/// image and 500 when neither local nor cloud identification succeeded.
pub async fn identify(
    State(state): State<AppState>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> ApiResult<Json<IdentificationResult>> {
    let Json(request) = payload?;
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("identify", request_id = %request_id);

    async move {
        let payload = request.image;
        let image = tokio::task::spawn_blocking(move || SubmittedImage::decode(&payload))
            .await
            .map_err(|e| ApiError::Internal(format!("image decode task failed: {}", e)))?
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected image");
                e
            })?;
        let (width, height) = image.dimensions();
        tracing::info!(width, height, "Image received");

        let result = state.pipeline.identify(&image).await?;
        tracing::info!(
            name = %result.name,
            confidence = result.confidence,
            "Identification complete"
        );
        Ok::<_, ApiError>(Json(result))
    }
    .instrument(span)
    .await
}

/// Build identification routes
pub fn identify_routes() -> Router<AppState> {
    Router::new().route("/identify", post(identify))
}
