use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use log::{info, warn};
use serde::Serialize;

use super::error::{ApiError, ApiResult, ErrorResponse};
use super::storage::{remove_quietly, write_or_remove};
use super::AppState;
use crate::convert_pdf_to_pptx;

const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub message: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `POST /convert`: multipart upload with a `file` field.
///
/// The uploaded PDF is removed once the conversion finishes, successfully
/// or not. The deck stays in the temp directory until it is downloaded.
pub async fn convert_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ConvertResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let reservation = state.store.reserve(file_name.as_deref());
    info!(
        "received {} ({} bytes) as {}",
        file_name.as_deref().unwrap_or("<unnamed>"),
        data.len(),
        reservation.input.display()
    );
    write_or_remove(&reservation.input, &data).await?;

    let input = reservation.input.clone();
    let output = reservation.output.clone();
    let result =
        tokio::task::spawn_blocking(move || convert_pdf_to_pptx(&input, &output)).await;

    remove_quietly(&reservation.input).await;

    match result {
        Ok(Ok(report)) => {
            if report.skipped_count() > 0 {
                warn!(
                    "{}: {} elements skipped",
                    reservation.output_name,
                    report.skipped_count()
                );
            }
            Ok(Json(ConvertResponse {
                message: "Conversion successful".to_string(),
                download_url: format!("/download-result/{}", reservation.output_name),
            }))
        }
        Ok(Err(e)) => {
            remove_quietly(&reservation.output).await;
            Err(e.into())
        }
        Err(e) => {
            remove_quietly(&reservation.output).await;
            Err(ApiError::Internal(format!("conversion task failed: {}", e)))
        }
    }
}

/// `GET /download-result/{filename}`: one-shot download of a converted deck.
///
/// Absent or unsafe names answer `{"error": "File not found"}` with status 200.
pub async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let Some(claimed) = state.store.claim(&filename).await else {
        return Ok(Json(ErrorResponse {
            error: "File not found".to_string(),
        })
        .into_response());
    };

    let read = tokio::fs::read(&claimed).await;
    // the claimed copy goes away whether or not the read worked
    tokio::spawn(async move { remove_quietly(&claimed).await });
    let bytes = read?;

    info!("serving {} ({} bytes)", filename, bytes.len());
    Ok((
        [
            (header::CONTENT_TYPE, PPTX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
