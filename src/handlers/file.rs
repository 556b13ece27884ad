use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{FileListResponse, UploadResponse, UserIdentity};
use crate::AppState;

/// List the caller's files, newest first
/// GET /api/v1/files
pub async fn list_files(
    State(state): State<AppState>,
    Extension(current_user): Extension<UserIdentity>,
) -> Result<Json<ApiResponse<FileListResponse>>> {
    let files = state.storage.list(&current_user).await?;
    Ok(Json(ApiResponse::success(FileListResponse { files })))
}

/// Upload and encrypt a file
/// POST /api/v1/files
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<UserIdentity>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        if upload.is_some() {
            return Err(AppError::BadRequest("Only one file per upload".to_string()));
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("No file name provided".to_string()))?;
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            });

        let data = field.bytes().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to read file: {}", e))
        })?;

        upload = Some((file_name, content_type, data.to_vec()));
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let record = state
        .storage
        .upload(&current_user, &file_name, &content_type, &data)
        .await?;

    Ok(Json(ApiResponse::success(UploadResponse::from(record))))
}

/// Download a decrypted file
/// GET /api/v1/files/:id
pub async fn download_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> Result<Response> {
    let file = state.storage.download(&current_user, &id).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.media_type)
        .header(header::CONTENT_LENGTH, file.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&file.original_name),
        )
        .body(Body::from(file.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Delete a file
/// DELETE /api/v1/files/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(current_user): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.storage.delete(&current_user, &id).await?;
    Ok(Json(ApiResponse::<()>::success_message("File deleted")))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 encoded name
fn content_disposition(original_name: &str) -> String {
    let fallback_name: String = original_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded_name = urlencoding::encode(original_name);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_name, encoded_name
    )
}
