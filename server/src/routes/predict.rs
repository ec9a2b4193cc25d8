//! Upload and prediction endpoints
//!
//! `POST /` renders an HTML page, `POST /api/predict` returns JSON. Both read
//! the multipart field `file` and run the same pipeline.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Html,
    Json,
};
use minijinja::context;
use serde::Serialize;
use tracing::{error, info, warn};

use tomato_leaf::inference::ClassPercentage;
use tomato_leaf::{LeafError, PredictionResult, StoredUpload};

use crate::state::SharedState;

/// Multipart field holding the image
const FILE_FIELD: &str = "file";

/// JSON body returned by `POST /api/predict`
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub label: String,
    pub index: usize,
    pub confidence: f32,
    pub image_url: String,
    pub predictions: Vec<ClassPercentage>,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET / - Upload form
pub async fn upload_form(
    State(state): State<SharedState>,
) -> Result<Html<String>, (StatusCode, String)> {
    state
        .templates
        .get_template("upload.html")
        .and_then(|t| t.render(context! {}))
        .map(Html)
        .map_err(render_error)
}

/// POST / - Classify an upload and render the result page
pub async fn predict_form(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Html<String>, (StatusCode, String)> {
    let (upload, result) = handle_upload(&state, multipart)
        .await
        .map_err(|e| (status_for(&e), user_message(&e)))?;

    state
        .templates
        .get_template("result.html")
        .and_then(|t| {
            t.render(context! {
                label => result.top_label,
                image_path => upload.url,
                predictions => result.per_class,
                description => result.description,
            })
        })
        .map(Html)
        .map_err(render_error)
}

/// POST /api/predict - Classify an upload and return JSON
pub async fn predict_json(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<PredictionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (upload, result) = handle_upload(&state, multipart).await.map_err(|e| {
        (
            status_for(&e),
            Json(ErrorResponse {
                error: user_message(&e),
            }),
        )
    })?;

    Ok(Json(PredictionResponse {
        label: result.top_label,
        index: result.top_index,
        confidence: result.confidence,
        image_url: upload.url,
        predictions: result.per_class,
        description: result.description,
    }))
}

/// Read the upload, store it and classify it
async fn handle_upload(
    state: &SharedState,
    multipart: Multipart,
) -> Result<(StoredUpload, PredictionResult), LeafError> {
    let outcome = match read_file_field(multipart).await {
        Ok((file_name, bytes)) => {
            let state = Arc::clone(state);
            // Disk IO, decoding and inference are blocking work
            tokio::task::spawn_blocking(move || -> Result<_, LeafError> {
                let upload = state.uploads.accept(file_name.as_deref(), &bytes)?;
                let result = state.pipeline.classify_bytes(&bytes)?;
                Ok((upload, result))
            })
            .await
            .map_err(|e| LeafError::Inference(format!("prediction task failed: {}", e)))
            .and_then(|r| r)
        }
        Err(e) => Err(e),
    };

    match &outcome {
        Ok((upload, result)) => info!(
            "Classified {} as {} ({})",
            upload.file_name,
            result.top_label,
            tomato_leaf::utils::format_percentage(result.confidence)
        ),
        Err(e) if e.is_user_error() => warn!("Rejected upload: {}", e),
        Err(e) => error!("Failed to process upload: {}", e),
    }

    outcome
}

/// Pull the `file` field out of the multipart body
async fn read_file_field(
    mut multipart: Multipart,
) -> Result<(Option<String>, Vec<u8>), LeafError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(LeafError::Validation("no file uploaded".to_string()))
}

fn multipart_error(err: MultipartError) -> LeafError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        LeafError::TooLarge(err.body_text())
    } else {
        LeafError::Validation(format!("malformed upload: {}", err))
    }
}

fn status_for(err: &LeafError) -> StatusCode {
    match err {
        LeafError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        e if e.is_user_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn user_message(err: &LeafError) -> String {
    if err.is_user_error() {
        err.to_string()
    } else {
        format!("Failed to process image: {}", err)
    }
}

fn render_error(err: minijinja::Error) -> (StatusCode, String) {
    error!("Failed to render template: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to render page".to_string(),
    )
}
