use crate::models::CalculationResponse;
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

/// Multipart field carrying the drawing.
pub const DRAWING_FIELD: &str = "drawing";

struct Drawing {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

/// `POST /calculate`: interpret an uploaded drawing.
pub async fn calculate(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart.map_err(|e| {
        AppError::BadRequest(format!("Error parsing form: {}", e.body_text()))
    })?;

    let drawing = read_drawing(&mut multipart).await?;

    tracing::info!(
        file_name = %drawing.file_name,
        size = drawing.data.len(),
        content_type = %drawing.content_type,
        "Received file"
    );

    let interpreter = state.interpreter.get().await.map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Error initializing inference client: {}", e))
    })?;

    let results = interpreter
        .process_drawing(&drawing.data)
        .await
        .map_err(|e| {
            tracing::error!(
                file_name = %drawing.file_name,
                size = drawing.data.len(),
                content_type = %drawing.content_type,
                error = %e,
                "Error processing drawing"
            );
            AppError::InternalError(anyhow::Error::new(e).context("Error processing drawing"))
        })?;

    let response = CalculationResponse::from(results);
    let body = serde_json::to_vec(&response).map_err(|e| {
        tracing::error!(error = %e, "Error encoding JSON response");
        AppError::InternalError(anyhow::Error::new(e).context("Error encoding response"))
    })?;

    tracing::info!(results = response.len(), "Sending response");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}

/// Non-POST methods on `/calculate`.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Read the whole form and keep the first file part named `drawing`. Parts
/// without a filename are plain text fields and never count as the drawing.
async fn read_drawing(multipart: &mut Multipart) -> Result<Drawing, AppError> {
    let mut drawing = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        if drawing.is_some() || field.name() != Some(DRAWING_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field.bytes().await.map_err(|e| {
            tracing::error!(file_name = %file_name, error = %e, "Error reading file");
            if e.status().is_client_error() {
                form_error(e)
            } else {
                AppError::InternalError(anyhow::anyhow!("Error reading file: {}", e.body_text()))
            }
        })?;

        drawing = Some(Drawing {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    drawing.ok_or_else(|| {
        AppError::BadRequest(format!(
            "Error retrieving file: no '{}' file in form",
            DRAWING_FIELD
        ))
    })
}

fn form_error(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Error parsing form: {}", err.body_text()))
}
