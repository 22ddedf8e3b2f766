//! Bulk import upload and template download handlers

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::import::{self, ImportReport};
use crate::services::ImportService;
use crate::AppState;
use shared::import::{
    CUSTOMER_TEMPLATE_HEADERS, CUSTOMER_TEMPLATE_SAMPLE, PRODUCT_TEMPLATE_HEADERS,
    PRODUCT_TEMPLATE_SAMPLE,
};
use shared::{Action, Resource};

/// Uploaded `file` part: original file name and contents
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Failed to read file: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read file: {}", e)))?;

        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::ValidationError("No file uploaded".to_string()))
}

fn report_status(report: &ImportReport) -> StatusCode {
    if report.is_complete() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    }
}

fn csv_attachment(file_name: &'static str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
}

/// Import products from a CSV or Excel upload
pub async fn import_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ImportReport>)> {
    current_user.0.require(Resource::Product, Action::Import)?;

    let upload = read_upload(&mut multipart).await?;
    let table = import::read_table(&upload.file_name, &upload.bytes)?;

    let service = ImportService::new(state.db.clone());
    let (report, events) = service
        .import_products(&table, &state.config.inventory.default_branch_name)
        .await?;
    state.notifications.publish_all(events);

    Ok((report_status(&report), Json(report)))
}

/// Import customers from a CSV upload
pub async fn import_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ImportReport>)> {
    current_user.0.require(Resource::Customer, Action::Import)?;

    let upload = read_upload(&mut multipart).await?;
    let table = import::read_csv(&upload.bytes)
        .map_err(|e| AppError::ValidationError(format!("Failed to read file: {}", e)))?;

    let service = ImportService::new(state.db);
    let report = service.import_customers(&table).await?;

    Ok((report_status(&report), Json(report)))
}

pub async fn product_import_template(current_user: CurrentUser) -> AppResult<impl IntoResponse> {
    current_user.0.require(Resource::Product, Action::View)?;
    let body = import::template_csv(&PRODUCT_TEMPLATE_HEADERS, &PRODUCT_TEMPLATE_SAMPLE)?;
    Ok(csv_attachment("product_import_template.csv", body))
}

pub async fn customer_import_template(current_user: CurrentUser) -> AppResult<impl IntoResponse> {
    current_user.0.require(Resource::Customer, Action::View)?;
    let body = import::template_csv(&CUSTOMER_TEMPLATE_HEADERS, &CUSTOMER_TEMPLATE_SAMPLE)?;
    Ok(csv_attachment("customer_import_template.csv", body))
}
