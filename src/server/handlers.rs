//! Request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::application::REPORT_FILENAME;
use crate::domain::{PatientRecord, PredictionResponse, ReportRequest};

use super::error::{ApiError, Result};
use super::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Heart Disease Prediction API",
        "status": "running",
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PatientRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Json(patient) = payload?;
    patient.validate().map_err(ApiError::Validation)?;

    let response = state.predictor.handle_prediction(patient).await?;
    Ok(Json(response))
}

pub async fn report(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ReportRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload?;
    request.patient.validate().map_err(ApiError::Validation)?;
    if !request.risk_probability.is_finite() {
        return Err(ApiError::Validation(vec![
            "risk_probability: must be a finite number".to_string(),
        ]));
    }

    let pdf = state.reports.render(&request);
    tracing::info!(
        risk_level = %request.risk_level,
        bytes = pdf.len(),
        "Generated assessment report"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={REPORT_FILENAME}"),
            ),
        ],
        pdf,
    ))
}
