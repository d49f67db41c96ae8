use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use log::{error, info};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::contract::models::{ContractOutcome, RentalRequest};
use crate::contract::multipart_parser::MultipartParser;
use crate::contract::pipeline::PipelineError;
use crate::{AppState, ErrorResponse};

/// Multipart body accepted by `POST /api/contracts` and `POST /`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContractUploadRequest {
    #[serde(flatten)]
    #[allow(unused)]
    pub fields: RentalRequest,
    /// Driver's licence scan (PDF, JPG or PNG).
    #[schema(value_type = Option<String>, format = Binary)]
    #[allow(unused)]
    pub arquivo_cnh: Option<Vec<u8>>,
    /// Proof of address (PDF, JPG or PNG).
    #[schema(value_type = Option<String>, format = Binary)]
    #[allow(unused)]
    pub arquivo_comprovante: Option<Vec<u8>>,
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn error_page(state: &AppState, status: StatusCode, message: &str) -> HttpResponse {
    match state.views.error(status.as_u16(), message) {
        Ok(body) => html(status, body),
        Err(e) => {
            error!("Failed to render error page: {}", e);
            HttpResponse::build(status).body(message.to_string())
        }
    }
}

fn pipeline_error_json(e: &PipelineError) -> HttpResponse {
    let status = e.status_code();
    let body = if status == StatusCode::BAD_REQUEST {
        ErrorResponse::bad_request(&e.to_string())
    } else {
        ErrorResponse::internal_error(&e.to_string())
    };
    HttpResponse::build(status).json(body)
}

pub async fn show_form(state: web::Data<AppState>) -> impl Responder {
    match state.views.form(state.catalog.vehicles()) {
        Ok(body) => html(StatusCode::OK, body),
        Err(e) => {
            error!("Failed to render form: {}", e);
            error_page(&state, StatusCode::INTERNAL_SERVER_ERROR, "Falha ao exibir o formulário")
        }
    }
}

pub async fn submit_form(payload: Multipart, state: web::Data<AppState>) -> impl Responder {
    info!("Executing submit_form handler");

    let submission = match MultipartParser::parse_contract_multipart(payload).await {
        Ok(submission) => submission,
        Err(e) => {
            error!("Failed to parse contract form: {}", e);
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            return error_page(&state, status, &e.to_string());
        }
    };

    match state.pipeline.execute(submission).await {
        Ok(outcome) => match state.views.result(&outcome) {
            Ok(body) => html(StatusCode::OK, body),
            Err(e) => {
                error!("Failed to render result page: {}", e);
                error_page(
                    &state,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Falha ao exibir o resultado",
                )
            }
        },
        Err(e) => {
            error!("Contract pipeline failed: {}", e);
            error_page(&state, e.status_code(), &e.to_string())
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Contract Service",
    post,
    path = "/contracts",
    request_body(content = inline(ContractUploadRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Contract generated; check status_envio for email delivery", body = ContractOutcome),
        (status = 400, description = "Invalid dates, unknown vehicle or malformed form", body = ErrorResponse),
        (status = 500, description = "Document generation failed", body = ErrorResponse)
    )
)]
pub async fn submit_contract(payload: Multipart, state: web::Data<AppState>) -> impl Responder {
    info!("Executing submit_contract handler");

    let submission = match MultipartParser::parse_contract_multipart(payload).await {
        Ok(submission) => submission,
        Err(e) => {
            error!("Failed to parse contract form: {}", e);
            return HttpResponse::from(e);
        }
    };

    match state.pipeline.execute(submission).await {
        Ok(outcome) => {
            info!(
                "Contract {} generated (status_envio={})",
                outcome.documento, outcome.status_envio
            );
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => {
            error!("Contract pipeline failed: {}", e);
            pipeline_error_json(&e)
        }
    }
}

/// Browser pages, mounted at the root.
pub fn pages(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(show_form))
            .route(web::post().to(submit_form)),
    );
}

/// JSON API, mounted under `/api`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/contracts").route(web::post().to(submit_contract)));
}
