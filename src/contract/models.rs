use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::catalog::Vehicle;
use crate::config::DeliveryMode;
use crate::documents::common::format_br_date;
use crate::documents::RenderContext;
use crate::storage::UploadedFile;

const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// Problems with what the renter submitted. Always answered with 400.
#[derive(Debug, Error, PartialEq)]
pub enum UserInputError {
    #[error("invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
    #[error("unknown vehicle: '{0}'")]
    UnknownVehicle(String),
}

/// The contract form as submitted. Missing text fields are empty strings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, ToSchema)]
pub struct RentalRequest {
    #[schema(example = "Maria da Silva")]
    pub locatario_nome: String,
    #[schema(example = "brasileira")]
    pub locatario_nacionalidade: String,
    pub locatario_estado_civil: String,
    pub locatario_profissao: String,
    pub locatario_rg: String,
    #[schema(example = "123.456.789-00")]
    pub locatario_cpf: String,
    pub locatario_cnh: String,
    pub locatario_rua: String,
    pub locatario_numero: String,
    pub locatario_bairro: String,
    pub locatario_cep: String,
    pub locatario_cidade: String,
    #[schema(example = "SP")]
    pub locatario_uf: String,
    /// Vehicle id from the catalog.
    #[schema(example = "gol_2017")]
    pub carro: String,
    #[schema(example = "2025-01-10")]
    pub data_inicio: String,
    #[schema(example = "2025-01-15")]
    pub data_fim: String,
}

impl RentalRequest {
    /// Assign a form field by name. Returns `false` for unknown names.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "locatario_nome" => &mut self.locatario_nome,
            "locatario_nacionalidade" => &mut self.locatario_nacionalidade,
            "locatario_estado_civil" => &mut self.locatario_estado_civil,
            "locatario_profissao" => &mut self.locatario_profissao,
            "locatario_rg" => &mut self.locatario_rg,
            "locatario_cpf" => &mut self.locatario_cpf,
            "locatario_cnh" => &mut self.locatario_cnh,
            "locatario_rua" => &mut self.locatario_rua,
            "locatario_numero" => &mut self.locatario_numero,
            "locatario_bairro" => &mut self.locatario_bairro,
            "locatario_cep" => &mut self.locatario_cep,
            "locatario_cidade" => &mut self.locatario_cidade,
            "locatario_uf" => &mut self.locatario_uf,
            "carro" => &mut self.carro,
            "data_inicio" => &mut self.data_inicio,
            "data_fim" => &mut self.data_fim,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Everything received in one form post: the fields and the two optional uploads.
#[derive(Debug, Clone, Default)]
pub struct ContractSubmission {
    pub request: RentalRequest,
    pub cnh: Option<UploadedFile>,
    pub comprovante: Option<UploadedFile>,
}

/// A rental period that always spans at least one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
}

impl RentalPeriod {
    pub fn parse(start: &str, end: &str) -> Result<Self, UserInputError> {
        let start = parse_date("data_inicio", start)?;
        let end = parse_date("data_fim", end)?;
        Self::from_dates(start, end)
    }

    /// An end on or before the start becomes a one-day rental. A start on the
    /// last representable day has no next day and is rejected.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, UserInputError> {
        if end > start {
            return Ok(Self {
                start,
                end,
                days: (end - start).num_days(),
            });
        }
        let next_day = start.succ_opt().ok_or_else(|| UserInputError::InvalidDate {
            field: "data_inicio",
            value: start.format(DATE_INPUT_FORMAT).to_string(),
        })?;
        Ok(Self {
            start,
            end: next_day,
            days: 1,
        })
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, UserInputError> {
    NaiveDate::parse_from_str(value.trim(), DATE_INPUT_FORMAT).map_err(|_| {
        UserInputError::InvalidDate {
            field,
            value: value.to_string(),
        }
    })
}

pub fn build_render_context(
    request: &RentalRequest,
    vehicle: &Vehicle,
    period: &RentalPeriod,
) -> RenderContext {
    let mut ctx = RenderContext::new();

    ctx.insert_upper("locatario_nome", &request.locatario_nome);
    ctx.insert_upper("locatario_nacionalidade", &request.locatario_nacionalidade);
    ctx.insert_upper("locatario_estado_civil", &request.locatario_estado_civil);
    ctx.insert_upper("locatario_profissao", &request.locatario_profissao);
    ctx.insert("locatario_rg", request.locatario_rg.as_str());
    ctx.insert("locatario_cpf", request.locatario_cpf.as_str());
    ctx.insert("locatario_cnh", request.locatario_cnh.as_str());

    ctx.insert_upper("locatario_rua", &request.locatario_rua);
    ctx.insert("locatario_numero", request.locatario_numero.as_str());
    ctx.insert_upper("locatario_bairro", &request.locatario_bairro);
    ctx.insert("locatario_cep", request.locatario_cep.as_str());
    ctx.insert_upper("locatario_cidade", &request.locatario_cidade);
    ctx.insert_upper("locatario_uf", &request.locatario_uf);

    ctx.insert_upper("carro_marca", &vehicle.marca);
    ctx.insert_upper("carro_modelo", &vehicle.modelo);
    ctx.insert("carro_ano", vehicle.ano.as_str());
    ctx.insert_upper("carro_cor", &vehicle.cor);
    ctx.insert_upper("carro_placa", &vehicle.placa);
    ctx.insert_upper("carro_categoria", &vehicle.categoria);
    ctx.insert("carro_valor_avaliacao", vehicle.valor_avaliacao.as_str());

    ctx.insert("dias_locacao", period.days.to_string());
    ctx.insert("data_inicio", format_br_date(period.start));
    ctx.insert("data_fim", format_br_date(period.end));

    ctx
}

/// Whether the contract email went out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed(String),
}

impl DeliveryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent => "ok",
            Self::Failed(_) => "erro",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Sent => None,
            Self::Failed(message) => Some(message),
        }
    }
}

/// Result of a processed submission, shown on the confirmation page.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ContractOutcome {
    /// `ok` or `erro`.
    #[schema(example = "ok")]
    pub status_envio: String,
    pub erro_envio: Option<String>,
    pub locatario_nome: String,
    #[schema(example = "Gol 2017 – Branca – PSW9J70")]
    pub carro_nome: String,
    #[schema(example = "10/01/2025")]
    pub data_inicio: String,
    #[schema(example = "15/01/2025")]
    pub data_fim: String,
    #[schema(example = 5)]
    pub dias_locacao: i64,
    pub email_destino: Option<String>,
    #[schema(value_type = String, example = "docx")]
    pub modo_entrega: DeliveryMode,
    /// File name of the filled `.docx`.
    pub documento: String,
    /// File name of the merged PDF, when delivering as PDF.
    pub documento_final: Option<String>,
}
