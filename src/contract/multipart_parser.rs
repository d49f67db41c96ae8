use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use futures::StreamExt;
use log::warn;

use crate::contract::models::ContractSubmission;
use crate::storage::UploadedFile;
use crate::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data in field '{0}'")]
    Utf8Error(String),
}

impl MultipartParseError {
    /// Whether the client sent something malformed, as opposed to a read failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::FieldError(_) | Self::Utf8Error(_))
    }
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        if error.is_client_error() {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string()))
        } else {
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string()))
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    /// Collect the rental form fields and the `arquivo_cnh` / `arquivo_comprovante`
    /// uploads. Unknown fields are ignored.
    pub async fn parse_contract_multipart(
        mut multipart: Multipart,
    ) -> Result<ContractSubmission, MultipartParseError> {
        let mut submission = ContractSubmission::default();

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let content_disposition = field.content_disposition().ok_or_else(|| {
                MultipartParseError::FieldError("Content disposition not found".to_string())
            })?;
            let name = content_disposition
                .get_name()
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?
                .to_string();
            let filename = content_disposition.get_filename().map(|s| s.to_string());

            let data = read_field(&mut field).await?;

            match name.as_str() {
                "arquivo_cnh" | "arquivo_comprovante" => {
                    let upload = filename.map(|filename| UploadedFile::new(filename, data));
                    if name == "arquivo_cnh" {
                        submission.cnh = upload;
                    } else {
                        submission.comprovante = upload;
                    }
                }
                _ => {
                    let value = String::from_utf8(data)
                        .map_err(|_| MultipartParseError::Utf8Error(name.clone()))?;
                    if !submission.request.set_field(&name, value) {
                        warn!("Ignoring unknown form field '{}'", name);
                    }
                }
            }
        }

        Ok(submission)
    }
}

async fn read_field(field: &mut Field) -> Result<Vec<u8>, MultipartParseError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let data_chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        buffer.extend_from_slice(&data_chunk);
    }
    Ok(buffer)
}
