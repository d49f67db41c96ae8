//! The contract pipeline: validate, store uploads, fill the template,
//! optionally convert and merge into one PDF, then email the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::web;
use thiserror::Error;

use crate::catalog::{Vehicle, VehicleCatalog};
use crate::config::{AppConfig, DeliveryMode};
use crate::contract::models::{
    build_render_context, ContractOutcome, ContractSubmission, DeliveryStatus, RentalPeriod,
    RentalRequest, UserInputError,
};
use crate::documents::common::{contract_base_name, format_br_date, timestamp_now};
use crate::documents::{
    merge_pdfs, prepare_attachment, ConversionError, DocumentConverter, DocxFiller, FillError,
    ImageError, MergeError,
};
use crate::notifier::{AttachmentPolicy, Notifier, NotifyError, OutgoingEmail};
use crate::storage::{StorageError, UploadStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    UserInput(#[from] UserInputError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Fill(#[from] FillError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("background task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub template_strict: bool,
    pub delivery_mode: DeliveryMode,
    pub recipient: Option<String>,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
            template_path: config.template_path.clone(),
            template_strict: config.template_strict,
            delivery_mode: config.delivery_mode,
            recipient: config.smtp.recipient.clone(),
        }
    }
}

/// Files produced for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocuments {
    pub docx: PathBuf,
    pub cnh: Option<PathBuf>,
    pub comprovante: Option<PathBuf>,
    /// Merged PDF, only in [`DeliveryMode::Pdf`].
    pub final_pdf: Option<PathBuf>,
}

#[derive(Clone)]
pub struct ContractPipeline {
    settings: Arc<PipelineSettings>,
    catalog: Arc<VehicleCatalog>,
    converter: Arc<dyn DocumentConverter>,
    notifier: Arc<dyn Notifier>,
}

impl ContractPipeline {
    pub fn new(
        settings: PipelineSettings,
        catalog: Arc<VehicleCatalog>,
        converter: Arc<dyn DocumentConverter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            catalog,
            converter,
            notifier,
        }
    }

    pub fn catalog(&self) -> Arc<VehicleCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Run a submission to completion. Only a failed email is recovered;
    /// every other failure aborts with a [`PipelineError`].
    pub async fn execute(
        &self,
        submission: ContractSubmission,
    ) -> Result<ContractOutcome, PipelineError> {
        let request = submission.request.clone();
        let period = RentalPeriod::parse(&request.data_inicio, &request.data_fim)?;
        let vehicle = self
            .catalog
            .get(&request.carro)
            .cloned()
            .ok_or_else(|| UserInputError::UnknownVehicle(request.carro.clone()))?;
        log::info!(
            "Processing contract for '{}' ({}, {} day(s))",
            request.locatario_nome,
            vehicle.id,
            period.days
        );

        let pipeline = self.clone();
        let doc_vehicle = vehicle.clone();
        let documents =
            web::block(move || pipeline.prepare_documents(submission, &doc_vehicle, &period))
                .await??;

        let delivery = self.deliver(&request, &vehicle, &period, &documents).await;

        Ok(ContractOutcome {
            status_envio: delivery.label().to_string(),
            erro_envio: delivery.error().map(str::to_string),
            locatario_nome: request.locatario_nome,
            carro_nome: vehicle.nome_exibicao,
            data_inicio: format_br_date(period.start),
            data_fim: format_br_date(period.end),
            dias_locacao: period.days,
            email_destino: self.settings.recipient.clone(),
            modo_entrega: self.settings.delivery_mode,
            documento: file_name(&documents.docx),
            documento_final: documents.final_pdf.as_deref().map(file_name),
        })
    }

    /// The blocking part of the pipeline: everything that touches the filesystem
    /// or spawns a process.
    pub fn prepare_documents(
        &self,
        submission: ContractSubmission,
        vehicle: &Vehicle,
        period: &RentalPeriod,
    ) -> Result<PreparedDocuments, PipelineError> {
        let stamp = timestamp_now();
        let settings = &self.settings;

        let store = UploadStore::new(&settings.upload_dir);
        let cnh = store.save(submission.cnh, &stamp, "cnh")?;
        let comprovante = store.save(submission.comprovante, &stamp, "comprovante")?;

        let context = build_render_context(&submission.request, vehicle, period);
        let base = contract_base_name(&submission.request.locatario_nome, &stamp);
        let docx = DocxFiller::new(&settings.template_path, &settings.output_dir)
            .strict(settings.template_strict)
            .fill(&context, &base)?;

        let final_pdf = match settings.delivery_mode {
            DeliveryMode::Docx => None,
            DeliveryMode::Pdf => Some(self.assemble_pdf(
                &docx,
                &base,
                cnh.as_deref(),
                comprovante.as_deref(),
            )?),
        };

        Ok(PreparedDocuments {
            docx,
            cnh,
            comprovante,
            final_pdf,
        })
    }

    fn assemble_pdf(
        &self,
        docx: &Path,
        base: &str,
        cnh: Option<&Path>,
        comprovante: Option<&Path>,
    ) -> Result<PathBuf, PipelineError> {
        let out_dir = &self.settings.output_dir;
        let contract_pdf = self
            .converter
            .convert(docx, out_dir, &format!("{}.pdf", base))?;

        let mut inputs = vec![Some(contract_pdf)];
        for upload in [cnh, comprovante] {
            let prepared = match upload {
                Some(path) => prepare_attachment(path, out_dir)?,
                None => None,
            };
            inputs.push(prepared);
        }

        let output = out_dir.join(format!("{}_final.pdf", base));
        let report = merge_pdfs(&inputs, &output)?;
        Ok(report.output)
    }

    async fn deliver(
        &self,
        request: &RentalRequest,
        vehicle: &Vehicle,
        period: &RentalPeriod,
        documents: &PreparedDocuments,
    ) -> DeliveryStatus {
        let Some(to) = self.settings.recipient.clone() else {
            log::warn!("No recipient configured; contract was generated but not sent");
            return DeliveryStatus::Failed(NotifyError::MissingRecipient.to_string());
        };

        let (attachments, policy) = match &documents.final_pdf {
            Some(final_pdf) => (vec![final_pdf.clone()], AttachmentPolicy::Require),
            None => {
                let mut paths = vec![documents.docx.clone()];
                paths.extend(documents.cnh.clone());
                paths.extend(documents.comprovante.clone());
                (paths, AttachmentPolicy::SkipMissing)
            }
        };

        let email = OutgoingEmail {
            subject: format!("Pré-contrato de locação - {}", request.locatario_nome),
            body: email_body(request, vehicle, period, self.settings.delivery_mode),
            to,
            attachments,
            policy,
        };

        match self.notifier.send(email).await {
            Ok(()) => DeliveryStatus::Sent,
            Err(e) => {
                log::error!("Failed to send contract email: {}", e);
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }
}

pub fn email_body(
    request: &RentalRequest,
    vehicle: &Vehicle,
    period: &RentalPeriod,
    mode: DeliveryMode,
) -> String {
    let attachments = match mode {
        DeliveryMode::Docx => {
            "- Contrato em DOCX para conferência e assinatura.\n\
             - CNH do cliente.\n\
             - Comprovante de endereço do cliente.\n"
        }
        DeliveryMode::Pdf => {
            "- Contrato em PDF único, com a CNH e o comprovante de endereço do cliente ao final.\n"
        }
    };

    format!(
        "Foi gerada uma pré-solicitação de contrato de locação.\n\n\
         Locatário: {}\n\
         CPF: {}\n\
         Carro: {}\n\
         Período: {} até {}\n\
         Quantidade de dias: {}\n\n\
         Anexos:\n{}",
        request.locatario_nome,
        request.locatario_cpf,
        vehicle.nome_exibicao,
        format_br_date(period.start),
        format_br_date(period.end),
        period.days,
        attachments
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
