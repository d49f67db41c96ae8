use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Compress, Logger};
use actix_web::{http::header, web, App, HttpResponse, HttpServer, Responder};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod catalog;
pub mod config;
pub mod contract;
pub mod documents;
pub mod notifier;
pub mod state;
pub mod storage;

pub use crate::state::AppState;

use crate::catalog::VehicleCatalog;
use crate::config::AppConfig;
use crate::contract::{ContractPipeline, PipelineSettings};
use crate::documents::SofficeConverter;
use crate::notifier::SmtpNotifier;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(ErrorResponse::not_found("Resource not found"))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health,
        crate::catalog::routes::list_vehicles,
        crate::contract::handlers::submit_contract,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            catalog::Vehicle,
            contract::RentalRequest,
            contract::ContractOutcome,
            contract::handlers::ContractUploadRequest,
        )
    ),
    tags(
        (name = "Contract Service", description = "Rental contract generation."),
        (name = "Vehicle Catalog", description = "Rentable vehicles."),
        (name = "Health", description = "Liveness check.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Local server")
    )
)]
pub struct ApiDoc;

/// Routes shared by the server and the integration tests.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .configure(contract::handlers::pages)
        .service(
            web::scope("/api")
                .configure(catalog::routes::config)
                .configure(contract::handlers::config),
        )
        .default_service(web::route().to(not_found));
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<VehicleCatalog> {
    match &config.vehicle_catalog_path {
        Some(path) => {
            let catalog = VehicleCatalog::from_json_file(path)
                .with_context(|| format!("loading vehicle catalog from {}", path.display()))?;
            log::info!("Loaded {} vehicle(s) from {}", catalog.len(), path.display());
            Ok(catalog)
        }
        None => Ok(VehicleCatalog::default()),
    }
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("reading configuration")?;
    let catalog = Arc::new(load_catalog(&config)?);
    let notifier = SmtpNotifier::from_config(&config.smtp).context("configuring SMTP")?;
    let pipeline = ContractPipeline::new(
        PipelineSettings::from_config(&config),
        catalog,
        Arc::new(SofficeConverter::new(config.soffice_bin.clone())),
        Arc::new(notifier),
    );
    let app_state = web::Data::new(AppState::new(pipeline).context("compiling page templates")?);

    let prometheus = PrometheusMetricsBuilder::new("rental_contract_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow!("failed to create Prometheus metrics middleware: {}", e))?;

    log::info!(
        "Starting server at http://{}:{} (delivery mode: {:?}, template: {})",
        config.bind_addr,
        config.port,
        config.delivery_mode,
        config.template_path.display()
    );

    let allowed_origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(app_state.clone())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .configure(configure_app)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
