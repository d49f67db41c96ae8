use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read vehicle catalog: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to parse vehicle catalog: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("vehicle catalog is empty")]
    Empty,
    #[error("duplicate vehicle id in catalog: {0}")]
    DuplicateId(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Vehicle {
    #[schema(example = "gol_2017")]
    pub id: String,
    #[schema(example = "Gol 2017 – Branca – PSW9J70")]
    pub nome_exibicao: String,
    pub marca: String,
    pub modelo: String,
    pub ano: String,
    pub cor: String,
    pub placa: String,
    pub categoria: String,
    #[schema(example = "45.000,00")]
    pub valor_avaliacao: String,
}

/// Read-only table of rentable vehicles, built once at startup.
#[derive(Debug, Clone)]
pub struct VehicleCatalog {
    vehicles: Vec<Vehicle>,
}

impl VehicleCatalog {
    pub fn new(vehicles: Vec<Vehicle>) -> Result<Self, CatalogError> {
        if vehicles.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, vehicle) in vehicles.iter().enumerate() {
            if vehicles[..i].iter().any(|v| v.id == vehicle.id) {
                return Err(CatalogError::DuplicateId(vehicle.id.clone()));
            }
        }
        Ok(Self { vehicles })
    }

    /// Load a catalog from a JSON array of vehicles.
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(CatalogError::Io)?;
        let vehicles: Vec<Vehicle> = serde_json::from_str(&raw).map_err(CatalogError::Parse)?;
        Self::new(vehicles)
    }

    pub fn get(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

impl Default for VehicleCatalog {
    fn default() -> Self {
        Self {
            vehicles: vec![
                vehicle(
                    "prisma_2019",
                    "Prisma 2019 – Prata – PLM7A56",
                    ["CHEVROLET", "PRISMA", "2019", "PRATA", "PLM7A56", "SEDAN"],
                    "50.000,00",
                ),
                vehicle(
                    "polo_2026",
                    "Polo 2026 – Prata – RSR9I01",
                    ["VOLKSWAGEN", "POLO", "2026", "PRATA", "RSR9I01", "HATCH"],
                    "90.000,00",
                ),
                vehicle(
                    "gol_2017",
                    "Gol 2017 – Branca – PSW9J70",
                    ["VOLKSWAGEN", "GOL", "2017", "BRANCA", "PSW9J70", "PARTICULAR"],
                    "45.000,00",
                ),
            ],
        }
    }
}

// [marca, modelo, ano, cor, placa, categoria]
fn vehicle(id: &str, nome_exibicao: &str, fields: [&str; 6], valor_avaliacao: &str) -> Vehicle {
    let [marca, modelo, ano, cor, placa, categoria] = fields;
    Vehicle {
        id: id.to_string(),
        nome_exibicao: nome_exibicao.to_string(),
        marca: marca.to_string(),
        modelo: modelo.to_string(),
        ano: ano.to_string(),
        cor: cor.to_string(),
        placa: placa.to_string(),
        categoria: categoria.to_string(),
        valor_avaliacao: valor_avaliacao.to_string(),
    }
}
