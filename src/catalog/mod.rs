pub mod model;
pub mod routes;

pub use model::{CatalogError, Vehicle, VehicleCatalog};
