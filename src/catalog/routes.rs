use actix_web::{web, HttpResponse, Responder};

use crate::catalog::model::Vehicle;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/vehicles",
    tag = "Vehicle Catalog",
    responses(
        (status = 200, description = "All rentable vehicles", body = Vec<Vehicle>)
    )
)]
pub async fn list_vehicles(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.catalog.vehicles())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/vehicles").route(web::get().to(list_vehicles)));
}
