#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    rental_contract_server::run().await
}
