#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    studio_site_server::run().await
}
