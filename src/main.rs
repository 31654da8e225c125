#[tokio::main]
async fn main() -> std::io::Result<()> {
    orbit_server::run_with_config().await
}
