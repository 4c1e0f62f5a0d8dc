use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    labsense::cli::run().await
}
