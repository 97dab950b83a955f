#[tokio::main]
async fn main() -> anyhow::Result<()> {
    item_catalog_lib::run().await
}
