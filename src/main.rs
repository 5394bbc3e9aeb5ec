#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = feedback360::run().await {
        eprintln!("feedback360 fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
