#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(command) = std::env::args().nth(1) else {
        eprintln!(
            "usage: manage <check-surveys|fix-sort-orders|generate-reports|reset-raters|seed-demo>"
        );
        std::process::exit(2);
    };

    if let Err(e) = feedback360::run_command(&command).await {
        eprintln!("feedback360-manage fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
