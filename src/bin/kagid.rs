use clap::Parser;

#[tokio::main]
async fn main() {
    use kagi::daemon::{run, DaemonOptions};

    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let opts = DaemonOptions::parse();
    if let Err(e) = run(opts).await {
        tracing::error!(error = %e, "kagid failed");
        std::process::exit(1);
    }
}
