use clap::Parser;
use leaddesk_lib::interfaces::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = leaddesk_lib::run_loader_cli(cli).await {
        tracing::error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
