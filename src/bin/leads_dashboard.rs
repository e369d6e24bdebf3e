use clap::Parser;

/// Browse leads from the leads API and triage their status.
#[derive(Parser, Debug)]
#[command(name = "leads-dashboard", version)]
struct Args {
    /// Print the edited records as JSON on exit when anything changed.
    #[arg(long)]
    print_edits: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = leaddesk_lib::run_dashboard(args.print_edits).await {
        tracing::error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
