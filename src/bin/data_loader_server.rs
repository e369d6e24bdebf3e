#[actix_web::main]
async fn main() {
    if let Err(err) = leaddesk_lib::run_loader_server().await {
        tracing::error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
