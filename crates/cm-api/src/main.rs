#[tokio::main]
async fn main() {
    if let Err(err) = cm_api::run().await {
        eprintln!("cm-api failed to start: {err}");
        std::process::exit(1);
    }
}
