#[tokio::main]
async fn main() {
    if let Err(e) = tinytoken::run().await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
