#[tokio::main]
async fn main() {
    bridge_api::start_server().await;
}
