#[tokio::main]
async fn main() {
    if let Err(e) = turn_arena_be::start_server().await {
        eprintln!("Startup error: {e}");
        std::process::exit(1);
    }
}
