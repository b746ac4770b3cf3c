//! Thin CLI entry point; all logic lives in `protato::cli`.

#[tokio::main]
async fn main() {
    let code = protato::cli::run(std::env::args()).await;
    std::process::exit(code);
}
