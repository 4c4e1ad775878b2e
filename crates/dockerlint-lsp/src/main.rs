#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && (args[1] == "--version" || args[1] == "-V") {
        println!("dockerlint-lsp {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    dockerlint_lsp::init_logging();

    if let Err(e) = dockerlint_lsp::start_server().await {
        eprintln!("LSP server error: {e}");
        std::process::exit(1);
    }
}
