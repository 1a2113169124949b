// Binary entry point for delve
// This is a thin wrapper that delegates to the library implementation

#[tokio::main]
async fn main() {
    match delve_core::shell::run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("delve fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}
