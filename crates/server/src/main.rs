use std::net::TcpListener;
use std::path::PathBuf;

use pagetest_server::{router, AppState, ServerConfig};
use tokio::signal;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Graceful start: check if a port is available
fn check_port_available(bind: &str, port: u16) -> bool {
    TcpListener::bind(format!("{bind}:{port}")).is_ok()
}

/// Graceful start: find an available port starting from the default
fn find_available_port(bind: &str, start: u16) -> Option<u16> {
    (start..start + 10).find(|&port| check_port_available(bind, port))
}

fn print_help() {
    println!("pagetest-server - local HTTP test server for text tests");
    println!();
    println!("USAGE:");
    println!("    pagetest-server [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -p, --port PORT       Port to listen on (default 8000)");
    println!("    -d, --directory DIR   Directory served under /static/ (default .)");
    println!("    --bind ADDR           Bind address (default 127.0.0.1)");
    println!("    -h, --help            Print help information");
    println!("    -v, --version         Print version");
    println!();
    println!("CONFIG:");
    println!("    ./pagetest-server.toml (port, bind, static_dir)");
    println!();
    println!("Stop a running server with Ctrl+C or GET /shutdown.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging (tracing)
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let mut config = ServerConfig::load();

    // Manual flag loop; CLI overrides the config file
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("pagetest-server {VERSION}");
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "-p" | "--port" if i + 1 < args.len() => {
                config.port = args[i + 1]
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid port: {}", args[i + 1]))?;
                i += 2;
            }
            "-d" | "--directory" if i + 1 < args.len() => {
                config.static_dir = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                config.bind = args[i + 1].clone();
                i += 2;
            }
            other => {
                anyhow::bail!("unknown argument: {other} (try --help)");
            }
        }
    }

    if !config.static_dir.is_dir() {
        eprintln!(
            "  [warn]   Static directory {} does not exist; /static/ will 404",
            config.static_dir.display()
        );
    }

    // Port availability check with fallback scan
    let port = if check_port_available(&config.bind, config.port) {
        config.port
    } else {
        eprintln!(
            "  [warn]   Port {} in use, finding alternative...",
            config.port
        );
        match find_available_port(&config.bind, config.port + 1) {
            Some(p) => {
                eprintln!("  [check]  Using port {p}");
                p
            }
            None => anyhow::bail!(
                "no available ports in range {}-{}",
                config.port,
                config.port + 10
            ),
        }
    };

    let state = AppState::new();
    let http_shutdown = state.shutdown_signal();
    let app = router(state, &config.static_dir);

    let addr = format!("{}:{}", config.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    eprintln!("  [http]   Serving at http://{addr}/");
    eprintln!(
        "  [static] Serving static files from {}",
        config.static_dir.display()
    );
    eprintln!("  [hint]   Press Ctrl+C or GET /shutdown to stop");

    let shutdown_signal = async move {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
            () = http_shutdown.notified() => {},
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    eprintln!("Goodbye");
    Ok(())
}
