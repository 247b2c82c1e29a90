//! Endless Advanture terminal player.
//!
//! A line-oriented interface over the engine: every screen is printed as
//! text with numbered actions, and the player answers with a number or a
//! `#command`.
//!
//! ```bash
//! cargo run -p endless -- --data data --save-dir saves --lang en --name Ayu
//! ```
//!
//! Logs go to stderr and are controlled with `RUST_LOG` (default `warn`).

mod headless;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = headless::parse_config_from_args(&args);
    headless::run_headless(config).await?;
    Ok(())
}

fn print_help() {
    println!("Endless Advanture - text RPG");
    println!();
    println!("USAGE:");
    println!("  endless [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --data <dir>      Content directory (env ENDLESS_DATA_DIR, default ./data)");
    println!("  --save-dir <dir>  Save directory (env ENDLESS_SAVE_DIR, default ./saves)");
    println!("  --lang <id|en>    Switch language on start");
    println!("  --name <name>     Name for new characters");
    println!("  -h, --help        Show this help");
}
