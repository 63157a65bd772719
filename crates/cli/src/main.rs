use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linebridge")]
#[command(about = "LINE to Gemini webhook bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server. Secrets come from LINE_ACCESS_TOKEN, LINE_SECRET and GEMINI_API_KEY (or the config file).
    Serve {
        /// Config file path (default: LINEBRIDGE_CONFIG_PATH or ~/.linebridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the x-line-signature value for a file's raw bytes (for testing the webhook with curl).
    Sign {
        /// Config file path (default: LINEBRIDGE_CONFIG_PATH or ~/.linebridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Request body file
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("linebridge {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Sign { config, file }) => {
            if let Err(e) = run_sign(config, file) {
                log::error!("sign failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    let credentials = lib::config::resolve_credentials(&config)?;
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config, credentials).await
}

fn run_sign(
    config_path: Option<std::path::PathBuf>,
    file: std::path::PathBuf,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let config = lib::config::load_config(config_path)?;
    let secret = lib::config::resolve_line_secret(&config)
        .with_context(|| format!("{} is not set", lib::config::LINE_SECRET_ENV))?;
    let body = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    println!("{}", lib::channels::signature::sign(&body, &secret));
    Ok(())
}
