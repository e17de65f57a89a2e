use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "twelvefactor",
    about = "twelvefactor — run twelve-factor apps on container services",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the task definitions and services an app.toml converges to.
    ///
    /// Runs the app against an in-memory ECS cluster; nothing is sent to
    /// a real backend.
    Plan {
        /// Path to the app manifest
        #[arg(short, long, default_value = "app.toml")]
        manifest: String,
        /// Path to an ecs.toml with cluster / delimiter settings
        #[arg(short, long)]
        config: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Build the service name for an app process.
    Encode {
        app: String,
        process: String,
        #[arg(short, long, default_value = twelvefactor_core::DEFAULT_DELIMITER)]
        delimiter: String,
    },
    /// Split a service name into app id and process name.
    Decode {
        name: String,
        #[arg(short, long, default_value = twelvefactor_core::DEFAULT_DELIMITER)]
        delimiter: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("twelvefactor=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            manifest,
            config,
            format,
        } => commands::plan::plan(&manifest, config.as_deref(), &format).await,
        Commands::Encode {
            app,
            process,
            delimiter,
        } => commands::names::encode(&app, &process, &delimiter),
        Commands::Decode { name, delimiter } => commands::names::decode(&name, &delimiter),
    }
}
