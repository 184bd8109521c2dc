mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sitemaps")]
#[command(about = "Paginated XML sitemaps for documents and taxonomy terms", long_about = None)]
struct Cli {
    /// Log at info level regardless of RUST_LOG
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the sitemap index and every sitemap page to a directory
    Build {
        #[arg(long, short, default_value = "sitemaps.toml")]
        config: PathBuf,

        #[arg(long, short, default_value = "dist")]
        output: PathBuf,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        clean: bool,
    },
    /// Print the slug of every sitemap page in index order
    List {
        #[arg(long, short, default_value = "sitemaps.toml")]
        config: PathBuf,
    },
    /// Serve sitemaps over HTTP, reloading content when it changes
    Serve {
        #[arg(long, short, default_value = "sitemaps.toml")]
        config: PathBuf,

        #[arg(long, default_value = "3000")]
        port: u16,

        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Build {
            config,
            output,
            base_url,
            clean,
        } => commands::build_sitemaps(&config, &output, base_url.as_deref(), clean),
        Commands::List { config } => commands::list_sitemaps(&config),
        Commands::Serve {
            config,
            port,
            base_url,
        } => commands::serve_sitemaps(&config, port, base_url.as_deref()).await,
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
