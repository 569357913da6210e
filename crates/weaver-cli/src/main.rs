use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weaver_core::{GenerationRouter, ReportWorkflow, RouterConfig};

#[derive(Parser)]
#[command(name = "weaver")]
#[command(version)]
#[command(about = "Weaver — multi-provider health report generator")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full report workflow
    Run {
        /// Directory receiving the report artifacts
        #[arg(short, long, default_value = "outputs")]
        output_dir: PathBuf,
    },

    /// Send a one-shot prompt through the router
    Ask {
        /// The prompt to send
        prompt: String,

        /// Optional system instruction
        #[arg(short, long)]
        system: Option<String>,

        /// Wait for the full response instead of streaming
        #[arg(long)]
        no_stream: bool,
    },

    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Run { output_dir } => cmd_run(&output_dir).await,
        Commands::Ask {
            prompt,
            system,
            no_stream,
        } => cmd_ask(&prompt, system.as_deref(), no_stream).await,
        Commands::Config => cmd_config(),
    }
}

async fn cmd_run(output_dir: &PathBuf) -> Result<()> {
    let config = RouterConfig::from_env();
    let router = GenerationRouter::from_config(&config);
    if router.provider_count() == 0 {
        info!("No provider credentials found; artifacts will contain error notices");
    }

    ReportWorkflow::new(router, output_dir)
        .with_max_tokens(config.max_tokens)
        .with_streaming(config.streaming)
        .run()
        .await
}

async fn cmd_ask(prompt: &str, system: Option<&str>, no_stream: bool) -> Result<()> {
    let config = RouterConfig::from_env();
    let router = GenerationRouter::from_config(&config);

    let mut request = config.base_request(prompt);
    if let Some(system) = system {
        request = request.with_system(system);
    }
    if no_stream {
        request = request.with_streaming(false);
    }

    let mut fragments = router.generate(request);
    while let Some(fragment) = fragments.next().await {
        print!("{}", fragment);
        let _ = std::io::stdout().flush();
    }
    println!();
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = RouterConfig::from_env();
    println!("{:#?}", config);
    Ok(())
}
