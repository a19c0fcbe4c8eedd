use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use super::demo::demo_app;
use crate::config::AppConfig;
use crate::docs::{assemble, DocsConfig};
use crate::infer::InferenceMode;

/// Command-line interface of the routegate demo.
#[derive(Parser, Debug)]
#[command(name = "routegate-demo", version)]
#[command(about = "Serve or document the routegate demo API", long_about = None)]
pub struct Cli {
    /// YAML configuration file; `ROUTEGATE_*` variables override it.
    #[arg(short, long, global = true, env = "ROUTEGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the demo API until SIGINT/SIGTERM
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Print the assembled OpenAPI document
    Openapi {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured response-shape inference
        #[arg(long, value_parser = parse_inference)]
        inference: Option<InferenceMode>,

        /// Extra documentation sources (glob patterns)
        #[arg(long = "source")]
        sources: Vec<String>,
    },
}

fn parse_inference(raw: &str) -> Result<InferenceMode, String> {
    match raw {
        "off" => Ok(InferenceMode::Off),
        "source_text" | "source-text" => Ok(InferenceMode::SourceText),
        "sample_invocation" | "sample-invocation" => Ok(InferenceMode::SampleInvocation),
        other => Err(format!(
            "unknown inference mode {other:?} (off, source_text, sample_invocation)"
        )),
    }
}

/// Load the configuration named on the command line, then apply the environment.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    Ok(config.apply_env())
}

/// Run a parsed command and return the process exit status.
pub fn run_cli(cli: Cli) -> anyhow::Result<i32> {
    let mut config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Serve { addr } => {
            let app = demo_app(config);
            app.listen(addr.as_str(), || info!("Demo server closed"))
        }
        Commands::Openapi {
            output,
            inference,
            sources,
        } => {
            if let Some(mode) = inference {
                config.docs.inference = mode;
            }
            let app = demo_app(config);
            let docs = DocsConfig {
                title: "routegate demo".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                sources,
                ..DocsConfig::default()
            };
            let json = assemble(app.entries(), &docs)
                .to_json_pretty()
                .context("failed to serialize OpenAPI document")?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
            Ok(0)
        }
    }
}
