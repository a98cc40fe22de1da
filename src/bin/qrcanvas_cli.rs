//! QR Canvas CLI - render QR symbols to files or stdout
//!
//! Commands: writers, plan, render, print
//! JSON goes to stdout, logs to stderr
//! Returns 2 on validation failure, 1 on any other error

use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use qrcanvas_core::{
    compute_job_hash, sha256_hex, Color, Configuration, ConfigurationSpec, ErrorCorrectionLevel,
    LabelAlignment, QrError, RenderPipeline, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "qrcanvas-cli")]
#[command(about = "QR Canvas CLI - deterministic QR symbol rendering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered writers
    Writers,

    /// Print the computed render plan
    Plan {
        #[command(flatten)]
        options: RenderOptions,
    },

    /// Render to a file
    Render {
        #[command(flatten)]
        options: RenderOptions,

        /// Output path; its extension selects the writer unless --writer is given
        #[arg(short, long)]
        output: PathBuf,

        /// Writer key (binary, data-uri, eps, png, svg)
        #[arg(short, long)]
        writer: Option<String>,
    },

    /// Render to stdout
    Print {
        #[command(flatten)]
        options: RenderOptions,

        #[arg(short, long, default_value = "svg")]
        writer: String,
    },
}

#[derive(Args)]
struct RenderOptions {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    text: Option<String>,

    #[arg(long)]
    size: Option<u32>,

    #[arg(long)]
    quiet_zone: Option<u32>,

    /// Hex color, e.g. #000000
    #[arg(long)]
    foreground: Option<Color>,

    #[arg(long)]
    background: Option<Color>,

    #[arg(long)]
    encoding: Option<String>,

    /// low, medium, quartile or high
    #[arg(short = 'e', long)]
    error_correction: Option<ErrorCorrectionLevel>,

    #[arg(long)]
    label: Option<String>,

    /// Defaults to the bundled DejaVu Sans
    #[arg(long)]
    label_font: Option<PathBuf>,

    #[arg(long)]
    label_font_size: Option<u32>,

    /// left, center or right
    #[arg(long)]
    label_alignment: Option<LabelAlignment>,

    #[arg(long)]
    logo: Option<PathBuf>,

    #[arg(long)]
    logo_size: Option<u32>,

    /// Re-read the rendered symbol and compare it with the source grid
    #[arg(long)]
    validate: bool,
}

impl RenderOptions {
    fn to_spec(&self) -> ConfigurationSpec {
        ConfigurationSpec {
            text: self.text.clone(),
            size: self.size,
            quiet_zone: self.quiet_zone,
            foreground_color: self.foreground,
            background_color: self.background,
            encoding: self.encoding.clone(),
            error_correction_level: self.error_correction,
            label: self.label.clone(),
            label_font_size: self.label_font_size,
            label_font_path: self.label_font.clone(),
            label_alignment: self.label_alignment,
            label_margin: None,
            logo_path: self.logo.clone(),
            logo_size: self.logo_size,
            validate_result: self.validate.then_some(true),
        }
    }

    fn configuration(&self) -> Result<Configuration, QrError> {
        let mut config = match &self.config {
            Some(path) => Configuration::load(path)?,
            None => Configuration::default(),
        };
        config.apply(&self.to_spec())?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = RenderPipeline::new();

    match run(&pipeline, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let output = serde_json::json!({
                "success": false,
                "error": e.to_string(),
            });
            println!("{}", output);
            match e {
                QrError::Validation { .. } => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(pipeline: &RenderPipeline, command: Commands) -> Result<(), QrError> {
    match command {
        Commands::Writers => {
            let writers: Vec<_> = pipeline
                .registry()
                .entries()
                .map(|w| {
                    serde_json::json!({
                        "key": w.key(),
                        "content_type": w.content_type(),
                        "extensions": w.supported_extensions(),
                        "capabilities": w.capabilities(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&writers)?);
        }

        Commands::Plan { options } => {
            let config = options.configuration()?;
            let grid = pipeline.encode(&config)?;
            let plan = pipeline.plan(&config, &grid)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }

        Commands::Render { options, output, writer } => {
            let config = options.configuration()?;
            let key = writer.map(|name| pipeline.registry().key_named(&name)).transpose()?;
            let selected = match key {
                Some(key) => key,
                None => pipeline.writer_by_path(&output)?.key(),
            };
            let bytes = pipeline.write_file(&config, &output, key)?;
            let manifest = serde_json::json!({
                "success": true,
                "path": output,
                "writer": selected,
                "content_type": pipeline.content_type(selected)?,
                "bytes": bytes.len(),
                "sha256": sha256_hex(&bytes),
                "job_hash": compute_job_hash(selected.as_str(), &config, ENGINE_VERSION)?,
            });
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }

        Commands::Print { options, writer } => {
            let config = options.configuration()?;
            let key = pipeline.registry().key_named(&writer)?;
            let bytes = pipeline.write_string(&config, key)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
