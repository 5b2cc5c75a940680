use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use annokit::{build_runtime, init_logging, summarize, AnnotationDocument, Config};

#[derive(Parser)]
#[command(name = "annokit", version, about = "Inspect and validate annotation documents")]
struct Cli {
    /// Config file (.toml or .json); defaults to the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print shape counts per kind and per frame
    Inspect {
        document: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fail if any collection repeats a shape id
    Check { document: PathBuf },
    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let mut config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    init_logging(&config.logging)?;
    tracing::debug!(version = annokit::VERSION, build = annokit::BUILD_DATE, "starting");

    match cli.command {
        Command::Inspect { document, json } => {
            let (mut session, _client, _bus) = build_runtime(&config);
            let doc = AnnotationDocument::load_from_file(&document)
                .with_context(|| format!("reading {}", document.display()))?;
            let summary = summarize(doc, &mut session)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("{} (format {})", summary.file_id, summary.version);
            for (kind, count) in &summary.by_kind {
                println!("  {:<10} {count}", kind.to_string());
            }
            println!("  {:<10} {}", "total", summary.total);
            if !summary.by_frame.is_empty() {
                println!("frames:");
                for (frame, count) in &summary.by_frame {
                    println!("  {frame:>6}  {count}");
                }
            }
            if summary.dropped > 0 {
                println!("dropped {} shape(s) with repeated ids", summary.dropped);
            }
        }
        Command::Check { document } => {
            config.session.strict_load = true;
            let (mut session, _client, _bus) = build_runtime(&config);
            let doc = AnnotationDocument::load_from_file(&document)
                .with_context(|| format!("reading {}", document.display()))?;
            let summary = summarize(doc, &mut session)
                .with_context(|| format!("checking {}", document.display()))?;
            println!("{}: {} shapes, ok", summary.file_id, summary.total);
        }
        Command::Config => {
            println!("# {}", config_path.display());
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
