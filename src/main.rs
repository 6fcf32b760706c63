//! texforge CLI
//!
//! Command-line interface for exporting scene textures and inspecting PNGs.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use texforge_export::textures::DEFAULT_INLINE_MAX_SIZE;
use texforge_export::{
    ExportOptions, JsonExportOptions, JsonExporter, SceneManifest, TextureExporter,
};
use texforge_parsers::logging::{init_with_config, TracingConfig};
use texforge_parsers::png::{self, PngAlphaInfo};
use texforge_parsers::{Parser as _, PngParser};

/// texforge - texture export for real-time engines
#[derive(Parser)]
#[command(name = "texforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export the images of a scene manifest
    Export(ExportArgs),

    /// Show chunk layout and alpha verdict of PNG files
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene manifest (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Destination directory
    #[arg(short, long)]
    output: PathBuf,

    /// Copy sources verbatim and skip alpha inspection
    #[arg(long)]
    skip_conversion: bool,

    /// Longest side, in pixels, of outputs embedded as data URIs
    #[arg(long, default_value_t = DEFAULT_INLINE_MAX_SIZE)]
    inline_max_size: u32,

    /// JPEG quality (1-100), overrides the manifest
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: Option<u8>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,

    /// Wrap the manifest with counts
    #[arg(long)]
    metadata: bool,

    /// Print the manifest instead of writing textures.json
    #[arg(long)]
    stdout: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// PNG files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn setup_logging(verbosity: u8) {
    init_with_config(TracingConfig::from_verbosity(verbosity));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Inspect(args) => cmd_inspect(&args, cli.format),
    }
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    info!("Loading scene: {:?}", args.scene);

    let mut manifest =
        SceneManifest::from_file(&args.scene).context("Failed to load scene manifest")?;
    if args.jpeg_quality.is_some() {
        manifest.jpeg_quality = args.jpeg_quality;
    }

    let options = ExportOptions {
        skip_texture_conversion: args.skip_conversion || manifest.skip_texture_conversion,
        inline_max_size: args.inline_max_size,
    };

    let base_dir = args.scene.parent().unwrap_or_else(|| Path::new("."));
    let mut used = manifest
        .into_used_data(base_dir)
        .context("Failed to load scene images")?;

    let records = TextureExporter::with_options(options)
        .export(&args.output, &mut used)
        .with_context(|| format!("Failed to export textures to {}", args.output.display()))?;

    let json = JsonExporter::with_options(JsonExportOptions {
        pretty: !args.compact,
        include_metadata: args.metadata,
    });

    if args.stdout {
        json.export_to_writer(&records, io::stdout().lock())
            .context("Failed to write manifest")?;
        return Ok(());
    }

    json.export_to_dir(&records, &args.output)
        .context("Failed to write manifest")?;

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "output": args.output,
                "images": records.len(),
                "entries": records.iter().map(|r| r.entry_count()).sum::<usize>(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("Exported {} images to {}", records.len(), args.output.display());
            for record in &records {
                let formats: Vec<_> = record.formats.keys().map(String::as_str).collect();
                println!(
                    "  {:<32} {:>2} entries  [{}]",
                    record.name,
                    record.entry_count(),
                    formats.join(", ")
                );
            }
        }
    }

    Ok(())
}

fn cmd_inspect(args: &InspectArgs, format: OutputFormat) -> Result<()> {
    let parser = PngParser::new();
    let mut reports = Vec::with_capacity(args.files.len());
    for path in &args.files {
        if !path.exists() {
            bail!("File not found: {:?}", path);
        }
        if !has_extension(path, parser.extensions()) {
            warn!("{} has no {} extension, inspecting anyway", path.display(), parser.name());
        }
        let info = png::inspect(path)?;
        reports.push((path, info));
    }

    match format {
        OutputFormat::Json => {
            let list: Vec<_> = reports.iter().map(|(path, info)| info_json(path, info)).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for (path, info) in &reports {
                print_info(&mut out, path, info)?;
            }
        }
    }

    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

fn info_json(path: &Path, info: &PngAlphaInfo) -> serde_json::Value {
    let chunks: Vec<_> = info
        .chunks
        .iter()
        .map(|c| serde_json::json!({ "tag": c.tag_str(), "length": c.length, "offset": c.offset }))
        .collect();

    serde_json::json!({
        "path": path,
        "width": info.width,
        "height": info.height,
        "color_type": info.color_type.map(|c| format!("{c:?}")),
        "has_alpha_channel": info.has_alpha_channel,
        "has_transparency_chunk": info.has_transparency_chunk,
        "has_alpha": info.has_alpha(),
        "chunks": chunks,
    })
}

fn print_info(out: &mut impl Write, path: &Path, info: &PngAlphaInfo) -> io::Result<()> {
    writeln!(out, "{}", path.display())?;
    if let (Some(width), Some(height)) = (info.width, info.height) {
        writeln!(out, "  Size:       {width}x{height}")?;
    }
    if let Some(color_type) = info.color_type {
        writeln!(out, "  Color type: {color_type:?}")?;
    }
    writeln!(out, "  Alpha:      {}", if info.has_alpha() { "yes" } else { "no" })?;
    writeln!(out, "  Chunks:")?;
    for chunk in &info.chunks {
        writeln!(out, "    {} {:>10} bytes @ {}", chunk.tag_str(), chunk.length, chunk.offset)?;
    }
    Ok(())
}
