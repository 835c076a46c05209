use clap::Parser;
use orgtree::artifact::{emit, ArtifactSink, FileSink, OutputFormat, RenderOptions};
use orgtree::config::Config;
use orgtree::roster::{complete_roster, load_roster};
use orgtree::theme::Theme;
use orgtree::tree::Forest;
use orgtree::{logging, Result};
use std::path::PathBuf;
use std::process::ExitCode;

/// Regenerate a chart from a saved roster without fetching again
#[derive(Parser, Debug)]
#[command(name = "orgtree-render")]
#[command(version)]
#[command(about = "Render a saved orgtree roster to HTML, SVG, PNG or PDF", long_about = None)]
struct Args {
    /// Roster JSON written by `orgtree --save-roster` (use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (extension determines format: .html, .json, .svg, .png or .pdf)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Configuration file (TOML or YAML); only layout and output are used
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Built-in theme name (paper, slate) or a TOML/YAML palette file
    #[arg(short, long, value_name = "THEME")]
    theme: Option<String>,

    /// Chart title
    #[arg(long)]
    title: Option<String>,

    /// Levels expanded when the chart opens (0 shows roots only)
    #[arg(long, value_name = "DEPTH")]
    expand_depth: Option<usize>,

    /// Draw every branch expanded in SVG/PNG/PDF snapshots
    #[arg(long)]
    expand_all: bool,

    /// Raster scale multiplier for PNG output
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let format = OutputFormat::from_path(&args.output)?;

    let members = load_roster(&args.input)?;
    let roster = complete_roster(members)?;
    tracing::info!(
        members = roster.real_count(),
        placeholders = roster.virtual_count,
        "loaded roster from {}",
        args.input.display()
    );

    let forest = Forest::from_roster(roster);
    let options = RenderOptions {
        title: args.title.unwrap_or(config.output.title),
        theme: Theme::resolve(args.theme.as_deref().unwrap_or(&config.output.theme))?,
        metrics: config.layout.metrics,
        initial_depth: args.expand_depth.unwrap_or(config.layout.initial_depth),
        expand_all: args.expand_all,
        png_scale: args.png_scale,
        ..Default::default()
    };

    let artifact = emit(&forest, &options, format)?;
    FileSink::new(args.output).accept(&artifact)
}
