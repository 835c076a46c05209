use clap::{CommandFactory, Parser, ValueEnum};
use orgtree::artifact::{emit, Artifact, ArtifactSink, FileSink, OutputFormat, RenderOptions};
use orgtree::config::{Config, Credentials, ProviderKind};
use orgtree::provider::{fetch_union, FileProvider, HttpProvider, RosterProvider};
use orgtree::roster::{prepare_roster, roster_to_json};
use orgtree::theme::Theme;
use orgtree::tree::Forest;
use orgtree::{logging, Error, Result};
use std::path::PathBuf;
use std::process::ExitCode;

/// Build an organization chart from one or more membership rosters
#[derive(Parser, Debug)]
#[command(name = "orgtree")]
#[command(version)]
#[command(about = "Merge membership rosters into an interactive org chart (HTML, SVG, PNG or PDF)", long_about = None)]
struct Args {
    /// Roster sources: JSON files for the file provider ("-" for stdin),
    /// group ids for the http provider. Defaults to provider.groups.
    #[arg(value_name = "SOURCE")]
    sources: Vec<String>,

    /// Output file path (extension determines format: .html, .json, .svg, .png or .pdf)
    #[arg(short, long, value_name = "OUTPUT", required_unless_present = "completions")]
    output: Option<PathBuf>,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Where roster records come from
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Also write the merged, completed roster to this JSON file
    #[arg(long, value_name = "ROSTER")]
    save_roster: Option<PathBuf>,

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

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    File,
    Http,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::File => ProviderKind::File,
            ProviderArg::Http => ProviderKind::Http,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "orgtree", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

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
    let output = args
        .output
        .ok_or_else(|| Error::UnsupportedOutput("no output path given".to_string()))?;
    // Fail on a bad extension before anything is fetched.
    let format = OutputFormat::from_path(&output)?;

    let groups = if args.sources.is_empty() {
        config.provider.groups.clone()
    } else {
        args.sources
    };
    if groups.is_empty() {
        return Err(Error::Config(
            "no roster sources given on the command line or in provider.groups".to_string(),
        ));
    }

    let kind = args.provider.map(ProviderKind::from).unwrap_or(config.provider.kind);
    let provider: Box<dyn RosterProvider> = match kind {
        ProviderKind::File => Box::new(FileProvider::new()),
        ProviderKind::Http => {
            let credentials = Credentials::from_env(&config.provider.token_env)?;
            Box::new(HttpProvider::new(&config.provider, credentials)?)
        }
    };

    let batches = fetch_union(provider.as_ref(), &groups)?;
    let roster = prepare_roster(&batches)?;
    tracing::info!(
        members = roster.real_count(),
        placeholders = roster.virtual_count,
        malformed = roster.malformed,
        "merged {} source(s)",
        groups.len()
    );

    if let Some(path) = &args.save_roster {
        let artifact = Artifact {
            format: OutputFormat::Json,
            bytes: roster_to_json(&roster.members)?.into_bytes(),
        };
        FileSink::new(path).accept(&artifact)?;
    }

    let forest = Forest::from_roster(roster);
    let report = forest.report();
    if report.ambiguous_superiors > 0 || report.cycles_broken > 0 {
        tracing::warn!(
            ambiguous = report.ambiguous_superiors,
            cycles = report.cycles_broken,
            "some superiors were resolved by first-match or left as roots"
        );
    }

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
    FileSink::new(output).accept(&artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn completions_do_not_need_an_output() {
        let args = Args::try_parse_from(["orgtree", "--completions", "bash"]).unwrap();
        assert!(args.output.is_none());
        assert!(Args::try_parse_from(["orgtree", "roster.json"]).is_err());
    }

    #[test]
    fn repeated_verbose_flags_count() {
        let args = Args::try_parse_from(["orgtree", "a.json", "-o", "out.html", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.sources, vec!["a.json".to_string()]);
    }
}
