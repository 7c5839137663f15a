//! CLI tool for building and exporting weekly operations comparison decks.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use opsdeck_compose::DeclarativeDocumentExporter;
use opsdeck_core::{
    Deck, DeckExporter, DeckOptions, DeckPipeline, Dimension, ExportRequest, ExportedDocument,
    MediaSlide, MissingTargetPolicy, Override, SlideKey, WeekId, WeeklySnapshot,
};
use opsdeck_raster::CaptureRasterExporter;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Compare weekly operations snapshots and export them as a slide deck.
#[derive(Parser, Debug)]
#[command(name = "opsdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the deck to a document
    Export(ExportArgs),
    /// Print the slide order that would be exported
    Plan(DeckArgs),
}

#[derive(Args, Debug)]
struct DeckArgs {
    /// JSON file with an array of weekly snapshots
    #[arg(short, long)]
    snapshots: PathBuf,

    /// Weeks to compare, in order (e.g. W44,W45)
    #[arg(short, long, value_delimiter = ',', required = true)]
    weeks: Vec<String>,

    /// Deck options JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hide a dimension's pages (subregion, weekday, shift, origin)
    #[arg(long, value_parser = parse_dimension)]
    hide: Vec<Dimension>,

    /// Move a slide, as FROM:TO positions as listed by `plan`
    #[arg(long = "move", value_parser = parse_move)]
    moves: Vec<(usize, usize)>,

    /// Override a slide title, as KEY=TITLE
    #[arg(long, value_parser = parse_pair)]
    title: Vec<(String, String)>,

    /// Override a slide subtitle, as KEY=SUBTITLE
    #[arg(long, value_parser = parse_pair)]
    subtitle: Vec<(String, String)>,

    /// Append a media slide, as TITLE=URI
    #[arg(long, value_parser = parse_pair)]
    media: Vec<(String, String)>,

    /// Drop order entries whose slide no longer exists
    #[arg(long)]
    prune: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    deck: DeckArgs,

    /// Export backend
    #[arg(short, long, value_enum, default_value_t = Backend::Declarative)]
    backend: Backend,

    /// Output directory (default: current directory)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Stop the capture export when a slide cannot be captured
    #[arg(long)]
    abort_on_missing: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Render slides off-screen and store them as pictures
    Capture,
    /// Compose slides directly as native shapes
    Declarative,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Export(args) => run_export(args, cli.verbose),
    }
}

fn parse_dimension(value: &str) -> std::result::Result<Dimension, String> {
    Dimension::from_slug(value).ok_or_else(|| {
        let known: Vec<&str> = Dimension::ALL.iter().map(|d| d.slug()).collect();
        format!("unknown dimension '{}' (expected one of {})", value, known.join(", "))
    })
}

fn parse_move(value: &str) -> std::result::Result<(usize, usize), String> {
    let (from, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{}'", value))?;
    let position = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| format!("bad position '{}': {}", s, e))
    };
    Ok((position(from)?, position(to)?))
}

fn parse_pair(value: &str) -> std::result::Result<(String, String), String> {
    let (key, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", value))?;
    if key.trim().is_empty() {
        return Err(format!("missing key in '{}'", value));
    }
    Ok((key.trim().to_string(), rest.to_string()))
}

fn load_options(path: Option<&PathBuf>) -> Result<DeckOptions> {
    match path {
        Some(path) => DeckOptions::from_path(path)
            .with_context(|| format!("Failed to load options from {}", path.display())),
        None => Ok(DeckOptions::default()),
    }
}

fn load_snapshots(path: &Path) -> Result<Vec<WeeklySnapshot>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse snapshots in {}", path.display()))
}

/// Build the deck and apply the edits given on the command line.
fn build_deck(args: &DeckArgs, options: &DeckOptions) -> Result<Deck> {
    let snapshots = load_snapshots(&args.snapshots)?;
    let weeks: Vec<WeekId> = args
        .weeks
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(WeekId::from)
        .collect();

    let pipeline = DeckPipeline::new(options);
    let mut deck = pipeline.build_deck(&snapshots, &weeks)?;
    apply_edits(&mut deck, args);

    Ok(deck)
}

/// Apply edits in the order: media slides, visibility, moves, overrides,
/// pruning. Moves use positions among the visible slides, so they run after
/// visibility changes.
fn apply_edits(deck: &mut Deck, args: &DeckArgs) {
    for (title, uri) in &args.media {
        let key = deck.add_media_slide(MediaSlide {
            title: title.clone(),
            uri: uri.clone(),
        });
        log::debug!("Added media slide {}", key);
    }
    for dimension in &args.hide {
        deck.set_visibility(*dimension, false);
    }
    for (from, to) in &args.moves {
        deck.reorder_visible(*from, *to);
    }
    for (key, title) in &args.title {
        deck.set_override(&SlideKey::from(key.as_str()), Override::title(title.as_str()));
    }
    for (key, sub_title) in &args.subtitle {
        deck.set_override(&SlideKey::from(key.as_str()), Override::sub_title(sub_title.as_str()));
    }
    if args.prune {
        let removed = deck.prune_orphans();
        log::debug!("Pruned {} orphaned slide keys", removed);
    }
}

fn run_plan(args: &DeckArgs) -> Result<()> {
    let options = load_options(args.config.as_ref())?;
    let deck = build_deck(args, &options)?;

    for (i, slide) in deck.resolved().iter().enumerate() {
        match &slide.sub_title {
            Some(sub_title) => println!("{:>3}  {:<14} {} | {}", i, slide.key.as_str(), slide.title, sub_title),
            None => println!("{:>3}  {:<14} {}", i, slide.key.as_str(), slide.title),
        }
    }

    Ok(())
}

fn run_export(args: &ExportArgs, verbose: bool) -> Result<()> {
    let mut options = load_options(args.deck.config.as_ref())?;
    if args.abort_on_missing {
        options.capture = options.capture.with_missing_target(MissingTargetPolicy::Abort);
    }

    let deck = build_deck(&args.deck, &options)?;
    let request = ExportRequest::from_deck(&deck)?;

    let mut exporter: Box<dyn DeckExporter> = match args.backend {
        Backend::Capture => Box::new(CaptureRasterExporter::software(&options)),
        Backend::Declarative => Box::new(DeclarativeDocumentExporter::new(&options)),
    };

    let document = match exporter.export(&request, &mut |p| {
        if verbose {
            eprintln!("  Slide {}/{}", p.current, p.total);
        }
    }) {
        Ok(document) => document,
        Err(e) => return Err(report_export_failure(exporter.name(), e)),
    };

    let output_path = get_output_path(&document, args.out.as_ref())?;
    write_output(&output_path, &document.bytes)?;

    if !document.skipped.is_empty() {
        let skipped: Vec<&str> = document.skipped.iter().map(|k| k.as_str()).collect();
        eprintln!("Skipped {} slides: {}", skipped.len(), skipped.join(", "));
    }
    if verbose {
        eprintln!("Written to: {}", output_path.display());
    }
    println!("{}", output_path.display());

    Ok(())
}

/// The single failure path for both backends: one message, nothing written.
fn report_export_failure(backend: &str, error: opsdeck_core::Error) -> anyhow::Error {
    log::debug!("{} export failed: {:?}", backend, error);
    anyhow::Error::new(error).context(format!(
        "Export failed ({} backend), no document was written",
        backend
    ))
}

/// Determine the output path for an exported document.
fn get_output_path(document: &ExportedDocument, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(&document.file_name)
        }
        None => PathBuf::from(&document.file_name),
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
