use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gtexquery::annotation::{BiomartEndpoint, fetch_annotations_with};
use gtexquery::batch::run_batch;
use gtexquery::config::ConfigLoader;
use gtexquery::domain::AnnotationMode;
use gtexquery::error::GtexError;
use gtexquery::expression::{ExpressionOutcome, fetch_expression};
use gtexquery::lookup::{LookupTable, resolve};
use gtexquery::session::{DEFAULT_HEADERS, get_session};
use gtexquery::table::read_transcripts;

#[derive(Parser)]
#[command(name = "gtexquery")]
#[command(about = "Query GTEx transcript expression and BioMart annotations per gene")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch median transcript expression for one gene in one region")]
    Expression(ExpressionArgs),
    #[command(about = "Annotate the transcripts listed in an expression CSV")]
    Annotate(AnnotateArgs),
    #[command(about = "Run every gene/region job from gtexquery.json")]
    Run(RunArgs),
}

#[derive(Args)]
struct ExpressionArgs {
    #[arg(long)]
    region: String,

    /// Gene symbol, or a GENCODE gene id when no lookup table is given
    #[arg(long)]
    gene: String,

    /// CSV with `name` and `id` columns mapping symbols to GENCODE ids
    #[arg(long)]
    lookup: Option<PathBuf>,

    #[arg(long)]
    output: PathBuf,
}

#[derive(Args)]
struct AnnotateArgs {
    /// CSV with a `transcriptId` column
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value_t = AnnotationMode::PerTranscript)]
    mode: AnnotationMode,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GtexError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GtexError) -> u8 {
    match error {
        GtexError::MissingConfig | GtexError::EmptyInput(_) => 2,
        GtexError::Http(_)
        | GtexError::GtexStatus { .. }
        | GtexError::BiomartStatus { .. }
        | GtexError::BiomartTimeout { .. }
        | GtexError::MissingAnnotation(_) => 3,
        GtexError::Batch { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Expression(args) => run_expression(args),
        Commands::Annotate(args) => run_annotate(args),
        Commands::Run(args) => run_jobs(args),
    }
}

fn run_expression(args: ExpressionArgs) -> miette::Result<()> {
    let identifier = match &args.lookup {
        Some(path) => resolve(&args.gene, &LookupTable::from_csv_path(path)?),
        None => args.gene.clone(),
    };
    match fetch_expression(&args.region, &identifier, &args.output)? {
        ExpressionOutcome::Skipped => {
            println!("{}: not found in gencode, nothing written", args.gene);
        }
        ExpressionOutcome::Written { rows } => {
            println!("{}: {rows} transcripts -> {}", args.gene, args.output.display());
        }
    }
    Ok(())
}

fn run_annotate(args: AnnotateArgs) -> miette::Result<()> {
    tracing::info!(file = %args.input.display(), "processing file");
    let transcripts = read_transcripts(&args.input)?;
    let endpoint = BiomartEndpoint {
        mode: args.mode,
        ..BiomartEndpoint::default()
    };
    let session = get_session(Some(DEFAULT_HEADERS), None)?;
    let rows = fetch_annotations_with(&*session, &endpoint, &transcripts, &args.output)?;
    println!(
        "{} transcripts, {rows} annotations -> {}",
        transcripts.len(),
        args.output.display()
    );
    Ok(())
}

fn run_jobs(args: RunArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let lookup = match &config.lookup {
        Some(path) => LookupTable::from_csv_path(path.as_std_path())?,
        None => LookupTable::default(),
    };
    let report = run_batch(&config, &lookup)?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| GtexError::Filesystem(err.to_string()))?;
    println!("{json}");
    report.into_result()?;
    Ok(())
}
