use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kegg_analyzer::app::App;
use kegg_analyzer::cache::ReferenceCache;
use kegg_analyzer::config::{ConfigLoader, ResolvedConfig};
use kegg_analyzer::enrich::{CancellationToken, EnrichmentReport, ProgressSink};
use kegg_analyzer::error::KeggError;
use kegg_analyzer::fs_util::read_keg_file;
use kegg_analyzer::output::{JsonOutput, OutputMode, render_export, render_tree};
use kegg_analyzer::reference::{KeggHttpClient, ReferenceClient};

#[derive(Parser)]
#[command(name = "kegg-analyzer")]
#[command(about = "Summarize KEGG keg hierarchies and compute pathway coverage")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Print machine-readable JSON instead of text")]
    json: bool,

    #[arg(long, global = true, help = "Path to a kegg-analyzer.json config file")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the category/subcategory/pathway tree with counts")]
    Summary(SummaryArgs),
    #[command(about = "List the orthology groups of one pathway")]
    Pathway(PathwayArgs),
    #[command(about = "Fetch KEGG reference data and compute pathway coverage")]
    Enrich(EnrichArgs),
    #[command(about = "Write the tree as indented tab-separated text")]
    Export(ExportArgs),
}

#[derive(Args)]
struct SummaryArgs {
    file: PathBuf,

    #[arg(long, default_value_t = 3, help = "Number of levels to show (1-3)")]
    level: usize,
}

#[derive(Args)]
struct PathwayArgs {
    file: PathBuf,

    #[arg(long)]
    pathway: String,

    #[arg(long)]
    category: String,

    #[arg(long)]
    sub_category: String,
}

#[derive(Args)]
struct EnrichArgs {
    file: PathBuf,

    #[arg(long, help = "Stop after this many pathways")]
    limit: Option<usize>,

    #[arg(long, default_value_t = 3)]
    level: usize,
}

#[derive(Args)]
struct ExportArgs {
    file: PathBuf,

    #[arg(long, short)]
    output: PathBuf,

    #[arg(long, help = "Include the orthology groups under each pathway")]
    details: bool,

    #[arg(long, help = "Enrich with KEGG reference data before exporting")]
    enrich: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kegg) = report.downcast_ref::<KeggError>() {
            return ExitCode::from(map_exit_code(kegg));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KeggError) -> u8 {
    match error {
        KeggError::Parse { .. } | KeggError::Integrity(_) | KeggError::Input { .. } => 2,
        KeggError::Http(_) | KeggError::FetchUnavailable { .. } => 3,
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
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = build_app(&config)?;

    match cli.command {
        Commands::Summary(args) => {
            load(&app, &args.file)?;
            let hierarchy = app.build_hierarchy()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&hierarchy).into_diagnostic(),
                OutputMode::Text => {
                    print!("{}", render_tree(&hierarchy, args.level));
                    Ok(())
                }
            }
        }
        Commands::Pathway(args) => {
            load(&app, &args.file)?;
            let entries =
                app.list_pathway_entries(&args.pathway, &args.category, &args.sub_category);
            match output_mode {
                OutputMode::Json => JsonOutput::print(&entries).into_diagnostic(),
                OutputMode::Text => {
                    for entry in &entries {
                        println!(
                            "{}\t{}\t{}\t{}\t{}\t{}",
                            entry.orthology_id,
                            entry.name,
                            entry.description,
                            entry.enzyme.as_deref().unwrap_or(""),
                            entry.gene_ids.len(),
                            entry.gene_ids.join(", ")
                        );
                    }
                    Ok(())
                }
            }
        }
        Commands::Enrich(args) => {
            load(&app, &args.file)?;
            app.build_hierarchy()?;
            let report = run_enrichment(&app, args.limit)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&report).into_diagnostic(),
                OutputMode::Text => {
                    print!("{}", render_tree(&app.hierarchy(), args.level));
                    print_enrichment_summary(&report);
                    Ok(())
                }
            }
        }
        Commands::Export(args) => {
            load(&app, &args.file)?;
            app.build_hierarchy()?;
            if args.enrich {
                run_enrichment(&app, None)?;
            }
            let hierarchy = app.hierarchy();
            let text = if args.details {
                render_export(
                    &hierarchy,
                    Some(|pathway: &str, category: &str, sub_category: &str| {
                        app.list_pathway_entries(pathway, category, sub_category)
                    }),
                )
            } else {
                render_export(
                    &hierarchy,
                    None::<fn(&str, &str, &str) -> Vec<kegg_analyzer::hierarchy::GeneGroupNode>>,
                )
            };
            fs::write(&args.output, text)
                .map_err(|err| KeggError::Filesystem(format!("{}: {err}", args.output.display())))?;
            info!(path = %args.output.display(), "export written");
            Ok(())
        }
    }
}

fn build_app(config: &ResolvedConfig) -> Result<App<KeggHttpClient>, KeggError> {
    let client = KeggHttpClient::new(&config.reference_base_url, config.timeout)?;
    let cache = ReferenceCache::new(config.cache_dir.clone());
    Ok(App::new(cache, client))
}

fn load<C: ReferenceClient>(app: &App<C>, file: &std::path::Path) -> Result<(), KeggError> {
    let text = read_keg_file(file)?;
    app.parse(&text)?;
    Ok(())
}

struct Progress {
    completed: usize,
    total: usize,
    label: String,
}

struct ChannelSink {
    sender: mpsc::Sender<Progress>,
    token: CancellationToken,
    limit: Option<usize>,
}

impl ProgressSink for ChannelSink {
    fn progress(&self, completed: usize, total: usize, label: &str) {
        if self.limit.is_some_and(|limit| completed >= limit) {
            self.token.cancel();
        }
        let _ = self.sender.send(Progress {
            completed,
            total,
            label: label.to_string(),
        });
    }
}

fn run_enrichment<C: ReferenceClient>(
    app: &App<C>,
    limit: Option<usize>,
) -> Result<EnrichmentReport, KeggError> {
    let token = CancellationToken::new();
    let (sender, receiver) = mpsc::channel();
    thread::scope(|scope| {
        let sink = ChannelSink {
            sender,
            token: token.clone(),
            limit,
        };
        let worker = scope.spawn(move || app.enrich_pathways(&token, &sink));
        for update in receiver {
            info!(
                completed = update.completed,
                total = update.total,
                pathway = %update.label,
                "enrichment progress"
            );
        }
        worker
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

fn print_enrichment_summary(report: &EnrichmentReport) {
    println!(
        "Enriched {}/{} pathways ({} fetched, {} skipped){}",
        report.enriched,
        report.total,
        report.fetched,
        report.skipped.len(),
        if report.cancelled { ", cancelled" } else { "" }
    );
    for skipped in &report.skipped {
        println!(
            "  skipped {} {}: {}",
            skipped.pathway_id.ko_name(),
            skipped.label,
            skipped.message
        );
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use kegg_analyzer::domain::PathwayId;

    use super::*;

    const KEG: &str = "\
A<b>Metabolism</b>
B  <b>Carbohydrate metabolism</b>
C    00010 Glycolysis / Gluconeogenesis [PATH:ko00010]
D      gene_1; K00844  HK; hexokinase [EC:2.7.1.1]
C    00020 Citrate cycle (TCA cycle) [PATH:ko00020]
D      gene_3; K01647  CS; citrate synthase [EC:2.3.3.1]
C    00030 Pentose phosphate pathway [PATH:ko00030]
D      gene_5; K00036  G6PD; glucose-6-phosphate 1-dehydrogenase [EC:1.1.1.49]
";

    struct FixedClient;

    impl ReferenceClient for FixedClient {
        fn fetch_pathway(&self, _id: &PathwayId) -> Result<String, KeggError> {
            Ok("ORTHOLOGY   K00844  HK; hexokinase\nREFERENCE   PMID:1\n".to_string())
        }
    }

    #[test]
    fn limit_stops_before_next_fetch() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("ko")).unwrap();
        let app = App::new(ReferenceCache::new(root), FixedClient);
        app.parse(KEG).unwrap();
        app.build_hierarchy().unwrap();

        let report = run_enrichment(&app, Some(1)).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.enriched, 1);
        assert_eq!(report.fetched, 1);
        assert_eq!(report.total, 3);
    }

    #[test]
    fn no_limit_enriches_every_pathway() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("ko")).unwrap();
        let app = App::new(ReferenceCache::new(root), FixedClient);
        app.parse(KEG).unwrap();

        let report = run_enrichment(&app, None).unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.enriched, 3);
        assert_eq!(report.fetched, 3);
    }
}
