use std::path::{Path, PathBuf};
use threatgraph::bundle::ReconBundle;
use threatgraph::cli::{Cli, Commands, ConfigAction};
use threatgraph::config::Config;
use threatgraph::error::{Result, ThreatGraphError};
use threatgraph::persistence::GraphStore;
use threatgraph::pipeline::{render_summary, Pipeline};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            bundle,
            output,
            no_correlate,
            summary,
        } => {
            cmd_build(cli.config, &bundle, output, no_correlate, summary)?;
        }
        Commands::Correlate { graph, output } => {
            cmd_correlate(cli.config, &graph, output)?;
        }
        Commands::Summary { graph, json } => {
            cmd_summary(&graph, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "threatgraph=debug"
    } else {
        "threatgraph=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_build(
    config_path: Option<PathBuf>,
    bundle_path: &Path,
    output: Option<PathBuf>,
    no_correlate: bool,
    summary: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let bundle = ReconBundle::load(bundle_path)?;
    tracing::info!("Building intelligence graph for {}", bundle.target);

    let pipeline = Pipeline::new(&config)?;
    let outcome = pipeline.run(&bundle, output.as_deref(), !no_correlate)?;

    println!("✓ Graph saved: {}", outcome.artifact.display());
    println!("  Entities: {}", outcome.graph.entity_count());
    println!("  Relationships: {}", outcome.graph.relationship_count());
    if outcome.parse.total_skipped() > 0 {
        println!("  Skipped records: {}", outcome.parse.total_skipped());
    }
    if let Some(report) = outcome.correlation {
        println!("  High-value targets: {}", report.high_value_targets);
    }

    if summary {
        println!("\n{}", render_summary(&outcome.graph.to_document()));
    }

    Ok(())
}

fn cmd_correlate(config_path: Option<PathBuf>, graph_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut graph = GraphStore::load_graph(graph_path)?;
    let pipeline = Pipeline::new(&config)?;

    let report = pipeline.correlate(&mut graph)?;
    let output = output.unwrap_or_else(|| graph_path.to_path_buf());
    let artifact = pipeline.save(&graph, Some(&output))?;

    println!("✓ Graph saved: {}", artifact.display());
    println!("  Email-subdomain links: {}", report.email_subdomain_links);
    println!("  Username links: {}", report.username_links);
    println!("  High-value targets: {}", report.high_value_targets);

    Ok(())
}

fn cmd_summary(graph_path: &Path, json: bool) -> Result<()> {
    let document = GraphStore::load(graph_path)?;

    if json {
        let stats = serde_json::to_string_pretty(&document.stats).map_err(|e| {
            ThreatGraphError::Json {
                source: e,
                context: "Failed to serialize stats".to_string(),
            }
        })?;
        println!("{}", stats);
    } else {
        println!("{}", render_summary(&document));
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| ThreatGraphError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ThreatGraphError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'threatgraph config init' to create one."
        );
        return Config::default().with_env_overrides();
    }

    Config::load(&path)
}
