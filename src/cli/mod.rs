//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "threatgraph",
    version,
    author = "neur0map",
    about = "Correlate domain reconnaissance results into an intelligence graph",
    long_about = "threatgraph reads the output of subdomain, DNS, WHOIS, web probing, email and \
                  username collectors, resolves duplicate assets, infers relationships between \
                  them and writes a JSON intelligence graph for risk scoring and visualization."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/threatgraph/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an intelligence graph from a reconnaissance bundle
    Build {
        /// JSON bundle produced by the collection layer
        bundle: PathBuf,

        /// Output path (defaults to <data_dir>/intelligence_graph_<target>_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the correlation passes
        #[arg(long)]
        no_correlate: bool,

        /// Print the graph summary after saving
        #[arg(short, long)]
        summary: bool,
    },

    /// Re-run correlation over an existing graph artifact
    Correlate {
        /// Graph artifact to read
        graph: PathBuf,

        /// Output path (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print entity/relationship distributions and high-value targets
    Summary {
        /// Graph artifact to read
        graph: PathBuf,

        /// Print stats as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_args() {
        let cli = Cli::parse_from([
            "threatgraph",
            "build",
            "bundle.json",
            "-o",
            "graph.json",
            "--no-correlate",
        ]);
        match cli.command {
            Commands::Build {
                bundle,
                output,
                no_correlate,
                summary,
            } => {
                assert_eq!(bundle, PathBuf::from("bundle.json"));
                assert_eq!(output, Some(PathBuf::from("graph.json")));
                assert!(no_correlate);
                assert!(!summary);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
