//! Pipeline driver: bundle -> source parsers -> correlation -> artifact
//!
//! One pipeline run owns one graph for one target. Steps run strictly in sequence.

use crate::bundle::ReconBundle;
use crate::config::{expand_path, Config};
use crate::correlation::{CorrelationReport, Correlator};
use crate::error::Result;
use crate::graph::{connection_count, GraphDocument, IntelligenceGraph};
use crate::parser::{BundleReport, SourceParser};
use crate::persistence::GraphStore;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Result of a full pipeline run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub graph: IntelligenceGraph,
    pub parse: BundleReport,
    pub correlation: Option<CorrelationReport>,
    pub artifact: PathBuf,
}

/// Wires the parser, correlator and store from one configuration
pub struct Pipeline {
    parser: SourceParser,
    correlator: Correlator,
    store: GraphStore,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            parser: SourceParser::new(config)?,
            correlator: Correlator::new(&config.correlation),
            store: GraphStore::new(expand_path(&config.storage.data_dir)?),
        })
    }

    /// Parse a bundle into a fresh graph seeded with its target
    pub fn build_graph(&self, bundle: &ReconBundle) -> Result<(IntelligenceGraph, BundleReport)> {
        let span = tracing::info_span!("build_graph", target = %bundle.target);
        let _guard = span.enter();

        let mut graph = IntelligenceGraph::new(&bundle.target)?;
        let report = self.parser.parse_bundle(&mut graph, bundle)?;
        Ok((graph, report))
    }

    /// Run the correlation passes once over a parsed graph
    pub fn correlate(&self, graph: &mut IntelligenceGraph) -> Result<CorrelationReport> {
        self.correlator.correlate(graph)
    }

    /// Persist a graph, to `output` or the default artifact path
    pub fn save(&self, graph: &IntelligenceGraph, output: Option<&Path>) -> Result<PathBuf> {
        self.store.save(graph, output)
    }

    /// Full run: parse, optionally correlate, then persist
    pub fn run(
        &self,
        bundle: &ReconBundle,
        output: Option<&Path>,
        correlate: bool,
    ) -> Result<PipelineOutcome> {
        let (mut graph, parse) = self.build_graph(bundle)?;
        let correlation = if correlate {
            Some(self.correlate(&mut graph)?)
        } else {
            None
        };
        let artifact = self.save(&graph, output)?;

        Ok(PipelineOutcome {
            graph,
            parse,
            correlation,
            artifact,
        })
    }
}

/// Human-readable summary of a graph artifact
pub fn render_summary(document: &GraphDocument) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "INTELLIGENCE GRAPH SUMMARY: {}", document.target);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "Entities: {}  Relationships: {}",
        document.stats.total_entities, document.stats.total_relationships
    );

    let _ = writeln!(out, "\nEntity Distribution:");
    for (entity_type, count) in &document.stats.entity_types {
        let _ = writeln!(out, "  • {:20}: {}", entity_type, count);
    }

    let _ = writeln!(out, "\nRelationship Distribution:");
    for (rel_type, count) in &document.stats.relationship_types {
        let _ = writeln!(out, "  • {:25}: {}", rel_type, count);
    }

    let high_value = document.high_value_targets();
    if !high_value.is_empty() {
        let _ = writeln!(out, "\nHigh-Value Targets ({}):", high_value.len());
        for entity in high_value.iter().take(5) {
            let _ = writeln!(
                out,
                "  • {:40} ({}) - {} connections",
                entity.value,
                entity.entity_type,
                connection_count(entity)
            );
        }
    }

    let _ = write!(out, "{}", rule);
    out
}
