//! Dataset and graph files written after a session.

use std::path::{Path, PathBuf};

use qexpand_core::{DocumentQaPair, ExpansionReport, GraphExport, QAPair, RunSummary};
use serde::Serialize;
use tracing::info;

const DATASET_HEADERS: [&str; 5] = ["question", "answer", "source", "domain", "query_id"];
const DOCUMENT_HEADERS: [&str; 4] = ["question", "answer", "source", "doc_id"];

pub const DOCUMENT_DATASET_FILE: &str = "golden_qa_dataset.csv";

/// Header row first, so an empty dataset still yields a valid file.
fn write_rows<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_dataset(path: &Path, dataset: &[QAPair]) -> anyhow::Result<()> {
    write_rows(path, &DATASET_HEADERS, dataset)
}

pub fn write_document_dataset(path: &Path, pairs: &[DocumentQaPair]) -> anyhow::Result<()> {
    write_rows(path, &DOCUMENT_HEADERS, pairs)
}

pub fn write_graph(path: &Path, graph: &GraphExport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(graph)?)?;
    info!(
        "Wrote graph with {} nodes and {} edges to {}",
        graph.nodes.len(),
        graph.edges.len(),
        path.display()
    );
    Ok(())
}

/// `<dir>/<domain>_dataset.csv`, plus `<dir>/<domain>_graph.json` when `export_graph` is set.
pub fn write_report(
    dir: &Path,
    report: &ExpansionReport,
    export_graph: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let domain = &report.summary.domain;
    let mut written = Vec::new();

    let dataset_path = dir.join(format!("{domain}_dataset.csv"));
    write_dataset(&dataset_path, &report.dataset)?;
    written.push(dataset_path);

    if export_graph {
        let graph_path = dir.join(format!("{domain}_graph.json"));
        write_graph(&graph_path, &report.graph.export())?;
        written.push(graph_path);
    }

    Ok(written)
}

pub fn print_summary(summary: &RunSummary, files: &[PathBuf]) {
    let elapsed = summary.finished_at - summary.started_at;

    println!("=== {} ===", summary.domain);
    println!("  Result: {}", summary.reason);
    println!("  Rounds: {}", summary.rounds);
    println!("  Pairs: {}", summary.pairs);
    println!(
        "  Graph: {} nodes, {} edges",
        summary.node_count, summary.edge_count
    );
    println!(
        "  Skipped: {} extraction, {} generation, {} answer, {} duplicate",
        summary.skips.extraction_failures,
        summary.skips.generation_failures,
        summary.skips.answer_failures,
        summary.skips.duplicate_questions
    );
    println!("  Fallbacks to llm: {}", summary.fallbacks);
    println!("  Elapsed: {}s", elapsed.num_seconds());
    for file in files {
        println!("  Wrote: {}", file.display());
    }
    println!();
}
