use std::path::{Path, PathBuf};

use qexpand_core::{Document, DocumentQaGenerator};
use tracing::{info, warn};

use crate::export::{self, DOCUMENT_DATASET_FILE};

const TEXT_EXTENSIONS: [&str; 11] = [
    "txt", "md", "json", "csv", "py", "js", "html", "xml", "log", "yml", "yaml",
];

/// Input parameters for the Docs command strategy.
#[derive(Debug, Clone)]
pub struct DocsInput {
    pub config_path: Option<PathBuf>,
    pub dir: PathBuf,
    pub total: usize,
    pub output: Option<PathBuf>,
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Every readable text file under `dir`, in path order. Ids are positions in that order.
fn load_documents(dir: &Path) -> anyhow::Result<Vec<Document>> {
    let mut paths = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_text_file(&path) {
                paths.push(path);
            }
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        match std::fs::read_to_string(&path) {
            Ok(content) => documents.push(Document::new(
                documents.len().to_string(),
                path.display().to_string(),
                content,
            )),
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }
    Ok(documents)
}

/// Strategy for generating golden QA pairs from a directory of documents.
#[derive(Debug, Clone, Copy)]
pub struct DocsStrategy;

impl super::CommandStrategy for DocsStrategy {
    type Input = DocsInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(input.config_path.as_deref())?;

        let documents = load_documents(&input.dir)?;
        if documents.is_empty() {
            anyhow::bail!("No text documents found in {}", input.dir.display());
        }
        info!(
            "Loaded {} documents from {}",
            documents.len(),
            input.dir.display()
        );

        let llm = super::build_llm(&config)?;
        llm.health_check()
            .await
            .map_err(|e| anyhow::anyhow!("Completion service unavailable: {e}"))?;

        let pairs = DocumentQaGenerator::new(llm)
            .generate_dataset(&documents, input.total)
            .await;

        let output_dir = input.output.unwrap_or(config.output.directory);
        let path = output_dir.join(DOCUMENT_DATASET_FILE);
        export::write_document_dataset(&path, &pairs)?;

        println!("Created dataset with {} question-answer pairs", pairs.len());
        println!("  Wrote: {}", path.display());
        Ok(())
    }
}
