use std::path::PathBuf;

use qexpand_config::Config;
use qexpand_core::{AnswerSource, CancellationFlag, ExpansionConfig, ExpansionOrchestrator};
use tracing::info;

use crate::{export, seeds};

/// Input parameters for the Expand command strategy.
#[derive(Debug, Clone)]
pub struct ExpandInput {
    pub config_path: Option<PathBuf>,
    /// JSON seed file; the domain's built-in seeds when absent
    pub seeds: Option<PathBuf>,
    pub domain: Option<String>,
    pub target: Option<usize>,
    pub source: Option<AnswerSource>,
    pub datastore_id: Option<String>,
    pub output: Option<PathBuf>,
    pub max_rounds: Option<u32>,
    pub no_seed_answers: bool,
    pub cancel: CancellationFlag,
}

impl ExpandInput {
    /// File settings with command-line overrides applied.
    fn session_config(&self, config: &Config) -> ExpansionConfig {
        let mut session = config.to_expansion_config(self.domain.as_deref());
        if let Some(target) = self.target {
            session.target_count = target;
        }
        if let Some(source) = self.source {
            session.source = source;
        }
        if self.max_rounds.is_some() {
            session.max_rounds = self.max_rounds;
        }
        if self.no_seed_answers {
            session.answer_seeds = false;
        }
        session
    }
}

/// Strategy for running one expansion session and writing its dataset.
#[derive(Debug, Clone, Copy)]
pub struct ExpandStrategy;

impl super::CommandStrategy for ExpandStrategy {
    type Input = ExpandInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(input.config_path.as_deref())?;
        let session = input.session_config(&config);

        let seeds = match &input.seeds {
            Some(path) => seeds::load_seed_file(path)?,
            None => seeds::builtin(&session.domain).ok_or_else(|| {
                anyhow::anyhow!(
                    "No built-in seeds for domain '{}'. Pass a seed file.",
                    session.domain
                )
            })?,
        };
        info!(
            "Loaded {} seeds for domain '{}'",
            seeds.len(),
            session.domain
        );

        let services = super::build_services(&config, input.datastore_id.as_deref())?;
        let report = ExpansionOrchestrator::new(&services, session)
            .with_cancellation(input.cancel)
            .run(&seeds)
            .await?;

        let output_dir = input.output.unwrap_or(config.output.directory);
        let files = export::write_report(&output_dir, &report, config.output.export_graph)?;
        export::print_summary(&report.summary, &files);

        Ok(())
    }
}
