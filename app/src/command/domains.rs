use std::path::PathBuf;

use qexpand_core::{AnswerSource, CancellationFlag, SeedQuery, expand_domains};
use tracing::warn;

use crate::seeds::{self, BUILTIN_DOMAINS};
use crate::export;

/// Input parameters for the Domains command strategy.
#[derive(Debug, Clone)]
pub struct DomainsInput {
    pub config_path: Option<PathBuf>,
    /// Built-in domains to run; all of them when empty
    pub names: Vec<String>,
    pub target: Option<usize>,
    pub source: Option<AnswerSource>,
    pub output: Option<PathBuf>,
    pub cancel: CancellationFlag,
}

fn resolve_domains(names: &[String]) -> anyhow::Result<Vec<(String, Vec<SeedQuery>)>> {
    let names: Vec<String> = if names.is_empty() {
        BUILTIN_DOMAINS.iter().map(ToString::to_string).collect()
    } else {
        names.iter().map(|n| n.trim().to_lowercase()).collect()
    };

    names
        .into_iter()
        .map(|name| {
            let seeds = seeds::builtin(&name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown domain '{name}'. Built-in domains: {}",
                    BUILTIN_DOMAINS.join(", ")
                )
            })?;
            Ok((name, seeds))
        })
        .collect()
}

/// Strategy for expanding several built-in domains, one independent session each.
#[derive(Debug, Clone, Copy)]
pub struct DomainsStrategy;

impl super::CommandStrategy for DomainsStrategy {
    type Input = DomainsInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(input.config_path.as_deref())?;
        let domains = resolve_domains(&input.names)?;

        let mut session = config.to_expansion_config(None);
        if let Some(target) = input.target {
            session.target_count = target;
        }
        if let Some(source) = input.source {
            session.source = source;
        }

        let services = super::build_services(&config, None)?;
        let results = expand_domains(&services, &session, domains, &input.cancel).await;

        let output_dir = input.output.unwrap_or(config.output.directory);
        let mut failures = 0;
        for (domain, result) in &results {
            match result {
                Ok(report) => {
                    let files =
                        export::write_report(&output_dir, report, config.output.export_graph)?;
                    export::print_summary(&report.summary, &files);
                }
                Err(e) => {
                    warn!("Domain '{}' failed: {e}", domain);
                    println!("=== {domain} ===\n  Failed: {e}\n");
                    failures += 1;
                }
            }
        }

        if !results.is_empty() && failures == results.len() {
            anyhow::bail!("Every domain failed");
        }
        Ok(())
    }
}
