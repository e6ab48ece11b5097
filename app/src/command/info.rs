use std::path::PathBuf;

use qexpand_config::Config;

use crate::seeds::BUILTIN_DOMAINS;

/// Strategy for displaying the effective configuration.
///
/// Prints the completion provider (API key masked), which extraction and grounding
/// services would be wired, the expansion defaults and the output settings.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = Option<PathBuf>;

    async fn execute(&self, config_path: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(config_path.as_deref())?;
        let location = match config_path {
            Some(path) => path,
            None => Config::config_path()?,
        };

        println!("=== qexpand Configuration ===\n");
        println!("File: {}\n", location.display());

        let completion = &config.providers.completion;
        println!("Completion:");
        println!("  Base URL: {}", completion.base_url);
        println!("  Model: {}", completion.model);
        println!("  API Key: {}", mask_secret(&completion.api_key));
        println!("  Timeout: {}s", completion.timeout_secs);
        println!();

        println!("Extraction:");
        match &config.providers.extraction {
            Some(endpoint) => println!("  Endpoint: {}", endpoint.endpoint),
            None => println!("  Heuristic (no endpoint configured)"),
        }
        println!();

        let e = &config.expansion;
        println!("Grounding:");
        println!("  Enabled: {}", e.grounding_enabled);
        match &config.providers.search {
            Some(search) => println!("  Search: {}", search.endpoint),
            None => println!("  Search: (not set)"),
        }
        match &config.providers.datastore {
            Some(datastore) => println!(
                "  Datastore: {} (id {})",
                datastore.endpoint, datastore.datastore_id
            ),
            None => println!("  Datastore: (not set)"),
        }
        if !e.grounding_enabled {
            println!("  Every source falls back to llm");
        }
        println!();

        println!("Expansion:");
        println!("  Domain: {}", e.domain);
        println!("  Target: {}", e.num_questions);
        println!("  Questions Per Round: {}", e.questions_per_round);
        println!("  Source Strategy: {}", e.source_strategy);
        println!("  Top K Related: {}", e.top_k_related);
        println!("  Min Edge Weight: {}", e.min_edge_weight);
        println!("  Anchor Pool: {}", e.anchor_pool);
        println!("  Max Stall Rounds: {}", e.max_stall_rounds);
        match e.max_rounds {
            Some(max) => println!("  Max Rounds: {max}"),
            None => println!("  Max Rounds: (unlimited)"),
        }
        println!("  Answer Seeds: {}", e.answer_seeds);
        println!("  Built-in Domains: {}", BUILTIN_DOMAINS.join(", "));
        println!();

        println!("Output:");
        println!("  Directory: {}", config.output.directory.display());
        println!("  Export Graph: {}", config.output.export_graph);
        println!();

        println!("Logging:");
        println!("  Level: {}", config.logging.level);

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
