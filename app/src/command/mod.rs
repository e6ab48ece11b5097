//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type; `main` dispatches to them
//! statically.

use std::path::Path;
use std::sync::Arc;

use qexpand_config::Config;
use qexpand_core::{ExtractionService, HeuristicExtractor, LLMProvider, ServiceHandles};
use qexpand_providers::{
    HttpDatastoreClient, HttpExtractionClient, HttpSearchClient, OpenAiCompatProvider,
};
use tracing::info;

mod docs;
mod domains;
mod expand;
mod info;
mod init;
mod version;

pub use docs::{DocsInput, DocsStrategy};
pub use domains::{DomainsInput, DomainsStrategy};
pub use expand::{ExpandInput, ExpandStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// Each strategy defines its own input type, so parameters are passed without runtime
/// casting or boxing.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// The config at `path`, or the default one under the home directory.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    path.map_or_else(Config::load, Config::load_from)
}

pub(crate) fn build_llm(config: &Config) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let completion = &config.providers.completion;
    let provider = OpenAiCompatProvider::new(
        completion.api_key.clone(),
        &completion.base_url,
        completion.model.clone(),
        completion.timeout_secs,
    )?;
    Ok(Arc::new(provider))
}

/// Wire every configured service. Retrievers are only attached when grounding is enabled.
pub(crate) fn build_services(
    config: &Config,
    datastore_override: Option<&str>,
) -> anyhow::Result<ServiceHandles> {
    let llm = build_llm(config)?;

    let extraction: Arc<dyn ExtractionService> = match &config.providers.extraction {
        Some(endpoint) => Arc::new(HttpExtractionClient::new(
            endpoint.endpoint.clone(),
            endpoint.api_key.clone(),
            endpoint.timeout_secs,
        )?),
        None => {
            info!("No extraction endpoint configured, using the heuristic extractor");
            Arc::new(HeuristicExtractor::new())
        }
    };

    let mut services = ServiceHandles::new(llm, extraction);

    if !config.expansion.grounding_enabled {
        info!("Grounding disabled, every answer comes from the completion service");
        return Ok(services);
    }

    if let Some(search) = &config.providers.search {
        services = services.with_search(Arc::new(HttpSearchClient::new(
            search.endpoint.clone(),
            search.api_key.clone(),
            search.timeout_secs,
        )?));
    }

    if let Some(datastore) = &config.providers.datastore {
        let datastore_id = datastore_override.unwrap_or(&datastore.datastore_id);
        info!("Using datastore {}", datastore_id);
        services = services.with_datastore(Arc::new(HttpDatastoreClient::new(
            datastore.endpoint.clone(),
            datastore_id.to_string(),
            datastore.api_key.clone(),
            datastore.timeout_secs,
        )?));
    }

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> Config {
        serde_json::from_str(json).unwrap_or_else(|e| panic!("test config should parse: {e}"))
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn grounding_disabled_wires_no_retrievers() {
        let config = config(
            r#"{"providers": {
                "completion": {"api_key": "k"},
                "search": {"endpoint": "http://localhost:8081/search"}
            }}"#,
        );
        let services = build_services(&config, None).expect("services should build");
        assert!(services.search.is_none());
        assert!(services.datastore.is_none());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn grounding_enabled_wires_configured_retrievers() {
        let config = config(
            r#"{
                "expansion": {"grounding_enabled": true},
                "providers": {
                    "completion": {"api_key": "k"},
                    "datastore": {"endpoint": "http://localhost:8082/query", "datastore_id": "docs-1"}
                }
            }"#,
        );
        let services = build_services(&config, Some("docs-2")).expect("services should build");
        assert!(services.search.is_none());
        assert!(services.datastore.is_some());
    }
}
