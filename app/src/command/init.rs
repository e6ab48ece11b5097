use qexpand_config::Config;

/// Strategy for initializing the configuration.
///
/// Creates the starter configuration file at `~/qexpand/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your completion API key");
        println!("   2. Optionally add extraction, search or datastore endpoints");
        println!("   3. Run 'qexpand expand' to build a dataset from the built-in seeds");
        println!();
        println!("🔧 Configuration options:");
        println!("   - expansion.num_questions: dataset size per domain");
        println!("   - expansion.source_strategy: llm, datastore or search");
        println!("   - expansion.grounding_enabled: wire search and datastore retrievers");
        println!("   - output.directory: where CSV and graph files are written");
        println!();
        Ok(())
    }
}
