//! Seed questions: built-in example domains and JSON seed files.

use std::path::Path;

use qexpand_core::SeedQuery;

pub const BUILTIN_DOMAINS: [&str; 4] = ["general", "scientific", "technology", "business"];

const GENERAL: [(&str, &str); 4] = [
    ("What are some popular attractions to visit in Seattle?", "q1"),
    ("What restaurants serve vegan food in Austin?", "q2"),
    ("What would be a good teambuilding outdoor activity in Manhattan?", "q3"),
    ("Where is the nearest local coffee shop to my hotel?", "q4"),
];

const SCIENTIFIC: [(&str, &str); 4] = [
    ("What is the role of mitochondria in cellular respiration?", "sci1"),
    ("How does quantum entanglement work in physics?", "sci2"),
    ("Explain the process of DNA replication.", "sci3"),
    ("What are the laws of thermodynamics?", "sci4"),
];

const TECHNOLOGY: [(&str, &str); 4] = [
    ("How do microprocessors handle parallel processing?", "tech1"),
    ("What are the principles of cloud computing architecture?", "tech2"),
    ("Explain how blockchain maintains data integrity?", "tech3"),
    ("What is the difference between HTTP and HTTPS?", "tech4"),
];

const BUSINESS: [(&str, &str); 4] = [
    ("What are the key components of a SWOT analysis?", "bus1"),
    ("How does supply chain optimization work?", "bus2"),
    ("Explain the concept of market segmentation?", "bus3"),
    ("What are the principles of agile project management?", "bus4"),
];

/// Seeds of a built-in domain, or `None` for an unknown name.
pub fn builtin(domain: &str) -> Option<Vec<SeedQuery>> {
    let seeds = match domain.trim().to_lowercase().as_str() {
        "general" => GENERAL,
        "scientific" => SCIENTIFIC,
        "technology" => TECHNOLOGY,
        "business" => BUSINESS,
        _ => return None,
    };
    Some(seeds.into_iter().map(SeedQuery::from).collect())
}

/// Read `[{"id": "...", "text": "..."}]`.
pub fn load_seed_file(path: &Path) -> anyhow::Result<Vec<SeedQuery>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read seed file {}: {e}", path.display()))?;
    let seeds: Vec<SeedQuery> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid seed file {}: {e}", path.display()))?;
    Ok(seeds)
}
