//! Validate an extension config.

use std::path::PathBuf;

use gazelens_page_model::config::ExtensionConfig;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating config at: {}", path.display());

    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read config: {e}"))?;
    let config = ExtensionConfig::from_json(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))?;

    println!("  Tags: {}", config.len());
    for tag in config.tags() {
        let Some(element) = config.get(tag) else {
            continue;
        };
        println!("  <{tag}> after {} ms", element.activation_ms());
        for (property, value) in element.style.declarations() {
            println!("      {property}: {value}");
        }
    }

    let issues = config.validate();
    if issues.is_empty() {
        println!("\nConfig is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Affected tags may never focus or focus immediately.",
            issues.len()
        );
    }

    Ok(())
}
