//! Write the built-in extension config.

use std::path::PathBuf;

use gazelens_common::config::{config_file_path, AppConfig};
use gazelens_page_model::config::ExtensionConfig;

pub fn run(output: PathBuf, force: bool, tuning: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let config = ExtensionConfig::builtin();
    let json = config
        .to_json_pretty()
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, json)?;

    println!("Config written to {}", output.display());
    for tag in config.tags() {
        if let Some(element) = config.get(tag) {
            println!(
                "  {tag}: activates after {} ms, {} style properties",
                element.activation_ms(),
                element.style.len()
            );
        }
    }

    if tuning {
        write_tuning(force)?;
    }

    Ok(())
}

fn write_tuning(force: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if path.exists() && !force {
        println!("Engine tuning already at {} (left untouched)", path.display());
        return Ok(());
    }

    let app_config = AppConfig::default();
    app_config
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to write engine tuning: {e}"))?;

    let engine = &app_config.engine;
    println!("Engine tuning written to {}", path.display());
    println!("  Smoothing window: {} samples", engine.smoothing_window);
    println!("  Blink deviation: {}", engine.blink_deviation_threshold);
    println!("  Dwell expiry: {} ms", engine.dwell_expiry_ms);
    println!("  Max dwell targets: {}", engine.max_dwell_targets);
    println!("  Unfocus transition: {} ms", engine.unfocus_transition_ms);
    Ok(())
}
