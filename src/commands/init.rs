use anyhow::{Context, Result};
use scopecrawl::config::Config;
use std::path::Path;

pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let toml_content = format!(
        "# scopecrawl configuration\n\n{}",
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")?
    );

    std::fs::write(path, toml_content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created configuration file: {}", path.display());

    Ok(())
}
