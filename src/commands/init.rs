use anyhow::{Context, Result};
use std::path::PathBuf;
use vidcrawl::config::{Config, STARTER_CONFIG};

pub fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config_path = path.join("vidcrawl.toml");
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    // The starter file must stay loadable
    let config = Config::from_toml(STARTER_CONFIG).context("Starter configuration is invalid")?;

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    std::fs::write(&config_path, STARTER_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created configuration file: {}", config_path.display());

    if let Some(data_dir) = path.join(&config.catalog.path).parent() {
        std::fs::create_dir_all(data_dir)?;
        println!("Created data directory: {}", data_dir.display());
    }

    Ok(())
}
