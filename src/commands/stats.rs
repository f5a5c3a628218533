use anyhow::Result;
use std::path::PathBuf;
use vidcrawl::{
    catalog::{Catalog, LoadStatus},
    config::Config,
};

pub fn show_stats(config: Config, catalog: Option<PathBuf>) -> Result<()> {
    let catalog_path = catalog.unwrap_or_else(|| config.catalog.path.clone());
    let (catalog, status) = Catalog::load(&catalog_path);

    match status {
        LoadStatus::Missing => {
            println!("No catalog at {}", catalog_path.display());
            return Ok(());
        }
        LoadStatus::Unreadable(reason) => {
            anyhow::bail!("Catalog {} is unreadable: {}", catalog_path.display(), reason);
        }
        LoadStatus::Loaded(_) => {}
    }

    println!("\nCatalog Statistics:");
    println!("===================");
    println!("File: {}", catalog_path.display());
    println!("Total records: {}", catalog.len());

    let records = catalog.records();
    let with_thumbnail = records.iter().filter(|r| !r.thumbnail_url.is_empty()).count();
    let total_views: u64 = records.iter().map(|r| r.views()).sum();
    println!("With thumbnail: {}", with_thumbnail);
    println!("Total views: {}", total_views);

    if let Some(latest) = records.iter().filter_map(|r| r.uploaded_at.as_deref()).max() {
        println!("Latest upload: {}", latest);
    }

    let counts = catalog.category_counts();
    if !counts.is_empty() {
        println!("\nBy category:");
        for (category, count) in counts {
            let label = if category.is_empty() { "(none)" } else { category.as_str() };
            println!("  {:<20} {}", label, count);
        }
    }

    Ok(())
}
