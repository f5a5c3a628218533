use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use vidcrawl::{
    catalog::{merge, Catalog, LoadStatus},
    config::Config,
    scraping::ScrapingCoordinator,
    util::truncate_for_display,
};

pub async fn run_pipeline(config: Config, catalog: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let catalog_path = catalog.unwrap_or_else(|| config.catalog.path.clone());

    let (existing, status) = Catalog::load(&catalog_path);
    match &status {
        LoadStatus::Loaded(count) => info!("Loaded {} records from {}", count, catalog_path.display()),
        LoadStatus::Missing => info!("Starting a new catalog at {}", catalog_path.display()),
        LoadStatus::Unreadable(reason) => {
            warn!("Catalog {} unreadable ({}), starting fresh", catalog_path.display(), reason);
            if !dry_run {
                match Catalog::preserve_unreadable(&catalog_path) {
                    Ok(backup) => warn!("Kept the unreadable catalog at {}", backup.display()),
                    Err(e) => warn!("Could not keep a copy of the unreadable catalog: {}", e),
                }
            }
        }
    }

    let mut coordinator =
        ScrapingCoordinator::from_config(&config).context("Failed to create scraping coordinator")?;

    println!("\nRun Configuration:");
    println!("  Sites: {}", config.sites.len());
    println!("  Catalog: {} ({} records)", catalog_path.display(), existing.len());
    println!("  Max posts per run: {}", config.scraping.max_posts_per_run);
    println!();

    let report = coordinator.run(&config.sites, &existing.index()).await?;
    let outcome = merge(&existing, &report.discoveries);

    for discovery in &report.discoveries {
        println!(
            "  + [{}] {} ({})",
            discovery.site,
            truncate_for_display(&discovery.record.title, 60),
            discovery.tier
        );
    }

    let stats = &report.stats;
    println!("\nRun Summary:");
    println!("============");
    println!(
        "Listing pages: {} fetched, {} failed",
        stats.listing_pages_fetched, stats.listing_failures
    );
    println!("Candidates found: {}", stats.candidates_found);
    println!("Posts visited: {} ({} failed)", stats.posts_visited, stats.post_failures);
    println!(
        "Embeds resolved: {} ({} without embed)",
        stats.embeds_resolved, stats.embeds_missing
    );
    println!("Already known: {}", stats.known_skipped);
    println!("New records: {}", outcome.added);
    if stats.run_cap_reached {
        println!("Stopped at the per-run limit of {} posts", config.scraping.max_posts_per_run);
    }
    println!("Duration: {:.1}s", report.duration.as_secs_f64());

    if dry_run {
        println!("\nDry run: catalog not written");
        return Ok(());
    }

    outcome
        .catalog
        .save(&catalog_path)
        .with_context(|| format!("Failed to save catalog to {}", catalog_path.display()))?;
    println!(
        "\nWrote {} records ({} new) to {}",
        outcome.catalog.len(),
        outcome.added,
        catalog_path.display()
    );

    Ok(())
}
