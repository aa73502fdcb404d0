//! Cache command - manage cached pretrained models

use crate::audit::{self, AuditLog};
use crate::cache::{CacheEntry, ModelCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::TpodResult;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> TpodResult<()> {
    let cache = ModelCache::new(ConfigManager::cache_dir(config));

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format).await,
        CacheAction::Path => {
            println!("{}", cache.root().display());
            Ok(())
        }
        CacheAction::Clear { key, yes } => {
            let ctx = UiContext::detect().with_auto_yes(yes);
            clear_entries(&ctx, &cache, config, key.as_deref()).await
        }
    }
}

async fn list_entries(cache: &ModelCache, format: OutputFormat) -> TpodResult<()> {
    let entries = cache.list_entries().await?;

    match format {
        OutputFormat::Table => print_table(cache, &entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_table(cache: &ModelCache, entries: &[CacheEntry]) {
    if entries.is_empty() {
        println!("No cached models in {}", cache.root().display());
        return;
    }

    println!("{:<44} {:<18} {:<14}", "KEY", "POPULATED", "SHA256");
    println!("{}", "-".repeat(78));

    for entry in entries {
        let (populated, digest) = match &entry.metadata {
            Some(meta) => (
                meta.populated_at.format("%Y-%m-%d %H:%M").to_string(),
                meta.sha256.chars().take(12).collect::<String>(),
            ),
            None => ("manual".to_string(), "-".to_string()),
        };
        println!("{:<44} {:<18} {:<14}", entry.key, populated, digest);
    }

    println!();
    println!("Total: {} model(s)", entries.len());
}

fn print_json(entries: &[CacheEntry]) -> TpodResult<()> {
    #[derive(Serialize)]
    struct EntryJson<'a> {
        key: &'a str,
        path: String,
        source_url: Option<&'a str>,
        sha256: Option<&'a str>,
        populated_at: Option<String>,
    }

    let json: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            key: &e.key,
            path: e.path.display().to_string(),
            source_url: e.metadata.as_ref().map(|m| m.source_url.as_str()),
            sha256: e.metadata.as_ref().map(|m| m.sha256.as_str()),
            populated_at: e.metadata.as_ref().map(|m| m.populated_at.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn clear_entries(
    ctx: &UiContext,
    cache: &ModelCache,
    config: &Config,
    key: Option<&str>,
) -> TpodResult<()> {
    let targets: Vec<String> = match key {
        Some(key) if cache.is_cached(key) => vec![key.to_string()],
        Some(key) => {
            ui::step_warn_hint(ctx, &format!("{} is not cached", key), "Run: tpod cache list");
            return Ok(());
        }
        None => cache
            .list_entries()
            .await?
            .into_iter()
            .map(|e| e.key)
            .collect(),
    };

    if targets.is_empty() {
        println!("No cached models to clear.");
        return Ok(());
    }

    println!("This will remove {} cached model(s):", targets.len());
    for key in &targets {
        println!("  {} {}", style("•").red(), key);
    }

    if !ui::confirm(ctx, "Remove these models?", false).await? {
        ui::remark(ctx, "Aborted; pass --yes to skip the prompt");
        return Ok(());
    }

    let removed = match key {
        Some(key) => usize::from(cache.remove(key).await?),
        None => cache.clear().await?,
    };

    AuditLog::new(config)
        .log(
            audit::CACHE_CLEARED,
            &serde_json::json!({ "keys": targets, "removed": removed }),
        )
        .await;

    ui::step_ok(ctx, &format!("Cleared {} cached model(s)", removed));
    Ok(())
}
