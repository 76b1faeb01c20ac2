//! Cache command - inspect and prune remembered results

use crate::audit::AuditLog;
use crate::cache::{CacheEntry, CacheKey, ResultCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::cli::commands::open_result_cache;
use crate::config::Config;
use crate::error::GenrepoResult;
use crate::ui::{self, UiContext};
use chrono::Duration;
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> GenrepoResult<()> {
    let cache = open_result_cache(config).await?;
    let audit = AuditLog::new(config);
    let ctx = UiContext::detect();

    match args.action {
        CacheAction::List { format } => list_results(&cache, format).await,
        CacheAction::Sweep { days } => {
            let window = days
                .map(|d| Duration::days(i64::from(d)))
                .unwrap_or_else(|| config.cache.retention());
            sweep_results(&ctx, &cache, &audit, window).await
        }
        CacheAction::Clear { yes } => {
            clear_results(&ctx.with_auto_yes(yes), &cache, &audit).await
        }
    }
}

async fn list_results(cache: &ResultCache, format: OutputFormat) -> GenrepoResult<()> {
    let entries = cache.entries().await;

    match format {
        OutputFormat::Table => print_result_table(cache, &entries),
        OutputFormat::Json => print_result_json(&entries)?,
        OutputFormat::Plain => {
            for (key, entry) in &entries {
                println!("{}\t{}", key, entry.result);
            }
        }
    }
    Ok(())
}

fn print_result_table(cache: &ResultCache, entries: &[(CacheKey, CacheEntry)]) {
    if entries.is_empty() {
        println!("No cached results in {}.", cache.path().display());
        return;
    }

    println!(
        "{:<20} {:<24} {:<17} {}",
        "PLATFORM", "REF", "LAST USED", "RESULT"
    );
    println!("{}", "-".repeat(96));

    for (key, entry) in entries {
        let platform = format!("{}/{}/{}", key.distro, key.releasever, key.arch);
        println!(
            "{:<20} {:<24} {:<17} {}",
            platform,
            key.reference,
            entry.last_accessed_at.format("%Y-%m-%d %H:%M"),
            entry.result
        );
        println!("{:<20} {}", "", style(&key.url).dim());
    }

    println!();
    println!("Total: {} result(s)", entries.len());
}

#[derive(Serialize)]
struct ResultJson<'a> {
    key: &'a CacheKey,
    #[serde(flatten)]
    entry: &'a CacheEntry,
}

fn result_json(entries: &[(CacheKey, CacheEntry)]) -> GenrepoResult<String> {
    let rows: Vec<ResultJson<'_>> = entries
        .iter()
        .map(|(key, entry)| ResultJson { key, entry })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

fn print_result_json(entries: &[(CacheKey, CacheEntry)]) -> GenrepoResult<()> {
    println!("{}", result_json(entries)?);
    Ok(())
}

async fn sweep_results(
    ctx: &UiContext,
    cache: &ResultCache,
    audit: &AuditLog,
    window: Duration,
) -> GenrepoResult<()> {
    let removed = cache.sweep(window).await?;

    if removed == 0 {
        ui::step_info(
            ctx,
            &format!("No results unused for more than {} day(s)", window.num_days()),
        );
        return Ok(());
    }

    audit
        .log(
            "cache.swept",
            &serde_json::json!({ "removed": removed, "window_days": window.num_days() }),
        )
        .await;
    ui::step_ok(ctx, &format!("Swept {} stale result(s)", removed));
    Ok(())
}

async fn clear_results(ctx: &UiContext, cache: &ResultCache, audit: &AuditLog) -> GenrepoResult<()> {
    let count = cache.len().await;

    if count == 0 {
        ui::step_info(ctx, "No cached results to clear");
        return Ok(());
    }

    let prompt = format!("Remove {} cached result(s)?", count);
    if !ui::confirm(ctx, &prompt, false).await? {
        ui::step_warn_hint(ctx, "Aborted", "Pass --yes to clear without asking");
        return Ok(());
    }

    let removed = cache.clear_all().await?;
    audit
        .log("cache.cleared", &serde_json::json!({ "removed": removed }))
        .await;
    ui::step_ok(ctx, &format!("Cleared {} result(s)", removed));
    Ok(())
}
