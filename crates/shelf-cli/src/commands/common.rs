use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelf_core::{
    DatabaseService, FirestoreStore, Product, ShelfConfig, SyncConflict, SyncReport, SyncRun,
};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ProductListItem {
    pub key: String,
    pub name: String,
    pub category: String,
    pub sub_category: String,
    pub link: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub supplier_orders: u64,
    pub rating: f64,
    pub supplier_price: f64,
    pub store_price: f64,
    pub updated_at: Option<DateTime<Utc>>,
    pub relative_time: String,
}

pub fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path)?)
}

pub fn open_remote(config: &ShelfConfig) -> Result<FirestoreStore, CliError> {
    if config.remote.project_id.is_none() {
        return Err(CliError::RemoteNotConfigured);
    }
    Ok(FirestoreStore::new(&config.remote)?)
}

pub fn product_to_list_item(product: &Product, now: DateTime<Utc>) -> ProductListItem {
    ProductListItem {
        key: product.key.to_string(),
        name: product.name.clone(),
        category: product.category.clone(),
        sub_category: product.sub_category.clone(),
        link: product.link.clone(),
        likes: product.likes,
        comments: product.comments,
        supplier_orders: product.supplier_orders,
        rating: product.rating,
        supplier_price: product.supplier_price,
        store_price: product.store_price,
        updated_at: product.updated_at,
        relative_time: describe_updated_at(product.updated_at, now),
    }
}

pub fn format_product_lines(products: &[Product], now: DateTime<Utc>) -> Vec<String> {
    products
        .iter()
        .map(|product| {
            let short_key = product.key.as_str().chars().take(13).collect::<String>();
            let name = truncate_text(&product.name, 32);
            let category = truncate_text(&product.category, 16);
            let price = format!("{:.2}", product.store_price);
            let relative_time = describe_updated_at(product.updated_at, now);
            format!("{short_key:<13}  {name:<32}  {category:<16}  {price:>9}  {relative_time}")
        })
        .collect()
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let outcome = &report.outcome;
    let mut lines = vec![format!(
        "{}: {} ({} inserted, {} updated, {} skipped, {} failed)",
        outcome.direction,
        report.signal.as_str(),
        outcome.inserted,
        outcome.updated,
        outcome.skipped,
        outcome.failed
    )];

    for failure in &outcome.failures {
        lines.push(format!("  failed    {}: {}", failure.key, failure.error));
    }
    for conflict in &outcome.conflicts {
        lines.push(format!(
            "  kept      {}: target {} is newer than source {}",
            conflict.key,
            format_optional_timestamp(conflict.target_updated_at),
            format_optional_timestamp(conflict.source_updated_at)
        ));
    }
    if outcome.cancelled {
        lines.push(format!(
            "  cancelled after {} records",
            outcome.processed()
        ));
    }

    lines
}

pub fn format_run_lines(runs: &[SyncRun]) -> Vec<String> {
    runs.iter()
        .map(|run| {
            format!(
                "{}  {:<15}  {:<15}  +{} ~{} ={} !{}",
                format_sync_timestamp(run.started_at),
                run.direction.as_str(),
                run.signal.as_str(),
                run.inserted,
                run.updated,
                run.skipped,
                run.failed
            )
        })
        .collect()
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {:<15}  product={}  source={} target={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.direction.as_str(),
                conflict.key,
                format_optional_timestamp(conflict.source_updated_at),
                format_optional_timestamp(conflict.target_updated_at)
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_optional_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(|| "-".to_string(), format_sync_timestamp)
}

fn describe_updated_at(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    updated_at.map_or_else(
        || "never".to_string(),
        |updated_at| format_relative_time(updated_at.timestamp_millis(), now.timestamp_millis()),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn normalize_name(name: &str) -> Result<String, CliError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyName)
    } else {
        Ok(trimmed.to_string())
    }
}
