use std::path::Path;

use shelf_core::{
    CancellationToken, ShelfConfig, SyncCoordinator, SyncDirection, SyncReport, SyncSignal,
};

use crate::commands::common::{
    format_report_lines, format_run_lines, format_sync_conflict_lines, open_database, open_remote,
};
use crate::error::CliError;

/// Exit status when any record failed
pub const EXIT_INCOMPLETE: u8 = 2;
/// Exit status when a run was interrupted
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    Push,
    Pull,
    Both,
}

pub async fn run_sync(
    mode: SyncMode,
    as_json: bool,
    config: &ShelfConfig,
    db_path: &Path,
) -> Result<u8, CliError> {
    let local = open_database(db_path)?;
    let journal = local.clone();
    let remote = open_remote(config)?;
    let coordinator = SyncCoordinator::new(local, remote).with_concurrency(config.concurrency);

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; waiting for in-flight records");
            watcher.cancel();
        }
    });

    let result = match mode {
        SyncMode::Push => coordinator
            .sync(SyncDirection::LocalToRemote, &cancel)
            .await
            .map(|report| vec![report]),
        SyncMode::Pull => coordinator
            .sync(SyncDirection::RemoteToLocal, &cancel)
            .await
            .map(|report| vec![report]),
        SyncMode::Both => coordinator.sync_both(&cancel).await,
    };
    interrupt.abort();
    let reports = result?;

    for report in &reports {
        if let Err(error) = journal.record_run(&report.outcome).await {
            tracing::warn!("Failed to journal {} run: {error}", report.outcome.direction);
        }
    }

    if as_json {
        let json = match reports.as_slice() {
            [report] => serde_json::to_string_pretty(report)?,
            _ => serde_json::to_string_pretty(&reports)?,
        };
        println!("{json}");
    } else {
        for line in reports.iter().flat_map(format_report_lines) {
            println!("{line}");
        }
    }

    Ok(exit_status(&reports))
}

/// Process exit status summarizing a batch of runs
pub fn exit_status(reports: &[SyncReport]) -> u8 {
    if reports
        .iter()
        .any(|report| report.signal == SyncSignal::Cancelled)
    {
        EXIT_CANCELLED
    } else if reports.iter().any(|report| {
        matches!(
            report.signal,
            SyncSignal::Failed | SyncSignal::PartialFailure
        )
    }) {
        EXIT_INCOMPLETE
    } else {
        0
    }
}

pub async fn run_sync_history(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let runs = db.list_runs(limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No sync runs recorded.");
        return Ok(());
    }

    for line in format_run_lines(&runs) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let conflicts = db.list_conflicts(limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
