//! Commit and push the data directory after a changed run

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lawmirror_gii::RunOutcome;

use crate::config::PublishConfig;

/// What the publish step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    /// Run outcome was unchanged or publishing is disabled
    Skipped,
    /// Files changed on disk but git saw no difference
    NothingToCommit,
    Committed { message: String, pushed: bool },
}

/// Commit message for a run finished at `now`.
pub fn commit_message(now: DateTime<Utc>) -> String {
    format!("Auto-Update {}", now.format("%Y-%m-%dT%H:%M:%SZ"))
}

/// Stage `data_dir`, commit and optionally push.
///
/// Runs git in `workdir`. Does nothing unless the outcome is changed and
/// publishing is enabled.
pub fn publish(
    outcome: RunOutcome,
    workdir: &Path,
    data_dir: &Path,
    config: &PublishConfig,
) -> Result<Published> {
    if !config.enabled {
        log::debug!("publish disabled");
        return Ok(Published::Skipped);
    }
    if !outcome.is_changed() {
        log::info!("No changes, skipping commit");
        return Ok(Published::Skipped);
    }

    let data = data_dir.to_string_lossy();
    git(workdir, config, &["add", "--", &data])?;

    if !has_staged_changes(workdir, &data)? {
        log::warn!("git: nothing to commit");
        return Ok(Published::NothingToCommit);
    }

    let message = commit_message(Utc::now());
    git(workdir, config, &["commit", "-m", &message, "--", &data])?;
    log::info!("Committed: {message}");

    if config.push {
        git(workdir, config, &["push", &config.remote])?;
        log::info!("Pushed to {}", config.remote);
    }

    Ok(Published::Committed {
        message,
        pushed: config.push,
    })
}

fn git_command(workdir: &Path, config: &PublishConfig) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    if let Some(name) = &config.author_name {
        cmd.arg("-c").arg(format!("user.name={name}"));
    }
    if let Some(email) = &config.author_email {
        cmd.arg("-c").arg(format!("user.email={email}"));
    }
    cmd
}

fn git(workdir: &Path, config: &PublishConfig, args: &[&str]) -> Result<()> {
    let output = git_command(workdir, config)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run git {}", args[0]))?;

    if !output.status.success() {
        anyhow::bail!(
            "git {} failed ({}): {}",
            args[0],
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// `git diff --cached --quiet` exits 1 when something is staged.
fn has_staged_changes(workdir: &Path, data: &str) -> Result<bool> {
    let status = Command::new("git")
        .current_dir(workdir)
        .args(["diff", "--cached", "--quiet", "--", data])
        .status()
        .context("Failed to run git diff")?;

    match status.code() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => anyhow::bail!("git diff failed ({status})"),
    }
}
