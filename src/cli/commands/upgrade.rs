//! Upgrade command - install and activate the current release

use super::prefetch::fill_with_progress;
use crate::cli::args::UpgradeArgs;
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::host::{Registration, UpdateOutcome};
use crate::lifecycle::ActivationOutcome;
use crate::runtime;
use crate::ui::{self, TaskSpinner, UiContext};
use crate::worker::Worker;
use std::sync::Arc;

pub async fn execute(args: UpgradeArgs, config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "precache upgrade");

    let worker_ctx = runtime::build_context(config).await?;
    ui::key_value(
        &ctx,
        "Release",
        &format!(
            "{} resources, {} in shell",
            worker_ctx.release.manifest().len(),
            worker_ctx.release.shell().len()
        ),
    );
    ui::key_value(&ctx, "Origin", worker_ctx.normalizer.base().as_str());

    let registration = Registration::new();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Staging shell resources...");

    let outcome = match registration.update(Arc::new(Worker::new(worker_ctx))).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Install failed, cache left untouched");
            return Err(e);
        }
    };

    let (staged, activation) = match outcome {
        UpdateOutcome::Promoted { staged, activation } => (staged, activation),
        UpdateOutcome::Waiting { staged } => {
            spinner.stop_warn(&format!(
                "Staged {} shell resource(s), waiting for the active instance",
                staged
            ));
            return Ok(());
        }
    };
    spinner.stop(&format!("Staged {} shell resource(s)", staged));

    match activation {
        ActivationOutcome::Activated(report) => {
            ui::step_ok(&ctx, "Activated");
            ui::key_value_styled(
                &ctx,
                "Mode",
                ui::activation_detail(report.mode),
                ui::activation_style(report.mode),
            );
            if !report.evicted.is_empty() {
                ui::step_info(&ctx, &format!("Evicted {} stale entries", report.evicted.len()));
            }
        }
        ActivationOutcome::Reset { cause } => {
            ui::step_warn_hint(
                &ctx,
                &format!("Activation failed ({}), cache reset", cause),
                "Run: precache upgrade",
            );
            ui::outro_warn(&ctx, "Cache is empty and refills on demand");
            return Ok(());
        }
    }

    if args.prefetch {
        if let Some(active) = registration.active().await {
            fill_with_progress(&ctx, active.prefetcher()).await?;
        }
    }

    ui::outro_success(&ctx, "Cache up to date");
    Ok(())
}
