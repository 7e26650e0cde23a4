//! Prefetch command - fill every manifest resource not yet cached

use crate::config::Config;
use crate::error::PrecacheResult;
use crate::prefetch::OfflinePrefetcher;
use crate::runtime;
use crate::ui::{self, PrefetchProgress, UiContext};
use crate::worker::Worker;

pub async fn execute(config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let worker = Worker::new(runtime::build_context(config).await?);
    fill_with_progress(&ctx, worker.prefetcher()).await?;
    ui::outro_success(&ctx, "Every manifest resource is cached");
    Ok(())
}

/// Run one prefetch batch behind a progress bar
pub(crate) async fn fill_with_progress(
    ctx: &UiContext,
    prefetcher: &OfflinePrefetcher,
) -> PrecacheResult<()> {
    let progress = PrefetchProgress::new(ctx);
    let result = prefetcher
        .prefetch_all_with_progress(&|done, total| progress.update(done, total))
        .await;
    progress.finish();

    let report = result?;
    if report.fetched.is_empty() {
        ui::step_info(ctx, &format!("All {} resources already cached", report.already_cached));
    } else {
        ui::step_ok_detail(
            ctx,
            &format!("Prefetched {} resource(s)", report.fetched.len()),
            &format!("{} already cached", report.already_cached),
        );
    }
    Ok(())
}
