//! Reset command - wipe every namespace precache owns

use crate::cli::args::ResetArgs;
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::lifecycle::wipe_namespaces;
use crate::runtime;
use crate::ui::{self, UiContext};

pub async fn execute(args: ResetArgs, config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);

    let confirmed = ui::confirm(
        &ctx,
        "Delete the content cache, staging caches and manifest record?",
        false,
    )
    .await?;
    if !confirmed {
        ui::step_info(&ctx, "Reset cancelled (pass --yes to skip the prompt)");
        return Ok(());
    }

    let storage = runtime::create_storage(config).await?;
    let removed = wipe_namespaces(storage.as_ref(), &config.namespaces).await?;

    runtime::create_journal(config)
        .log(
            "reset",
            &serde_json::json!({"cause": "manual", "removed": removed}),
        )
        .await;

    if removed.is_empty() {
        ui::step_info(&ctx, "Nothing to delete");
    } else {
        ui::step_ok_detail(&ctx, "Cache reset", &removed.join(", "));
    }
    Ok(())
}
