//! Status command - show cache namespaces against the current release

use crate::config::schema::StorageBackend;
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::manifest::{Manifest, ManifestStore, Release, ResourceKey};
use crate::runtime;
use crate::ui::{self, UiContext};
use std::collections::BTreeSet;

pub async fn execute(config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "precache status");

    let storage = runtime::create_storage(config).await?;
    let ns = &config.namespaces;

    ui::section(&ctx, "Storage");
    ui::key_value(&ctx, "Backend", storage.backend_name());
    if config.storage.backend == StorageBackend::Disk {
        ui::key_value(&ctx, "Location", &runtime::storage_dir(config).display().to_string());
    }

    let cached: BTreeSet<ResourceKey> = storage.keys(&ns.content).await?.into_iter().collect();
    ui::key_value(&ctx, "Content entries", &cached.len().to_string());

    let staging = storage
        .namespaces()
        .await?
        .into_iter()
        .filter(|name| ns.is_staging(name))
        .count();
    ui::key_value_status(&ctx, "Leftover staging", &staging.to_string(), staging == 0);

    let record = match ManifestStore::new(storage.clone(), ns.manifest.clone()).load().await {
        Ok(Some(record)) => {
            ui::key_value_status(&ctx, "Manifest record", &format!("{} keys", record.len()), true);
            Some(record)
        }
        Ok(None) => {
            ui::key_value_status(&ctx, "Manifest record", "none, next upgrade starts cold", false);
            None
        }
        Err(e) => {
            ui::step_error_detail(&ctx, "Manifest record", &e.to_string());
            ui::remark(&ctx, "Run: precache reset");
            None
        }
    };

    ui::section(&ctx, "Release");
    match Release::load(&config.build.manifest, &config.build.shell).await {
        Ok(release) => show_release(&ctx, &release, &cached, record.as_ref()),
        Err(e) => ui::step_warn_hint(
            &ctx,
            &format!("Release not readable: {}", e),
            "Check build.manifest and build.shell",
        ),
    }

    Ok(())
}

fn show_release(
    ctx: &UiContext,
    release: &Release,
    cached: &BTreeSet<ResourceKey>,
    record: Option<&Manifest>,
) {
    let manifest = release.manifest();
    let present = manifest.keys().filter(|key| cached.contains(*key)).count();
    let extra = cached.iter().filter(|key| !manifest.contains(key)).count();
    let activated = record == Some(manifest);

    ui::key_value(ctx, "Resources", &manifest.len().to_string());
    ui::key_value_styled(
        ctx,
        "Cached",
        &format!("{}/{}", present, manifest.len()),
        ui::coverage_style(present, manifest.len()),
    );
    ui::key_value_status(ctx, "Not in release", &extra.to_string(), extra == 0);
    ui::key_value_status(
        ctx,
        "Activated",
        if activated { "yes" } else { "no" },
        activated,
    );

    if !activated {
        ui::remark(ctx, "Run: precache upgrade");
    } else if present < manifest.len() {
        ui::remark(ctx, "Run: precache prefetch to cache the rest for offline use");
    }
}
