//! `inkstone build`: compile resources into an artifact when they changed.
//!
//! 1. Load config and locate each resource through the kind's locator
//! 2. Skip the build if the existing artifact is fresh (unless `--force`)
//! 3. Read the sources, record their stamps and stamp provenance
//! 4. Write the string table through the artifact builder

use inkstone_build::{ArtifactBuilder, ArtifactMetadata, BuildOutcome, ProvenanceStamp};
use inkstone_config::InkstoneConfig;

use crate::payload::{load_sources, write_string_table, STRING_TABLE_KIND};
use crate::pipeline::{
    load, locate_sources, output_path, tracker, ENGINE_VERSION, GENERATOR, SIGNATURE_PREFIX,
};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `inkstone build` command. Returns exit code 0 on success.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load(global)?;
    let locator = config.locator(&args.kind)?;
    let artifact = output_path(&config, &args.kind, &args.ids, args.output.as_deref())?;
    let tracker = tracker(&config);

    let mut resources = locate_sources(&locator, &args.ids);
    for resource in resources.iter().filter(|r| r.path.is_none()) {
        tracing::warn!(resource = %resource.id, kind = %args.kind, "source not found");
    }

    if !args.force && tracker.is_artifact_fresh(&artifact, &resources) {
        if !global.quiet {
            eprintln!("     Fresh {}", artifact.display());
        }
        return Ok(0);
    }

    if !global.quiet {
        eprintln!(
            " Compiling {} {} ({})",
            args.kind,
            args.ids.join(", "),
            artifact.display()
        );
    }

    let entries = load_sources(&mut resources);
    let mut metadata = ArtifactMetadata::default();
    tracker.record(&mut metadata, &resources);
    ProvenanceStamp::new(SIGNATURE_PREFIX, GENERATOR).stamp(
        &mut metadata,
        &config.distribution.code_name,
        &config.distribution.version,
        ENGINE_VERSION,
    );

    let outcome = builder(&config).build(&artifact, &metadata, |store| {
        write_string_table(store, &entries)
    })?;

    if !global.quiet {
        report(&outcome);
    }
    Ok(0)
}

/// Builder sized from the `[arena]` table.
fn builder(config: &InkstoneConfig) -> ArtifactBuilder {
    ArtifactBuilder::new()
        .with_initial_capacity(config.arena.initial_capacity)
        .with_growth_factor(config.arena.growth_factor)
        .with_max_capacity(config.arena.max_capacity)
        .with_payload_kind(STRING_TABLE_KIND)
}

fn report(outcome: &BuildOutcome) {
    let retries = match outcome.attempts {
        0 | 1 => String::new(),
        n => format!(", {n} attempts"),
    };
    eprintln!(
        "  Finished {} ({} bytes{retries})",
        outcome.path.display(),
        outcome.size
    );
}
