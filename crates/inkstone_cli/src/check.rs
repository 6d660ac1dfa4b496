//! `inkstone check`: report whether an artifact is up to date.

use inkstone_build::read_metadata;

use crate::pipeline::{load, locate_sources, output_path, tracker};
use crate::{CheckArgs, GlobalArgs};

/// Exit code for a stale or unusable artifact.
pub const EXIT_STALE: i32 = 2;

/// Runs the `inkstone check` command.
///
/// Returns 0 when the artifact is fresh and [`EXIT_STALE`] when it must be
/// rebuilt.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load(global)?;
    let locator = config.locator(&args.kind)?;
    let artifact = output_path(&config, &args.kind, &args.ids, args.output.as_deref())?;
    let resources = locate_sources(&locator, &args.ids);

    let metadata = match read_metadata(&artifact) {
        Ok(metadata) => metadata,
        Err(e) => {
            if !global.quiet {
                eprintln!("     Stale {}: no usable build record ({e})", artifact.display());
            }
            return Ok(EXIT_STALE);
        }
    };

    let report = tracker(&config).check(&metadata.build_info, &resources);
    if !global.quiet {
        if let Some(ref newer) = report.newer_engine {
            eprintln!("     Stale {}: built by newer engine {newer}", artifact.display());
        }
        for (id, reason) in &report.stale {
            eprintln!("     Stale {id}: {reason}");
        }
        if report.is_fresh() {
            eprintln!("     Fresh {}", artifact.display());
        }
    }

    Ok(if report.is_fresh() { 0 } else { EXIT_STALE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use inkstone_common::set_last_write_time;

    use crate::BuildArgs;

    const CONFIG: &str = r#"
[paths]
user_data_dir = "."

[[resource_kinds]]
name = "dict"
suffix = ".dict.yaml"
"#;

    fn setup() -> (tempfile::TempDir, GlobalArgs) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inkstone.toml"), CONFIG).unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: Some(dir.path().to_string_lossy().into_owned()),
        };
        (dir, global)
    }

    fn check_args() -> CheckArgs {
        CheckArgs {
            kind: "dict".to_string(),
            ids: vec!["luna".to_string()],
            output: None,
        }
    }

    fn build(global: &GlobalArgs) {
        let args = BuildArgs {
            kind: "dict".to_string(),
            ids: vec!["luna".to_string()],
            output: None,
            force: false,
        };
        crate::build::run(&args, global).unwrap();
    }

    fn write_source(dir: &Path, text: &str, mtime: i64) {
        let path = dir.join("luna.dict.yaml");
        std::fs::write(&path, text).unwrap();
        set_last_write_time(&path, mtime).unwrap();
    }

    #[test]
    fn missing_artifact_is_stale() {
        let (_dir, global) = setup();
        assert_eq!(run(&check_args(), &global).unwrap(), EXIT_STALE);
    }

    #[test]
    fn fresh_then_stale() {
        let (dir, global) = setup();
        write_source(dir.path(), "v1", 1_700_000_000);
        build(&global);
        assert_eq!(run(&check_args(), &global).unwrap(), 0);

        write_source(dir.path(), "v2", 1_700_000_100);
        assert_eq!(run(&check_args(), &global).unwrap(), EXIT_STALE);
    }

    #[test]
    fn extra_resource_is_stale() {
        let (dir, global) = setup();
        write_source(dir.path(), "v1", 1_700_000_000);
        build(&global);

        let mut args = check_args();
        args.ids.push("essay".to_string());
        std::fs::write(dir.path().join("essay.dict.yaml"), "e").unwrap();
        assert_eq!(run(&args, &global).unwrap(), EXIT_STALE);
    }

    #[test]
    fn corrupt_artifact_is_stale() {
        let (dir, global) = setup();
        let path = dir.path().join("build").join("luna.dict.bin");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not an artifact").unwrap();
        assert_eq!(run(&check_args(), &global).unwrap(), EXIT_STALE);
    }
}
