//! `inkstone inspect`: print an artifact's header, build record and metadata.

use std::collections::BTreeMap;
use std::path::Path;

use inkstone_build::{Artifact, ResourceStamp};
use serde::Serialize;

use crate::{GlobalArgs, InspectArgs, ReportFormat};

/// Everything `inspect` prints.
#[derive(Debug, Serialize)]
pub struct InspectReport<'a> {
    /// Artifact path.
    pub path: String,
    /// Header format version.
    pub format_version: u32,
    /// Header payload kind tag.
    pub payload_kind: u32,
    /// File size in bytes.
    pub size: usize,
    /// Engine that built the artifact.
    pub engine_version: &'a str,
    /// Distribution identity recorded at build time.
    pub distribution: &'a str,
    /// Per-resource stamps.
    pub resources: &'a BTreeMap<String, ResourceStamp>,
    /// Free-form metadata entries.
    pub entries: &'a BTreeMap<String, String>,
}

impl<'a> InspectReport<'a> {
    /// Collects the report for an open artifact.
    pub fn new(artifact: &'a Artifact) -> Self {
        let record = artifact.build_record();
        Self {
            path: artifact.path().display().to_string(),
            format_version: artifact.header().format_version(),
            payload_kind: artifact.header().payload_kind(),
            size: artifact.len(),
            engine_version: &record.engine_version,
            distribution: &record.distribution,
            resources: &record.resources,
            entries: &artifact.metadata().entries,
        }
    }

    /// Renders the report for a terminal.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("artifact:       {}\n", self.path));
        out.push_str(&format!(
            "format:         v{} (payload kind {})\n",
            self.format_version, self.payload_kind
        ));
        out.push_str(&format!("size:           {} bytes\n", self.size));
        out.push_str(&format!("engine:         {}\n", self.engine_version));
        if !self.distribution.is_empty() {
            out.push_str(&format!("distribution:   {}\n", self.distribution));
        }
        out.push_str(&format!("resources:      {}\n", self.resources.len()));
        for (id, stamp) in self.resources {
            let checksum = stamp
                .checksum
                .map(|c| format!("{c:08x}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  {id:<24} {:>12}  {checksum}\n",
                stamp.timestamp
            ));
        }
        if !self.entries.is_empty() {
            out.push_str("metadata:\n");
            for (key, value) in self.entries {
                out.push_str(&format!("  {key} = {value}\n"));
            }
        }
        out
    }
}

/// Runs the `inkstone inspect` command. Returns exit code 0 on success.
pub fn run(args: &InspectArgs, _global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let artifact = Artifact::open(Path::new(&args.artifact))?;
    let report = InspectReport::new(&artifact);
    match args.format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}
