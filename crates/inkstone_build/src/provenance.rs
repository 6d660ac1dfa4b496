//! Build provenance written into artifact metadata.

use chrono::{DateTime, Local, TimeZone};

use crate::metadata::MetadataSink;

/// Writes who built an artifact, when, and for which distribution.
///
/// All fields go under `<key_prefix>/`. Stamping again overwrites them.
#[derive(Debug, Clone)]
pub struct ProvenanceStamp {
    key_prefix: String,
    generator: String,
}

impl ProvenanceStamp {
    /// Creates a stamp that writes under `key_prefix` naming `generator` as
    /// the producer.
    pub fn new(key_prefix: &str, generator: &str) -> Self {
        Self {
            key_prefix: key_prefix.to_string(),
            generator: generator.to_string(),
        }
    }

    /// Returns the key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Stamps `sink` with the current local time.
    pub fn stamp(
        &self,
        sink: &mut dyn MetadataSink,
        distribution_code_name: &str,
        distribution_version: &str,
        engine_version: &str,
    ) {
        self.stamp_at(
            sink,
            &Local::now(),
            distribution_code_name,
            distribution_version,
            engine_version,
        );
    }

    /// Stamps `sink` with an explicit build time.
    pub fn stamp_at<Tz: TimeZone>(
        &self,
        sink: &mut dyn MetadataSink,
        time: &DateTime<Tz>,
        distribution_code_name: &str,
        distribution_version: &str,
        engine_version: &str,
    ) where
        Tz::Offset: std::fmt::Display,
    {
        sink.set_string(&self.key("generator"), &self.generator);
        sink.set_string(&self.key("modified_time"), &format_build_time(time));
        sink.set_string(&self.key("distribution_code_name"), distribution_code_name);
        sink.set_string(&self.key("distribution_version"), distribution_version);
        sink.set_string(&self.key("engine_version"), engine_version);
    }

    fn key(&self, field: &str) -> String {
        format!("{}/{}", self.key_prefix, field)
    }
}

/// Formats `time` the way C `ctime` does, without the trailing newline,
/// e.g. `Tue Nov 14 22:13:20 2023`.
pub fn format_build_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%a %b %e %H:%M:%S %Y").to_string().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ArtifactMetadata;
    use chrono::Utc;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap()
    }

    #[test]
    fn ctime_format() {
        assert_eq!(format_build_time(&fixed_time()), "Tue Nov 14 22:13:20 2023");
        let single_digit_day = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 9).unwrap();
        assert_eq!(
            format_build_time(&single_digit_day),
            "Tue Mar  5 08:00:09 2024"
        );
    }

    #[test]
    fn stamp_writes_all_fields() {
        let mut metadata = ArtifactMetadata::default();
        ProvenanceStamp::new("signature", "inkstone-cli").stamp_at(
            &mut metadata,
            &fixed_time(),
            "Stonebridge",
            "0.3.0",
            "0.1.0",
        );

        assert_eq!(metadata.get_string("signature/generator"), Some("inkstone-cli"));
        assert_eq!(
            metadata.get_string("signature/modified_time"),
            Some("Tue Nov 14 22:13:20 2023")
        );
        assert_eq!(
            metadata.get_string("signature/distribution_code_name"),
            Some("Stonebridge")
        );
        assert_eq!(metadata.get_string("signature/distribution_version"), Some("0.3.0"));
        assert_eq!(metadata.get_string("signature/engine_version"), Some("0.1.0"));
        assert_eq!(metadata.entries.len(), 5);
    }

    #[test]
    fn restamp_overwrites() {
        let mut metadata = ArtifactMetadata::default();
        let stamp = ProvenanceStamp::new("signature", "gen");
        stamp.stamp(&mut metadata, "a", "1", "0.1.0");
        stamp.stamp(&mut metadata, "b", "2", "0.1.0");
        assert_eq!(metadata.entries.len(), 5);
        assert_eq!(
            metadata.get_string("signature/distribution_code_name"),
            Some("b")
        );
        let time = metadata.get_string("signature/modified_time").unwrap();
        assert!(!time.contains('\n'));
        assert_eq!(time, time.trim());
    }
}
