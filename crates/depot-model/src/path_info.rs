//! Artifact path classification
//!
//! Write-eligibility policy needs to know whether an uploaded path is a
//! release artifact, a snapshot artifact, or neither (metadata, checksums,
//! indexes). [`ArtifactPathInfo`] parses standard repository layout
//! (`group/dirs/artifactId/version/file`) just far enough to answer that.

use once_cell::sync::Lazy;
use regex::Regex;

/// Timestamped snapshot qualifier, e.g. `app-1.0-20240408.123456-3.jar`.
static TIMESTAMPED_SNAPSHOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d{8}\.\d{6}-\d+").expect("snapshot pattern compiles"));

/// Coordinates parsed from an artifact path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPathInfo {
    /// Dotted group id, from the leading directories
    pub group_id: String,
    /// Artifact id, the directory above the version
    pub artifact_id: String,
    /// Version directory
    pub version: String,
    /// File name
    pub file: String,
}

impl ArtifactPathInfo {
    /// Parse a repository path into artifact coordinates.
    ///
    /// Returns `None` for paths that are not artifact files: too few
    /// segments, or a file name that does not start with the artifact id
    /// (metadata and index files land here). Such paths carry no
    /// release/snapshot classification and are storable wherever a hosted
    /// target accepts them.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.len() < 4 {
            return None;
        }

        let file = segments[segments.len() - 1];
        let version = segments[segments.len() - 2];
        let artifact_id = segments[segments.len() - 3];
        let group_id = segments[..segments.len() - 3].join(".");

        // Artifact files are named `<artifactId>-<version...>`; anything else
        // (maven-metadata.xml and friends) is not an artifact.
        if !file.starts_with(&format!("{artifact_id}-")) {
            return None;
        }

        Some(Self {
            group_id,
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            file: file.to_string(),
        })
    }

    /// True when the path is a snapshot artifact: the version directory ends
    /// in `-SNAPSHOT`, or the file carries a timestamped build qualifier.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT") || TIMESTAMPED_SNAPSHOT.is_match(&self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_release_artifact() {
        let info = ArtifactPathInfo::parse("org/example/app/1.0/app-1.0.jar").unwrap();
        assert_eq!(info.group_id, "org.example");
        assert_eq!(info.artifact_id, "app");
        assert_eq!(info.version, "1.0");
        assert_eq!(info.file, "app-1.0.jar");
        assert!(!info.is_snapshot());
    }

    #[test]
    fn classifies_snapshot_version_directory() {
        let info =
            ArtifactPathInfo::parse("org/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.jar").unwrap();
        assert!(info.is_snapshot());
    }

    #[test]
    fn classifies_timestamped_snapshot_file() {
        let info = ArtifactPathInfo::parse(
            "org/example/app/1.0-SNAPSHOT/app-1.0-20240408.123456-3.jar",
        )
        .unwrap();
        assert!(info.is_snapshot());
    }

    #[test]
    fn metadata_paths_are_not_artifacts() {
        assert_eq!(
            ArtifactPathInfo::parse("org/example/app/maven-metadata.xml"),
            None
        );
        assert_eq!(ArtifactPathInfo::parse("index.html"), None);
        assert_eq!(ArtifactPathInfo::parse("org/example"), None);
    }

    #[test]
    fn leading_and_trailing_slashes_ignored() {
        let info = ArtifactPathInfo::parse("/org/example/app/2.1/app-2.1.pom").unwrap();
        assert_eq!(info.version, "2.1");
    }
}
