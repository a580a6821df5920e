use serde::Deserialize;

/// Server release line reported by `/api/version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TsdbVersion {
    V2_0,
    V2_1,
    V2_2,
    V2_3,
    V2_4,
    V3_0,
    Unknown,
}

/// Known release tags, in match order.
const KNOWN: [(&str, TsdbVersion); 6] = [
    ("2.0", TsdbVersion::V2_0),
    ("2.1", TsdbVersion::V2_1),
    ("2.2", TsdbVersion::V2_2),
    ("2.3", TsdbVersion::V2_3),
    ("2.4", TsdbVersion::V2_4),
    ("3.0", TsdbVersion::V3_0),
];

#[derive(Deserialize)]
struct VersionReply {
    version: Option<String>,
}

impl TsdbVersion {
    pub fn tag(self) -> Option<&'static str> {
        KNOWN.iter().find(|(_, v)| *v == self).map(|(tag, _)| *tag)
    }

    /// Match a version string like `"2.4.0-SNAPSHOT"` against the known tags.
    pub fn from_version_str(version: &str) -> Self {
        KNOWN
            .iter()
            .find(|(tag, _)| version.contains(tag))
            .map_or(TsdbVersion::Unknown, |(_, v)| *v)
    }

    /// Parse a `/api/version` reply body. Anything unparseable is `Unknown`.
    pub fn from_reply(body: &str) -> Self {
        serde_json::from_str::<VersionReply>(body)
            .ok()
            .and_then(|r| r.version)
            .map_or(TsdbVersion::Unknown, |v| Self::from_version_str(&v))
    }
}

impl std::fmt::Display for TsdbVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag().unwrap_or("unknown"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_release_lines() {
        let cases = [
            ("2.0.1", TsdbVersion::V2_0),
            ("2.1", TsdbVersion::V2_1),
            ("2.2.0", TsdbVersion::V2_2),
            ("v2.3.1-RC2", TsdbVersion::V2_3),
            ("2.4.0-SNAPSHOT", TsdbVersion::V2_4),
            ("3.0.0", TsdbVersion::V3_0),
        ];
        for (raw, expected) in cases {
            assert_eq!(TsdbVersion::from_version_str(raw), expected, "{raw}");
        }
    }

    #[test]
    fn unmatched_versions_are_unknown() {
        assert_eq!(TsdbVersion::from_version_str("1.1.0"), TsdbVersion::Unknown);
        assert_eq!(TsdbVersion::from_version_str(""), TsdbVersion::Unknown);
    }

    #[test]
    fn reply_parsing() {
        let body = r#"{"timestamp":"1362712695","host":"localhost","repo":"/opt/opentsdb/build","full_revision":"11c5eefd79f0c800b703ebd29c10e7f924c01572","short_revision":"11c5eef","user":"localuser","version":"2.0.0"}"#;
        assert_eq!(TsdbVersion::from_reply(body), TsdbVersion::V2_0);
        assert_eq!(TsdbVersion::from_reply(r#"{"host":"x"}"#), TsdbVersion::Unknown);
        assert_eq!(TsdbVersion::from_reply(r#"{"version":null}"#), TsdbVersion::Unknown);
        assert_eq!(TsdbVersion::from_reply("not json"), TsdbVersion::Unknown);
        assert_eq!(TsdbVersion::from_reply(r#"{"version":2.4}"#), TsdbVersion::Unknown);
    }

    #[test]
    fn display_uses_tag() {
        assert_eq!(TsdbVersion::V2_3.to_string(), "2.3");
        assert_eq!(TsdbVersion::Unknown.to_string(), "unknown");
    }
}
