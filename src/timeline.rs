//! Running total of challenge solutions credited to a set of wallets.

use crate::{Error, Result, Wallet};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_WALLETS: &str = "wallets.json";
pub const DEFAULT_CHALLENGES: &str = "challenges.json";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineConfig {
    pub wallets: PathBuf,
    pub challenges: PathBuf,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            wallets: PathBuf::from(DEFAULT_WALLETS),
            challenges: PathBuf::from(DEFAULT_CHALLENGES),
        }
    }
}

/// One entry of the challenge dataset.
///
/// Both fields stay loosely typed so a single odd challenge is skipped
/// rather than failing the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Challenge {
    #[serde(default)]
    pub discovered_at: Value,
    #[serde(default)]
    pub solved_by: Value,
}

impl Challenge {
    /// String entries of `solved_by`; anything else is ignored.
    pub fn solvers(&self) -> impl Iterator<Item = &str> {
        self.solved_by
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// Solvers that belong to `addresses`, or every solver if the set is empty.
    pub fn solutions_by(&self, addresses: &HashSet<String>) -> usize {
        if addresses.is_empty() {
            return self.solvers().count();
        }
        self.solvers().filter(|addr| addresses.contains(*addr)).count()
    }

    /// Whether `discovered_at` is absent or empty (`null`, `""`, `0`, `false`, `[]`, `{}`).
    pub fn is_undated(&self) -> bool {
        match &self.discovered_at {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionPoint {
    pub challenge: String,
    pub discovered_at: NaiveDateTime,
    pub solutions: usize,
    pub cumulative: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnparsedTimestamp {
    pub challenge: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub points: Vec<SolutionPoint>,
    pub unparsed: Vec<UnparsedTimestamp>,
}

impl Timeline {
    pub fn total(&self) -> usize {
        self.points.last().map_or(0, |p| p.cumulative)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Collects the string addresses of a merged wallet file.
///
/// Every element has to be a wallet; one without an `address` fails the load.
pub fn load_addresses(path: &Path) -> Result<HashSet<String>> {
    let Value::Array(items) = parse::<Value>(path, &read(path)?)? else {
        return Err(Error::NotAnArray(path.to_path_buf()));
    };

    let mut addresses = HashSet::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let wallet = Wallet::from_value(item).ok_or_else(|| Error::MissingAddress {
            path: path.to_path_buf(),
            index,
        })?;
        if let Some(addr) = wallet.address_str() {
            addresses.insert(addr.to_string());
        }
    }
    Ok(addresses)
}

/// Loads the challenge dataset (id -> challenge), keeping file order.
pub fn load_challenges(path: &Path) -> Result<Vec<(String, Challenge)>> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            Error::ChallengesNotFound(path.to_path_buf())
        } else {
            Error::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let raw: Map<String, Value> = parse(path, &content)?;
    raw.into_iter()
        .map(|(id, value)| {
            serde_json::from_value(value)
                .map(|challenge| (id, challenge))
                .map_err(|source| Error::Parse {
                    path: path.to_path_buf(),
                    source,
                })
        })
        .collect()
}

/// Parses an ISO-8601 timestamp. Offsets are folded into UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Orders solved challenges by discovery time and accumulates their counts.
///
/// Challenges without a discovery time or without matching solvers are
/// left out. Unparseable timestamps are reported in `unparsed`.
pub fn build_timeline(
    challenges: &[(String, Challenge)],
    addresses: &HashSet<String>,
) -> Timeline {
    let mut dated = Vec::new();
    let mut unparsed = Vec::new();

    for (id, challenge) in challenges {
        if challenge.is_undated() {
            continue;
        }

        let solutions = challenge.solutions_by(addresses);
        if solutions == 0 {
            continue;
        }

        match challenge.discovered_at.as_str().and_then(parse_timestamp) {
            Some(ts) => dated.push((id, ts, solutions)),
            None => unparsed.push(UnparsedTimestamp {
                challenge: id.clone(),
                value: challenge
                    .discovered_at
                    .as_str()
                    .map_or_else(|| challenge.discovered_at.to_string(), String::from),
            }),
        }
    }

    dated.sort_by_key(|(_, ts, _)| *ts);

    let mut cumulative = 0;
    let points = dated
        .into_iter()
        .map(|(id, discovered_at, solutions)| {
            cumulative += solutions;
            SolutionPoint {
                challenge: id.clone(),
                discovered_at,
                solutions,
                cumulative,
            }
        })
        .collect();

    Timeline { points, unparsed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(discovered_at: Option<&str>, solved_by: &[&str]) -> Challenge {
        Challenge {
            discovered_at: discovered_at.map_or(Value::Null, Value::from),
            solved_by: Value::from(solved_by.to_vec()),
        }
    }

    fn set(addrs: &[&str]) -> HashSet<String> {
        addrs.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn default_config_paths() {
        let config = TimelineConfig::default();
        assert_eq!(config.wallets, PathBuf::from("wallets.json"));
        assert_eq!(config.challenges, PathBuf::from("challenges.json"));
    }

    #[test]
    fn parses_common_iso_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 10, 30)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();

        assert_eq!(parse_timestamp("2025-10-30T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30T12:30"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30T14:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-10-30T12:30:00.250"),
            expected.checked_add_signed(chrono::Duration::milliseconds(250))
        );
        assert_eq!(
            parse_timestamp("2025-10-30"),
            NaiveDate::from_ymd_opt(2025, 10, 30).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-13-01"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn counts_only_known_solvers() {
        let c = challenge(Some("2025-01-01"), &["a", "b", "c"]);
        assert_eq!(c.solutions_by(&set(&["a", "c", "z"])), 2);
        assert_eq!(c.solutions_by(&set(&["z"])), 0);
        assert_eq!(c.solutions_by(&HashSet::new()), 3);
    }

    #[test]
    fn builds_sorted_cumulative_series() {
        let challenges = vec![
            ("late".to_string(), challenge(Some("2025-01-03T00:00:00"), &["a"])),
            ("early".to_string(), challenge(Some("2025-01-01T00:00:00"), &["a", "b"])),
            ("undated".to_string(), challenge(None, &["a"])),
            ("blank".to_string(), challenge(Some(""), &["a"])),
            ("foreign".to_string(), challenge(Some("2025-01-02T00:00:00"), &["x"])),
            ("broken".to_string(), challenge(Some("soon"), &["b"])),
        ];

        let timeline = build_timeline(&challenges, &set(&["a", "b"]));

        let ids: Vec<_> = timeline.points.iter().map(|p| p.challenge.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);
        let cumulative: Vec<_> = timeline.points.iter().map(|p| p.cumulative).collect();
        assert_eq!(cumulative, [2, 3]);
        assert_eq!(timeline.total(), 3);
        assert_eq!(
            timeline.unparsed,
            [UnparsedTimestamp {
                challenge: "broken".to_string(),
                value: "soon".to_string(),
            }]
        );
    }

    #[test]
    fn non_string_solvers_are_ignored() {
        let c = Challenge {
            discovered_at: Value::from("2025-01-01"),
            solved_by: serde_json::json!(["a", 7, null, {"address": "a"}, "b"]),
        };
        assert_eq!(c.solutions_by(&set(&["a"])), 1);
        assert_eq!(c.solutions_by(&HashSet::new()), 2);

        let not_a_list = Challenge {
            discovered_at: Value::from("2025-01-01"),
            solved_by: Value::from("a"),
        };
        assert_eq!(not_a_list.solutions_by(&HashSet::new()), 0);
    }

    #[test]
    fn falsy_discovery_times_are_undated() {
        for value in [
            Value::Null,
            Value::from(""),
            Value::from(0),
            Value::from(false),
            serde_json::json!([]),
        ] {
            let c = Challenge {
                discovered_at: value,
                solved_by: Value::Null,
            };
            assert!(c.is_undated(), "{:?}", c.discovered_at);
        }
        assert!(!challenge(Some("2025-01-01"), &[]).is_undated());
    }

    #[test]
    fn numeric_timestamp_goes_to_unparsed() {
        let challenges = vec![
            ("good".to_string(), challenge(Some("2025-10-30T09:00:00"), &["a"])),
            (
                "numeric".to_string(),
                Challenge {
                    discovered_at: Value::from(12345),
                    solved_by: Value::from(vec!["a"]),
                },
            ),
        ];

        let timeline = build_timeline(&challenges, &set(&["a"]));
        assert_eq!(timeline.total(), 1);
        assert_eq!(timeline.unparsed[0].challenge, "numeric");
        assert_eq!(timeline.unparsed[0].value, "12345");
    }

    #[test]
    fn unparsed_only_reported_for_solved_challenges() {
        let challenges = vec![("broken".to_string(), challenge(Some("soon"), &["x"]))];
        let timeline = build_timeline(&challenges, &set(&["a"]));
        assert!(timeline.is_empty());
        assert!(timeline.unparsed.is_empty());
    }
}
