//! Structural validation of the persisted discovery store.
//!
//! The store file is decoded in two steps: `serde_json` parses the raw text
//! into a [`serde_json::Value`], and this module checks that value against
//! the expected shape, collecting one [`ShapeProblem`] per mismatched field
//! instead of stopping at the first. A store that fails validation is
//! rejected as a whole; the caller reports every problem at once.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use crate::stamp::Timestamp;
use crate::store::DepEntry;

/// Shape description for the `time` field.
const TIME_SHAPE: &str = "an ISO-8601 millisecond timestamp";

/// Shape description for the `deps` field.
const DEPS_SHAPE: &str = "an array of file paths";

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeProblem {
    /// Where in the document the mismatch sits, e.g. `/src/a.js/time`.
    pub at: String,
    /// What was expected there.
    pub expected: String,
    /// The offending value rendered as JSON, or `nothing` if absent.
    pub actual: String,
}

impl fmt::Display for ShapeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} at {}; got {}", self.expected, self.at, self.actual)
    }
}

/// Validates a parsed store document against the expected shape.
///
/// On success returns the typed entry map. On failure returns every problem
/// found; entries that happened to be well-formed are discarded along with
/// the rest, since a partially-trusted store would change build decisions.
pub fn validate_store(value: &Value) -> Result<BTreeMap<PathBuf, DepEntry>, Vec<ShapeProblem>> {
    let root = match value.as_object() {
        Some(root) => root,
        None => {
            return Err(vec![problem(
                "/",
                "an object mapping file paths to entries",
                Some(value),
            )])
        }
    };

    let mut entries = BTreeMap::new();
    let mut problems = Vec::new();
    for (key, raw) in root {
        if let Some(entry) = validate_entry(key, raw, &mut problems) {
            entries.insert(PathBuf::from(key), entry);
        }
    }

    if problems.is_empty() {
        Ok(entries)
    } else {
        Err(problems)
    }
}

fn validate_entry(key: &str, raw: &Value, problems: &mut Vec<ShapeProblem>) -> Option<DepEntry> {
    let fields = match raw.as_object() {
        Some(fields) => fields,
        None => {
            problems.push(problem(
                &format!("/{key}"),
                "an entry with time and deps fields",
                Some(raw),
            ));
            return None;
        }
    };

    let time = validate_time(key, fields.get("time"), problems);
    let deps = validate_deps(key, fields.get("deps"), problems);
    Some(DepEntry {
        time: time?,
        deps: deps?,
    })
}

fn validate_time(
    key: &str,
    raw: Option<&Value>,
    problems: &mut Vec<ShapeProblem>,
) -> Option<Timestamp> {
    let at = format!("/{key}/time");
    let raw = match raw {
        Some(raw) => raw,
        None => {
            problems.push(problem(&at, TIME_SHAPE, None));
            return None;
        }
    };
    let parsed = raw.as_str().and_then(Timestamp::parse);
    if parsed.is_none() {
        problems.push(problem(&at, TIME_SHAPE, Some(raw)));
    }
    parsed
}

fn validate_deps(
    key: &str,
    raw: Option<&Value>,
    problems: &mut Vec<ShapeProblem>,
) -> Option<BTreeSet<PathBuf>> {
    let at = format!("/{key}/deps");
    let raw = match raw {
        Some(raw) => raw,
        None => {
            problems.push(problem(&at, DEPS_SHAPE, None));
            return None;
        }
    };
    let items = match raw.as_array() {
        Some(items) => items,
        None => {
            problems.push(problem(&at, DEPS_SHAPE, Some(raw)));
            return None;
        }
    };

    let mut deps = BTreeSet::new();
    let mut ok = true;
    for (index, item) in items.iter().enumerate() {
        match item.as_str() {
            Some(path) => {
                deps.insert(PathBuf::from(path));
            }
            None => {
                problems.push(problem(&format!("{at}/{index}"), "a file path", Some(item)));
                ok = false;
            }
        }
    }
    ok.then_some(deps)
}

fn problem(at: &str, expected: &str, actual: Option<&Value>) -> ShapeProblem {
    ShapeProblem {
        at: at.to_string(),
        expected: expected.to_string(),
        actual: match actual {
            Some(value) => value.to_string(),
            None => "nothing".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(text: &str) -> Result<BTreeMap<PathBuf, DepEntry>, Vec<ShapeProblem>> {
        let value: Value = serde_json::from_str(text).unwrap();
        validate_store(&value)
    }

    #[test]
    fn empty_object_is_an_empty_store() {
        let entries = validate("{}").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn well_formed_store_decodes() {
        let entries = validate(
            r#"{
                "src/pages/index.dj": {
                    "time": "2024-03-05T12:02:10.123Z",
                    "deps": ["lib/filters/toc.ts", "lib/filters/article.tsx"]
                },
                "src/pages/about.dj": {
                    "time": "2024-03-04T09:00:00.000Z",
                    "deps": []
                }
            }"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        let entry = &entries[&PathBuf::from("src/pages/index.dj")];
        assert_eq!(entry.deps.len(), 2);
        assert!(entry.deps.contains(&PathBuf::from("lib/filters/toc.ts")));
    }

    #[test]
    fn duplicate_deps_collapse_into_a_set() {
        let entries = validate(
            r#"{"a.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": ["x.ts", "x.ts"]}}"#,
        )
        .unwrap();
        assert_eq!(entries[&PathBuf::from("a.dj")].deps.len(), 1);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let entries = validate(
            r#"{"a.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": [], "note": "hi"}}"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn non_object_root_is_one_problem() {
        let problems = validate(r#"[1, 2, 3]"#).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].at, "/");
    }

    #[test]
    fn non_object_entry_is_flagged() {
        let problems = validate(r#"{"a.dj": "fresh"}"#).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].at, "/a.dj");
        assert_eq!(problems[0].actual, "\"fresh\"");
    }

    #[test]
    fn missing_time_reports_nothing() {
        let problems = validate(r#"{"a.dj": {"deps": []}}"#).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].at, "/a.dj/time");
        assert_eq!(problems[0].actual, "nothing");
    }

    #[test]
    fn numeric_time_is_flagged() {
        let problems =
            validate(r#"{"a.dj": {"time": 1709642530123, "deps": []}}"#).unwrap_err();
        assert_eq!(problems[0].at, "/a.dj/time");
        assert_eq!(problems[0].actual, "1709642530123");
    }

    #[test]
    fn loosely_formatted_time_is_flagged() {
        // Valid RFC 3339, but not the exact millisecond form the store writes.
        let problems =
            validate(r#"{"a.dj": {"time": "2024-03-05T12:02:10Z", "deps": []}}"#).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].to_string().contains("ISO-8601"));
    }

    #[test]
    fn non_array_deps_is_flagged() {
        let problems = validate(
            r#"{"a.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": "x.ts"}}"#,
        )
        .unwrap_err();
        assert_eq!(problems[0].at, "/a.dj/deps");
    }

    #[test]
    fn non_string_dep_element_is_flagged_by_index() {
        let problems = validate(
            r#"{"a.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": ["x.ts", 7]}}"#,
        )
        .unwrap_err();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].at, "/a.dj/deps/1");
        assert_eq!(problems[0].actual, "7");
    }

    #[test]
    fn every_problem_is_collected() {
        let problems = validate(
            r#"{
                "a.dj": {"time": 1, "deps": []},
                "b.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": 2},
                "c.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": []}
            }"#,
        )
        .unwrap_err();
        assert_eq!(problems.len(), 2);
        let locations: Vec<&str> = problems.iter().map(|p| p.at.as_str()).collect();
        assert!(locations.contains(&"/a.dj/time"));
        assert!(locations.contains(&"/b.dj/deps"));
    }

    #[test]
    fn one_bad_entry_rejects_the_whole_store() {
        let result = validate(
            r#"{
                "good.dj": {"time": "2024-01-01T00:00:00.000Z", "deps": []},
                "bad.dj": {"time": null, "deps": []}
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn problem_display_reads_like_a_diagnostic() {
        let p = ShapeProblem {
            at: "/a.dj/time".to_string(),
            expected: TIME_SHAPE.to_string(),
            actual: "42".to_string(),
        };
        assert_eq!(
            p.to_string(),
            "expected an ISO-8601 millisecond timestamp at /a.dj/time; got 42"
        );
    }
}
