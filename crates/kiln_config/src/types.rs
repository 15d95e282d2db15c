//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `kiln.toml`.
///
/// Every section is optional in the file; an empty `kiln.toml` yields a
/// fully-defaulted configuration that builds `src/pages/**/*.dj` into
/// `build/**/*.html` with a passthrough renderer.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Page tree, output tree, extensions, and cache location.
    #[serde(default)]
    pub site: SiteConfig,
    /// External renderer invocation. Absent means pages are copied to
    /// their targets unchanged.
    #[serde(default)]
    pub render: Option<RenderConfig>,
    /// Import map applied when resolving module specifiers: exact
    /// specifiers, or `prefix/` keys that remap whole subtrees.
    #[serde(default)]
    pub imports: BTreeMap<String, String>,
}

/// Locations and extensions that shape one site build.
///
/// All paths are relative to the project root (the directory holding
/// `kiln.toml`).
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    /// Root of the page source tree.
    pub pages: String,
    /// Root of the generated output tree.
    pub output: String,
    /// Extension of page source files, without the dot.
    pub page_ext: String,
    /// Extension of generated output files, without the dot.
    pub output_ext: String,
    /// Where the dependency-discovery store is persisted.
    pub cache: String,
    /// Directory trees copied into the output when their files are missing
    /// there or newer than the copies.
    ///
    /// Accepts either a single path or a list of paths.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub assets: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            pages: "src/pages".to_string(),
            output: "build".to_string(),
            page_ext: "dj".to_string(),
            output_ext: "html".to_string(),
            cache: ".kiln/deps.json".to_string(),
            assets: Vec::new(),
        }
    }
}

/// How page source becomes output: a command fed the page on stdin that
/// writes the rendered document to stdout.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct RenderConfig {
    /// The program to run for each page.
    pub command: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `assets = "src/styles"` (string) and
/// `assets = ["src/styles", "static"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn assets_single_string() {
        let toml = r#"
[site]
assets = "src/styles"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.site.assets, vec!["src/styles"]);
    }

    #[test]
    fn assets_list() {
        let toml = r#"
[site]
assets = ["src/styles", "static"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.site.assets, vec!["src/styles", "static"]);
    }

    #[test]
    fn assets_default_empty() {
        let config = load_config_from_str("").unwrap();
        assert!(config.site.assets.is_empty());
    }

    #[test]
    fn render_args_default_empty() {
        let toml = r#"
[render]
command = "djot"
"#;
        let config = load_config_from_str(toml).unwrap();
        let render = config.render.unwrap();
        assert_eq!(render.command, "djot");
        assert!(render.args.is_empty());
    }
}
