//! Agent properties.
//!
//! Agents are configured with whitespace-separated `key=value` tokens such as
//! `"name=learner alpha=0.0025 load=weights.bin"`. [`Properties`] keeps every
//! pair, recognized or not; the typed views below pull out what an agent
//! needs and turn malformed values into [`ConfigError`]s instead of guessing.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ntuple::{Layout, DEFAULT_RANKS};

/// Learning rate used when `alpha` is not given.
pub const DEFAULT_ALPHA: f32 = 0.01;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("property `{key}` has invalid value `{value}`")]
    Invalid { key: String, value: String },
    #[error("property `init` lists no table sizes: `{0}`")]
    EmptyInit(String),
    #[error("unknown layout `{0}` (expected `isomorphic` or `explicit`)")]
    Layout(String),
}

/// Ordered `key=value` map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    meta: BTreeMap<String, String>,
}

impl Properties {
    /// Parse `args` on top of `defaults`; later tokens win. A token without
    /// `=` is stored under its own text.
    ///
    /// ```
    /// use threes_ntuple::config::Properties;
    /// let p = Properties::parse("name=slide role=slider", "name=td seed=7 verbose");
    /// assert_eq!(p.get("name"), Some("td"));
    /// assert_eq!(p.get("role"), Some("slider"));
    /// assert_eq!(p.get("verbose"), Some("verbose"));
    /// ```
    pub fn parse(defaults: &str, args: &str) -> Self {
        let mut props = Self { meta: BTreeMap::new() };
        for token in defaults.split_whitespace().chain(args.split_whitespace()) {
            props.notify(token);
        }
        props
    }

    /// Insert or overwrite one `key=value` pair.
    pub fn notify(&mut self, msg: &str) {
        let (key, value) = msg.split_once('=').unwrap_or((msg, msg));
        self.meta.insert(key.to_string(), value.to_string());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> { self.meta.get(key).map(String::as_str) }

    /// `name`, or `unknown` when unset.
    pub fn name(&self) -> &str { self.get("name").unwrap_or("unknown") }

    /// `role`, or `unknown` when unset.
    pub fn role(&self) -> &str { self.get("role").unwrap_or("unknown") }

    /// Parse `key` as `T` if present.
    pub fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    /// `seed` as a `u64`, if set.
    pub fn seed(&self) -> Result<Option<u64>, ConfigError> { self.parsed("seed") }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.meta.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Settings of a learning agent.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    pub alpha: f32,
    pub ranks: usize,
    pub layout: Layout,
    /// Explicit table sizes replacing the default zeroed tables.
    pub init: Option<Vec<usize>>,
    pub load: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self { alpha: DEFAULT_ALPHA, ranks: DEFAULT_RANKS, layout: Layout::default(), init: None, load: None, save: None }
    }
}

impl LearnerConfig {
    /// Read `alpha`, `ranks`, `layout`, `init`, `load` and `save`.
    ///
    /// ```
    /// use threes_ntuple::config::{LearnerConfig, Properties};
    /// let p = Properties::parse("", "alpha=0.5 init=4096,4096 save=w.bin");
    /// let cfg = LearnerConfig::from_properties(&p).unwrap();
    /// assert_eq!(cfg.alpha, 0.5);
    /// assert_eq!(cfg.init, Some(vec![4096, 4096]));
    /// assert!(LearnerConfig::from_properties(&Properties::parse("", "alpha=fast")).is_err());
    /// ```
    pub fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(alpha) = props.parsed::<f32>("alpha")? {
            if !alpha.is_finite() || alpha <= 0.0 {
                return Err(invalid(props, "alpha"));
            }
            cfg.alpha = alpha;
        }
        if let Some(ranks) = props.parsed::<usize>("ranks")? {
            cfg.ranks = ranks;
        }
        if let Some(layout) = props.get("layout") {
            cfg.layout = parse_layout(layout)?;
        }
        if let Some(init) = props.get("init") {
            cfg.init = Some(parse_init(init)?);
        }
        cfg.load = props.get("load").map(PathBuf::from);
        cfg.save = props.get("save").map(PathBuf::from);
        Ok(cfg)
    }
}

fn invalid(props: &Properties, key: &str) -> ConfigError {
    ConfigError::Invalid { key: key.to_string(), value: props.get(key).unwrap_or_default().to_string() }
}

fn parse_layout(value: &str) -> Result<Layout, ConfigError> {
    match value {
        "isomorphic" | "iso" => Ok(Layout::Isomorphic),
        "explicit" => Ok(Layout::Explicit),
        other => Err(ConfigError::Layout(other.to_string())),
    }
}

/// Every run of digits is one table size; anything else separates them.
fn parse_init(value: &str) -> Result<Vec<usize>, ConfigError> {
    let sizes = value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| ConfigError::Invalid { key: "init".to_string(), value: value.to_string() })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if sizes.is_empty() {
        return Err(ConfigError::EmptyInit(value.to_string()));
    }
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_tokens_override() {
        let mut p = Properties::parse("name=place role=placer", "seed=3 name=env");
        assert_eq!(p.name(), "env");
        assert_eq!(p.role(), "placer");
        assert_eq!(p.seed(), Ok(Some(3)));
        p.notify("seed=9");
        assert_eq!(p.seed(), Ok(Some(9)));
        p.notify("extra=a=b");
        assert_eq!(p.get("extra"), Some("a=b"));
    }

    #[test]
    fn unknown_keys_are_kept() {
        let p = Properties::parse("", "color=blue");
        assert_eq!(p.iter().collect::<Vec<_>>(), vec![("color", "blue")]);
        assert_eq!(LearnerConfig::from_properties(&p), Ok(LearnerConfig::default()));
    }

    #[test]
    fn bad_numbers_are_errors() {
        let p = Properties::parse("", "seed=abc");
        assert_eq!(p.seed(), Err(ConfigError::Invalid { key: "seed".into(), value: "abc".into() }));
        for args in ["alpha=x", "alpha=-1", "alpha=0", "alpha=NaN", "ranks=many"] {
            assert!(LearnerConfig::from_properties(&Properties::parse("", args)).is_err(), "{}", args);
        }
    }

    #[test]
    fn init_sizes() {
        assert_eq!(parse_init("65536,65536"), Ok(vec![65536, 65536]));
        assert_eq!(parse_init("8x4: 16"), Ok(vec![8, 4, 16]));
        assert_eq!(parse_init(",,"), Err(ConfigError::EmptyInit(",,".into())));
        assert!(matches!(parse_init("99999999999999999999999"), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn layouts() {
        let p = Properties::parse("", "layout=explicit ranks=16 load=in.bin");
        let cfg = LearnerConfig::from_properties(&p).unwrap();
        assert_eq!(cfg.layout, Layout::Explicit);
        assert_eq!(cfg.ranks, 16);
        assert_eq!(cfg.load, Some(PathBuf::from("in.bin")));
        assert_eq!(cfg.save, None);
        assert_eq!(parse_layout("diagonal"), Err(ConfigError::Layout("diagonal".into())));
    }
}
