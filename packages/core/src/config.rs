//! Engine configuration, populated from environment variables.

/// Knobs for one engine run.
///
/// All fields have defaults, so a [`Registry`](crate::Registry) can be built
/// with zero configuration. [`EngineConfig::from_env`] reads:
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `APIDESIGN_EXAMPLE_SEED` | `apidesign` | Seed for generated examples |
/// | `APIDESIGN_GENERATE_EXAMPLES` | `true` | Fill missing examples during finalize |
/// | `APIDESIGN_MAX_EXAMPLE_DEPTH` | `4` | Nesting bound through named types when generating examples |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Same seed and same graph shape give the same examples.
    pub example_seed: String,

    pub generate_examples: bool,

    /// How many named types deep example generation descends before
    /// omitting the value.
    pub max_example_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            example_seed: "apidesign".into(),
            generate_examples: true,
            max_example_depth: 4,
        }
    }
}

impl EngineConfig {
    /// Populate config from environment variables, applying defaults where
    /// absent or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let generate_examples = lookup("APIDESIGN_GENERATE_EXAMPLES")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.generate_examples);

        let max_example_depth = lookup("APIDESIGN_MAX_EXAMPLE_DEPTH")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_example_depth);

        Self {
            example_seed: lookup("APIDESIGN_EXAMPLE_SEED").unwrap_or(defaults.example_seed),
            generate_examples,
            max_example_depth,
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.example_seed = seed.into();
        self
    }

    pub fn without_examples(mut self) -> Self {
        self.generate_examples = false;
        self
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("APIDESIGN_EXAMPLE_SEED", "cellar"),
            ("APIDESIGN_GENERATE_EXAMPLES", "off"),
            ("APIDESIGN_MAX_EXAMPLE_DEPTH", "2"),
        ]));
        assert_eq!(cfg.example_seed, "cellar");
        assert!(!cfg.generate_examples);
        assert_eq!(cfg.max_example_depth, 2);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("APIDESIGN_GENERATE_EXAMPLES", "maybe"),
            ("APIDESIGN_MAX_EXAMPLE_DEPTH", "-1"),
        ]));
        assert!(cfg.generate_examples);
        assert_eq!(cfg.max_example_depth, 4);
    }
}
