//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! The raw TOML is parsed into `toml::Value` first and its key tree compared
//! against the known field names. Mismatches become warnings with a
//! "did you mean?" suggestion; they never fail loading. Value checks live in
//! `SentryConfig::validate`.

use std::collections::HashSet;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path for `SentryConfig`.
///
/// Kept in step with the structs in sentry_config.rs by hand.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [interfaces]
        "interfaces",
        "interfaces.primary",
        "interfaces.primary.device",
        "interfaces.primary.service",
        "interfaces.secondary",
        "interfaces.secondary.device",
        "interfaces.secondary.service",
        // [probe]
        "probe",
        "probe.targets",
        "probe.timeout_secs",
        "probe.echo_host",
        "probe.echo_count",
        // [repair]
        "repair",
        "repair.auto_fix",
        "repair.cooldown_secs",
        "repair.settle_secs",
        "repair.post_repair_settle_secs",
        // [schedule]
        "schedule",
        "schedule.interval_secs",
        "schedule.path_poll_secs",
        "schedule.path_change_delay_secs",
        // [server]
        "server",
        "server.enabled",
        "server.addr",
        // [storage]
        "storage",
        "storage.data_dir",
        // [log]
        "log",
        "log.max_entries",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Closest known key within edit distance 3. Ties go to the
/// lexicographically smaller key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every unknown key in `raw_toml`. Syntax errors yield no
/// warnings here; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("cooldwn_secs", "cooldown_secs"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [interfaces.primary]
            device = "en0"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"interfaces".to_string()));
        assert!(keys.contains(&"interfaces.primary".to_string()));
        assert!(keys.contains(&"interfaces.primary.device".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys("[repair]\ncooldwn_secs = 30\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "repair.cooldwn_secs");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("repair.cooldown_secs"));
        assert!(warnings[0].to_string().contains("did you mean 'repair.cooldown_secs'"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[interfaces.primary]
device = "en0"
service = "Ethernet"

[probe]
targets = ["https://[2606:4700:4700::1111]/"]
echo_count = 3

[schedule]
interval_secs = 120

[server]
enabled = false
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[interfaces.tertiary]\ndevice = \"en5\"\n");
        assert!(warnings.iter().any(|w| w.field == "interfaces.tertiary"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("zzzzzzzzzzzzzzzzzzzzz", &known).is_none());
    }

    #[test]
    fn test_syntax_error_yields_no_warnings() {
        assert!(validate_unknown_keys("[repair\ncooldown_secs = ").is_empty());
    }
}
