//! Extraction of `memory.save('key', 'value')` directives from model output.

use std::sync::LazyLock;

use regex::Regex;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"memory\.save\(\s*(?:'([^']+)'|"([^"]+)")\s*,\s*(?:'([^']*)'|"([^"]*)")\s*\)"#)
        .expect("Invalid memory directive regex")
});

/// All `(key, value)` pairs saved in `text`, in order of appearance.
///
/// Keys are trimmed; directives with a blank key are dropped.
pub fn parse_memory_directives(text: &str) -> Vec<(String, String)> {
    DIRECTIVE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let key = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
            let value = caps.get(3).or_else(|| caps.get(4))?.as_str().trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
