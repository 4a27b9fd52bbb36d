//! GPU model normalization.
//!
//! Inventory entries and template requirements spell the same accelerator in
//! many ways (`AMD Instinct MI300X`, `mi300x`, `MI-300X`, `A100-SXM4-40GB`).
//! Both sides are reduced to one canonical uppercase token before comparison.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Vendor and family words that never name a model on their own.
const NOISE_TOKENS: &[&str] = &["AMD", "NVIDIA", "TESLA", "RTX", "INSTINCT"];

static MODEL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(MI|ME|RX|RTX|GTX|A|H|L|T|V|K|P|QUADRO|TESLA|GRID)?[A-Z]*[0-9]+[A-Z0-9]*$")
        .expect("literal pattern")
});

/// Canonical token for a GPU model string; empty input yields an empty string.
pub fn normalize_gpu_model(raw: &str) -> String {
    let upper = raw.trim().to_uppercase().replace('_', "-");
    if upper.is_empty() {
        return String::new();
    }

    // "MI-300X" spells one model across a separator.
    let joined = join_split_family(&upper);
    let tokens: Vec<&str> = joined
        .split(['-', ' ', '/', ':'])
        .filter(|t| !t.is_empty())
        .collect();

    tokens
        .iter()
        .filter(|t| !NOISE_TOKENS.contains(*t))
        .find(|t| MODEL_TOKEN.is_match(t))
        .or_else(|| tokens.first())
        .map(|t| t.to_string())
        .unwrap_or_default()
}

/// Rejoin a family prefix split from its number, e.g. `MI-300X` to `MI300X`.
fn join_split_family(upper: &str) -> String {
    let mut out = String::with_capacity(upper.len());
    let mut chars = upper.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '-' {
            let before = &upper[..i];
            let next_is_digit = chars.peek().is_some_and(|(_, n)| n.is_ascii_digit());
            let family_before = before
                .rsplit([' ', '-', '/', ':'])
                .next()
                .is_some_and(|w| w == "MI" || w == "ME");
            if next_is_digit && family_before {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Normalize every entry of an inventory, dropping blanks.
pub fn normalize_inventory<'a, I>(models: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    models
        .into_iter()
        .map(|m| normalize_gpu_model(m))
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_vendor_prefixed_names() {
        assert_eq!(normalize_gpu_model("AMD Instinct MI300X"), "MI300X");
        assert_eq!(normalize_gpu_model("mi325x"), "MI325X");
        assert_eq!(normalize_gpu_model("  MI210 "), "MI210");
    }

    #[test]
    fn normalizes_split_family() {
        assert_eq!(normalize_gpu_model("MI-300X"), "MI300X");
        assert_eq!(normalize_gpu_model("amd_mi_250x"), "MI250X");
    }

    #[test]
    fn normalizes_nvidia_variants() {
        assert_eq!(normalize_gpu_model("NVIDIA-A100-SXM4-40GB"), "A100");
        assert_eq!(normalize_gpu_model("Tesla H100 80GB"), "H100");
    }

    #[test]
    fn falls_back_to_first_token() {
        assert_eq!(normalize_gpu_model("custom-accel"), "CUSTOM");
        assert_eq!(normalize_gpu_model(""), "");
    }

    #[test]
    fn inventory_normalization_dedupes() {
        let raw = vec![
            "MI300X".to_string(),
            "amd instinct mi300x".to_string(),
            " ".to_string(),
        ];
        let set = normalize_inventory(&raw);
        assert_eq!(set.len(), 1);
        assert!(set.contains("MI300X"));
    }
}
