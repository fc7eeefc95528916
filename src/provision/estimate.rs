//! Download-size estimation
//!
//! Known library tags come from a static table. Anything else is sized from
//! the parameter count in its tag (`7b`, `0.5b`, `270m`, `8x7b`), assuming
//! Q4 quantisation. Names with no usable hint get a conservative default.

use crate::provision::normalize_model_name;

/// Estimate for names with no size hint (5 GiB)
pub const DEFAULT_MODEL_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Approximate on-disk sizes of common library tags, in bytes
const KNOWN_SIZES: &[(&str, u64)] = &[
    ("llama3.2:latest", 2_000_000_000),
    ("llama3.2:1b", 1_300_000_000),
    ("llama3.2:3b", 2_000_000_000),
    ("llama3.1:latest", 4_900_000_000),
    ("llama3.1:8b", 4_900_000_000),
    ("llama3.1:70b", 43_000_000_000),
    ("qwen2.5:latest", 4_700_000_000),
    ("qwen2.5:0.5b", 398_000_000),
    ("qwen2.5:7b", 4_700_000_000),
    ("qwen2.5:7b-instruct", 4_700_000_000),
    ("qwen2.5-coder:latest", 4_700_000_000),
    ("mistral:latest", 4_100_000_000),
    ("codellama:latest", 3_800_000_000),
    ("phi3:latest", 2_200_000_000),
    ("gemma2:2b", 1_600_000_000),
    ("deepseek-r1:latest", 4_700_000_000),
    ("nomic-embed-text:latest", 274_000_000),
    ("mxbai-embed-large:latest", 670_000_000),
    ("all-minilm:latest", 46_000_000),
];

/// Approximate download size of `name` in bytes. Never fails.
pub fn estimate_model_size(name: &str) -> u64 {
    let normalized = normalize_model_name(name.trim());

    if let Some((_, size)) = KNOWN_SIZES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(&normalized))
    {
        return *size;
    }

    parameter_count(&normalized)
        .map(|params| params.saturating_mul(66) / 100)
        .filter(|&bytes| bytes > 0)
        .unwrap_or(DEFAULT_MODEL_SIZE)
}

/// Parameter count parsed from the tag, e.g. `qwen2.5:7b-instruct` -> 7e9
fn parameter_count(name: &str) -> Option<u64> {
    let tag = name.rsplit_once(':').map(|(_, tag)| tag)?;
    tag.split(['-', '_']).find_map(parse_params)
}

fn parse_params(token: &str) -> Option<u64> {
    let token = token.to_ascii_lowercase();
    let (number, scale) = if let Some(n) = token.strip_suffix('b') {
        (n, 1e9)
    } else if let Some(n) = token.strip_suffix('m') {
        (n, 1e6)
    } else {
        return None;
    };

    // Mixture-of-experts tags: "8x7b"
    let value = match number.split_once('x') {
        Some((experts, each)) => experts.parse::<f64>().ok()? * each.parse::<f64>().ok()?,
        None => number.parse::<f64>().ok()?,
    };

    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value * scale) as u64)
}
