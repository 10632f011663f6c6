//! Resolves the free-text `device_name` a user spoke into a concrete
//! [`DeviceInfo`] (§4.E). Tries progressively looser match strategies and
//! stops at the first one that yields a clean match; ties at the loosest
//! strategy are reported back as an ambiguity rather than guessed at.

use common_types::DeviceInfo;

const MIN_SCORE: f32 = 0.45;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMatch {
    /// Exactly one candidate cleared the minimum score.
    Resolved(DeviceInfo, f32),
    /// More than one candidate tied for the best score; the caller should
    /// ask the user to disambiguate among the listed names.
    Ambiguous(Vec<DeviceInfo>),
    /// Nothing cleared `MIN_SCORE`.
    NotFound,
}

/// Score `candidate` against `query` (already expected to be a raw, possibly
/// mixed-case device name as spoken). Four strategies, most to least strict:
/// 1.0 exact, 0.95 case-insensitive, 0.8 substring either direction,
/// otherwise a token-overlap ratio (Jaccard over whitespace tokens).
fn score(query: &str, candidate: &str) -> f32 {
    if query == candidate {
        return 1.0;
    }
    let q = query.to_lowercase();
    let c = candidate.to_lowercase();
    if q == c {
        return 0.95;
    }
    if c.contains(&q) || q.contains(&c) {
        return 0.8;
    }

    let q_tokens: std::collections::HashSet<&str> = q.split_whitespace().collect();
    let c_tokens: std::collections::HashSet<&str> = c.split_whitespace().collect();
    if q_tokens.is_empty() || c_tokens.is_empty() {
        return 0.0;
    }
    let intersection = q_tokens.intersection(&c_tokens).count();
    let union = q_tokens.union(&c_tokens).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Resolves `query` against `devices`, preferring online devices on ties.
pub fn resolve(query: &str, devices: &[DeviceInfo]) -> DeviceMatch {
    let mut scored: Vec<(f32, &DeviceInfo)> = devices
        .iter()
        .map(|d| (score(query, &d.device_name), d))
        .filter(|(s, _)| *s >= MIN_SCORE)
        .collect();

    if scored.is_empty() {
        return DeviceMatch::NotFound;
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let best = scored[0].0;
    let tied: Vec<&DeviceInfo> = scored.iter().filter(|(s, _)| (*s - best).abs() < 1e-6).map(|(_, d)| *d).collect();

    if tied.len() == 1 {
        DeviceMatch::Resolved(tied[0].clone(), best)
    } else {
        let online_first: Vec<&DeviceInfo> = tied.iter().filter(|d| d.online).cloned().collect();
        if online_first.len() == 1 {
            DeviceMatch::Resolved(online_first[0].clone(), best)
        } else {
            DeviceMatch::Ambiguous(tied.into_iter().cloned().collect())
        }
    }
}

/// Builds the clarification message for an ambiguous or unresolved match.
pub fn clarification_message(query: &str, outcome: &DeviceMatch) -> String {
    match outcome {
        DeviceMatch::Ambiguous(candidates) => {
            let names: Vec<&str> = candidates.iter().map(|d| d.device_name.as_str()).collect();
            format!("I found more than one device matching '{query}': {}. Which one did you mean?", names.join(", "))
        }
        DeviceMatch::NotFound => format!("I couldn't find a device called '{query}'."),
        DeviceMatch::Resolved(..) => String::new(),
    }
}
