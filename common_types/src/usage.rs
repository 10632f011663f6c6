use serde::{Deserialize, Serialize};

/// Token accounting for a single provider call. `total` is derived from
/// `prompt + completion` unless the provider's own response already supplied a
/// total (some back-ends report a total that includes reasoning tokens not
/// reflected in `completion`), mirroring the original's `TokenUsage.__post_init__`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Build from provider-reported fields, filling `total` when absent instead of
    /// trusting a zero default.
    pub fn from_parts(prompt_tokens: u32, completion_tokens: u32, total_tokens: Option<u32>) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: total_tokens.unwrap_or(prompt_tokens + completion_tokens),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total_tokens == self.prompt_tokens + self.completion_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sums_total() {
        let u = TokenUsage::new(10, 5);
        assert_eq!(u.total_tokens, 15);
        assert!(u.is_consistent());
    }

    #[test]
    fn from_parts_defaults_total() {
        let u = TokenUsage::from_parts(10, 5, None);
        assert_eq!(u.total_tokens, 15);
    }

    #[test]
    fn add_accumulates_all_fields() {
        let mut u = TokenUsage::new(10, 5);
        u.add(&TokenUsage::new(2, 3));
        assert_eq!(u.prompt_tokens, 12);
        assert_eq!(u.completion_tokens, 8);
        assert_eq!(u.total_tokens, 20);
    }
}
