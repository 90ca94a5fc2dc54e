//! Hierarchical cache key grammar (spec §4.2 key convention, §6.3).
//!
//! ```text
//! <feature>:<discriminator>(:<dim>)*
//! <feature>:idx:<user_id>                 (index keys)
//! quota:<kind>:<user_id>:<window_start>   (quota keys)
//! ```

/// Builds the index key that groups every cache entry for one user under one
/// feature namespace, e.g. `recipes:idx:u-42`.
#[must_use]
pub fn index_key(feature: &str, user_id: &str) -> String {
    format!("{feature}:idx:{user_id}")
}

/// Builds an entry key from a feature and an arbitrary set of discriminators,
/// e.g. `entry_key("recipes", &["u-42", "high-protein"])` -> `recipes:u-42:high-protein`.
#[must_use]
pub fn entry_key(feature: &str, discriminators: &[&str]) -> String {
    let mut key = feature.to_string();
    for part in discriminators {
        key.push(':');
        key.push_str(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_key_matches_grammar() {
        assert_eq!(index_key("recipes", "u-42"), "recipes:idx:u-42");
    }

    #[test]
    fn entry_key_joins_discriminators() {
        assert_eq!(
            entry_key("recipes", &["u-42", "high-protein"]),
            "recipes:u-42:high-protein"
        );
    }
}
