//! Slug derivation for product URLs.
//!
//! Product detail pages are addressed by a human-readable slug derived from
//! the product name, not by the backend id. The backend has no slug concept,
//! so resolution happens client-side by deriving slugs for the full product
//! list and matching.

/// Derive a URL slug from a product name.
///
/// Lowercases ASCII letters, collapses every run of non-alphanumeric
/// characters to a single `-`, and trims leading/trailing dashes.
///
/// ```rust
/// # use blisora_core::slugify;
/// assert_eq!(slugify("Lune Noire"), "lune-noire");
/// assert_eq!(slugify("  Atelier -- Ambre!  "), "atelier-ambre");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Whether a string looks like a raw backend object id (24 hex characters).
///
/// Category fields sometimes arrive as an unexpanded id reference instead of
/// a name; those are suppressed rather than shown to customers.
#[must_use]
pub fn looks_like_object_id(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Nocturne Veil"), "nocturne-veil");
        assert_eq!(slugify("Citron Noir"), "citron-noir");
    }

    #[test]
    fn test_slugify_collapses_punctuation_runs() {
        assert_eq!(slugify("Rose & Oud, No. 5"), "rose-oud-no-5");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("  --Silk Petals--  "), "silk-petals");
    }

    #[test]
    fn test_slugify_empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_looks_like_object_id() {
        assert!(looks_like_object_id("64f1aa00bc1234567890abcd"));
        assert!(!looks_like_object_id("Floral Amber"));
        assert!(!looks_like_object_id("64f1aa00bc1234567890abc")); // 23 chars
        assert!(!looks_like_object_id("64f1aa00bc1234567890abcz")); // non-hex
    }
}
