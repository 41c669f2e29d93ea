//! Audience filter for the catalog.

use serde::{Deserialize, Serialize};

/// Audience a fragrance is marketed to.
///
/// The catalog persists the last-chosen audience so a returning visitor lands
/// on the same shelf. The backend filters on a `gender` query parameter with
/// different vocabulary, so the mapping lives in [`Audience::gender_param`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Her,
    Him,
    Unisex,
}

impl Audience {
    /// Stable string form, used in navigation params and persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Her => "her",
            Self::Him => "him",
            Self::Unisex => "unisex",
        }
    }

    /// The `gender` query parameter value the backend expects, if any.
    ///
    /// Unisex means no filter at all rather than a third value.
    #[must_use]
    pub const fn gender_param(self) -> Option<&'static str> {
        match self {
            Self::Her => Some("women"),
            Self::Him => Some("men"),
            Self::Unisex => None,
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "her" => Ok(Self::Her),
            "him" => Ok(Self::Him),
            "unisex" => Ok(Self::Unisex),
            _ => Err(format!("invalid audience: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_roundtrip() {
        for audience in [Audience::Her, Audience::Him, Audience::Unisex] {
            let parsed: Audience = audience.as_str().parse().unwrap();
            assert_eq!(parsed, audience);
        }
    }

    #[test]
    fn test_audience_rejects_unknown() {
        assert!("everyone".parse::<Audience>().is_err());
    }

    #[test]
    fn test_gender_param() {
        assert_eq!(Audience::Her.gender_param(), Some("women"));
        assert_eq!(Audience::Him.gender_param(), Some("men"));
        assert_eq!(Audience::Unisex.gender_param(), None);
    }
}
