use serde::{Deserialize, Serialize};

/// The uploaded sources a score is assembled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Financial statements; the primary source
    Balances,
    /// Commercial and banking references
    References,
    /// Digital footprint indicators
    DigitalData,
    /// Collected social comments, keyed by company name
    Comments,
}

impl SourceKind {
    /// Human readable name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Balances => "balances",
            SourceKind::References => "referencias",
            SourceKind::DigitalData => "datos_digitales",
            SourceKind::Comments => "comentarios",
        }
    }

    pub fn identifier_column(&self) -> &'static str {
        match self {
            SourceKind::Comments => "empresa",
            _ => "ruc",
        }
    }

    /// Free-text column fixed by the source format. Sources without one use
    /// the configured text column.
    pub fn text_column(&self) -> Option<&'static str> {
        match self {
            SourceKind::Comments => Some("texto"),
            _ => None,
        }
    }

    /// Delimiters to try, in order
    pub fn delimiters(&self) -> &'static [u8] {
        match self {
            SourceKind::Balances => &[b'\t', b','],
            _ => &[b','],
        }
    }

    #[inline]
    pub fn is_primary(&self) -> bool {
        matches!(self, SourceKind::Balances)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_layout() {
        let kind = SourceKind::Comments;
        assert_eq!(kind.identifier_column(), "empresa");
        assert_eq!(kind.text_column(), Some("texto"));
        assert!(!kind.is_primary());
        assert_eq!(SourceKind::Balances.text_column(), None);
        assert_eq!(SourceKind::Balances.identifier_column(), "ruc");
    }
}
