//! All-or-nothing validation of a submitted item list.

use std::collections::{BTreeSet, HashSet};

use crate::config::LimitsConfig;
use crate::error::ValidationError;
use crate::types::{InputItem, InputKind};

/// Validates submitted items before any pipeline state exists.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check count, kind, extension, and size constraints.
    ///
    /// Sizes are measured on the raw submitted bytes, before any image is
    /// downscaled. The first violated constraint is reported; no subset of
    /// the items is ever accepted.
    pub fn validate(&self, items: &[InputItem]) -> Result<InputKind, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::Empty);
        }
        if items.len() > self.limits.max_items {
            return Err(ValidationError::TooManyItems {
                count: items.len(),
                max: self.limits.max_items,
            });
        }

        let mut kinds = HashSet::new();
        let mut extensions = BTreeSet::new();
        let mut total: u64 = 0;

        for item in items {
            let kind = item
                .kind()
                .ok_or_else(|| ValidationError::UnsupportedKind {
                    name: item.name.clone(),
                    mime_type: item.mime_type.clone(),
                })?;
            kinds.insert(kind);
            // A name without an extension counts as the empty extension
            extensions.insert(item.extension().unwrap_or_default().to_ascii_lowercase());
            total = total.saturating_add(item.size());
        }

        if kinds.len() > 1 {
            return Err(ValidationError::MixedKinds);
        }
        if extensions.len() > 1 {
            return Err(ValidationError::MixedExtensions {
                extensions: extensions.into_iter().collect(),
            });
        }

        let Some(&kind) = kinds.iter().next() else {
            return Err(ValidationError::Empty);
        };
        if kind == InputKind::Text && items.len() != 1 {
            return Err(ValidationError::MultipleTextItems { count: items.len() });
        }
        if total > self.limits.max_total_bytes {
            return Err(ValidationError::TooLarge {
                total,
                max: self.limits.max_total_bytes,
            });
        }

        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, mime: &str, size: usize) -> InputItem {
        InputItem::new(name, mime, vec![0u8; size])
    }

    fn validator() -> Validator {
        Validator::new(LimitsConfig::default())
    }

    #[test]
    fn test_accepts_single_text() {
        let kind = validator()
            .validate(&[item("chat.txt", "text/plain", 100)])
            .unwrap();
        assert_eq!(kind, InputKind::Text);
    }

    #[test]
    fn test_accepts_ten_images() {
        let items: Vec<_> = (0..10)
            .map(|i| item(&format!("shot{i}.png"), "image/png", 1000))
            .collect();
        assert_eq!(validator().validate(&items).unwrap(), InputKind::Image);
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validator().validate(&[]), Err(ValidationError::Empty));
    }

    #[test]
    fn test_rejects_eleven_items() {
        let items: Vec<_> = (0..11)
            .map(|i| item(&format!("shot{i}.png"), "image/png", 10))
            .collect();
        assert_eq!(
            validator().validate(&items),
            Err(ValidationError::TooManyItems { count: 11, max: 10 })
        );
    }

    #[test]
    fn test_rejects_unsupported_kind() {
        let err = validator()
            .validate(&[item("doc.pdf", "application/pdf", 10)])
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedKind { .. }));
    }

    #[test]
    fn test_rejects_mixed_kinds() {
        let items = [item("a.png", "image/png", 10), item("b.mp3", "audio/mpeg", 10)];
        assert_eq!(validator().validate(&items), Err(ValidationError::MixedKinds));
    }

    #[test]
    fn test_rejects_mixed_extensions() {
        let items = [item("a.png", "image/png", 10), item("b.jpg", "image/jpeg", 10)];
        assert_eq!(
            validator().validate(&items),
            Err(ValidationError::MixedExtensions {
                extensions: vec!["jpg".to_string(), "png".to_string()]
            })
        );
    }

    #[test]
    fn test_missing_extension_counts_as_distinct() {
        let items = [item("shot.png", "image/png", 10), item("shot", "image/png", 10)];
        assert_eq!(
            validator().validate(&items),
            Err(ValidationError::MixedExtensions {
                extensions: vec![String::new(), "png".to_string()]
            })
        );

        let bare = [item("one", "image/png", 10), item("two", "image/png", 10)];
        assert!(validator().validate(&bare).is_ok());
    }

    #[test]
    fn test_extension_comparison_ignores_case() {
        let items = [item("a.PNG", "image/png", 10), item("b.png", "image/png", 10)];
        assert!(validator().validate(&items).is_ok());
    }

    #[test]
    fn test_rejects_two_text_items() {
        let items = [item("a.txt", "text/plain", 10), item("b.txt", "text/plain", 10)];
        assert_eq!(
            validator().validate(&items),
            Err(ValidationError::MultipleTextItems { count: 2 })
        );
    }

    #[test]
    fn test_rejects_oversized_total() {
        let half = 5 * 1024 * 1024;
        let items = [
            item("a.png", "image/png", half),
            item("b.png", "image/png", half + 1),
        ];
        assert!(matches!(
            validator().validate(&items),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_accepts_exactly_max_total() {
        let half = 5 * 1024 * 1024;
        let items = [item("a.png", "image/png", half), item("b.png", "image/png", half)];
        assert!(validator().validate(&items).is_ok());
    }
}
