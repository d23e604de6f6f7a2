//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API.

/// Trim free text and turn blank values into `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(normalize_optional_text(Some(" \t ")), None);
        assert_eq!(
            normalize_optional_text(Some(" savings ")),
            Some("savings".to_string())
        );
    }
}
