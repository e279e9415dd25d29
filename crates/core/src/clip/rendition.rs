use serde::Serialize;

use super::{ClipError, MAX_CLIP_DURATION_MS};

/// Which of the two encodes was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rendition {
    /// Source frame rate.
    Native,
    /// Fixed reduced frame rate.
    Reduced,
}

/// Checks a clip window and returns its length.
pub fn validate_range(start_ms: u64, end_ms: u64) -> Result<u64, ClipError> {
    if end_ms < start_ms {
        return Err(ClipError::invalid_range(
            start_ms,
            end_ms,
            "end is before start",
        ));
    }
    let duration = end_ms - start_ms;
    if duration > MAX_CLIP_DURATION_MS {
        return Err(ClipError::invalid_range(
            start_ms,
            end_ms,
            format!("{} ms exceeds the {} ms maximum", duration, MAX_CLIP_DURATION_MS),
        ));
    }
    Ok(duration)
}

/// Native when strictly under budget, reduced otherwise.
pub fn select_rendition(native_bytes: u64, budget_bytes: u64) -> Rendition {
    if native_bytes < budget_bytes {
        Rendition::Native
    } else {
        Rendition::Reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_validate_range() {
        assert_eq!(validate_range(5000, 9000).unwrap(), 4000);
        assert_eq!(validate_range(0, 10_000).unwrap(), 10_000);
        assert_eq!(validate_range(7000, 7000).unwrap(), 0);
    }

    #[test]
    fn test_validate_range_rejects_long_and_reversed() {
        assert!(matches!(
            validate_range(5000, 16_000),
            Err(ClipError::InvalidRange { .. })
        ));
        assert!(matches!(
            validate_range(16_000, 5000),
            Err(ClipError::InvalidRange { .. })
        ));
        assert!(validate_range(0, 10_001).is_err());
    }

    #[test]
    fn test_select_rendition() {
        assert_eq!(select_rendition(3 * MIB, 2 * MIB), Rendition::Reduced);
        assert_eq!(select_rendition(MIB, 2 * MIB), Rendition::Native);
        assert_eq!(select_rendition(2 * MIB, 2 * MIB), Rendition::Reduced);
    }
}
