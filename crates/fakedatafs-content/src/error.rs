//! Error types for the fakedatafs-content subsystem

/// Errors returned by positional reads over synthetic content.
///
/// Reaching end-of-file is never an error: readers report it through a short
/// count instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Negative offsets are not supported
    #[error("Negative offset {offset} is not supported")]
    NegativeOffset {
        /// Offset requested by the caller
        offset: i64,
    },
    /// Offset lies past the last byte of the file
    #[error("Offset {offset} beyond end of file (size {size})")]
    OffsetBeyondEof {
        /// Offset requested by the caller
        offset: u64,
        /// Size of the file in bytes
        size: u64,
    },
}

/// Result alias for content operations.
pub type Result<T> = std::result::Result<T, ContentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_negative_offset() {
        let err = ContentError::NegativeOffset { offset: -5 };
        assert_eq!(err.to_string(), "Negative offset -5 is not supported");
    }

    #[test]
    fn test_display_beyond_eof() {
        let err = ContentError::OffsetBeyondEof {
            offset: 100,
            size: 10,
        };
        assert!(err.to_string().contains("beyond end of file"));
    }
}
