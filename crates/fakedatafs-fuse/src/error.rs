use fakedatafs_content::ContentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("Inode not found: {ino}")]
    NotFound { ino: u64 },

    #[error("No entry {name:?} in directory {parent}")]
    NoEntry { parent: u64, name: String },

    #[error("Not a directory: {ino}")]
    NotDirectory { ino: u64 },

    #[error("Is a directory: {ino}")]
    IsDirectory { ino: u64 },

    #[error("Read-only filesystem")]
    ReadOnly,

    #[error("Content error: {0}")]
    Content(#[from] ContentError),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    pub fn to_errno(&self) -> i32 {
        use libc::*;
        match self {
            FsError::NotFound { .. } => ENOENT,
            FsError::NoEntry { .. } => ENOENT,
            FsError::NotDirectory { .. } => ENOTDIR,
            FsError::IsDirectory { .. } => EISDIR,
            FsError::ReadOnly => EROFS,
            FsError::Content(ContentError::NegativeOffset { .. }) => EINVAL,
            FsError::Content(ContentError::OffsetBeyondEof { .. }) => EINVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_errno() {
        let err = FsError::NotFound { ino: 42 };
        assert_eq!(err.to_errno(), libc::ENOENT);
    }

    #[test]
    fn test_no_entry_errno() {
        let err = FsError::NoEntry {
            parent: 1,
            name: "missing".to_string(),
        };
        assert_eq!(err.to_errno(), libc::ENOENT);
    }

    #[test]
    fn test_not_directory_errno() {
        let err = FsError::NotDirectory { ino: 5 };
        assert_eq!(err.to_errno(), libc::ENOTDIR);
    }

    #[test]
    fn test_is_directory_errno() {
        let err = FsError::IsDirectory { ino: 1 };
        assert_eq!(err.to_errno(), libc::EISDIR);
    }

    #[test]
    fn test_read_only_errno() {
        assert_eq!(FsError::ReadOnly.to_errno(), libc::EROFS);
    }

    #[test]
    fn test_content_errors_map_to_einval() {
        let neg: FsError = ContentError::NegativeOffset { offset: -1 }.into();
        assert_eq!(neg.to_errno(), libc::EINVAL);

        let eof: FsError = ContentError::OffsetBeyondEof {
            offset: 10,
            size: 5,
        }
        .into();
        assert_eq!(eof.to_errno(), libc::EINVAL);
    }

    #[test]
    fn test_display_messages_non_empty() {
        let errors = [
            FsError::NotFound { ino: 1 },
            FsError::NoEntry {
                parent: 1,
                name: "x".to_string(),
            },
            FsError::NotDirectory { ino: 2 },
            FsError::IsDirectory { ino: 3 },
            FsError::ReadOnly,
            FsError::Content(ContentError::NegativeOffset { offset: -3 }),
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(!msg.is_empty(), "Error display should be non-empty");
        }
    }
}
