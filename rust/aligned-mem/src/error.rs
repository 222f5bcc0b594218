use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_alignment(alignment: usize) -> Error {
        Error(ErrorKind::InvalidAlignment { alignment }.into())
    }

    pub fn size_overflow(count: usize, element_size: usize) -> Error {
        Error(
            ErrorKind::SizeOverflow {
                count,
                element_size,
            }
            .into(),
        )
    }

    pub fn out_of_memory(size: usize, alignment: usize) -> Error {
        Error(ErrorKind::OutOfMemory { size, alignment }.into())
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfMemory { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("invalid alignment {alignment}: must be a non-zero power of two")]
    InvalidAlignment { alignment: usize },

    #[error("allocation size overflow: {count} elements of {element_size} bytes")]
    SizeOverflow { count: usize, element_size: usize },

    #[error("out of memory: failed to allocate {size} bytes aligned to {alignment}")]
    OutOfMemory { size: usize, alignment: usize },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::invalid_alignment(3);
        assert_eq!(
            e.to_string(),
            "invalid alignment 3: must be a non-zero power of two"
        );

        let e = Error::out_of_memory(1024, 64);
        assert!(e.is_out_of_memory());
        assert_eq!(
            e.to_string(),
            "out of memory: failed to allocate 1024 bytes aligned to 64"
        );
    }

    #[test]
    fn test_error_kind() {
        let e = Error::size_overflow(usize::MAX, 8);
        assert!(!e.is_out_of_memory());
        assert_eq!(
            e.into_kind(),
            ErrorKind::SizeOverflow {
                count: usize::MAX,
                element_size: 8
            }
        );
    }
}
