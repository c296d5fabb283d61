use std::fmt::{self, Display};

use serde::{de, ser};

pub type Result<T> = std::result::Result<T, Error>;

/// One step on the way from the top-level value to the value an error is
/// about: an array/struct position or a dictionary/struct-field key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// The sequence of field names and indices that led to a value.
///
/// Displayed as `$` for the top-level value, e.g. `$.items[2].name`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodingPath(Vec<PathSegment>);

impl CodingPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        CodingPath(segments)
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        CodingPath(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for CodingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Index(ix) => write!(f, "[{}]", ix)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
            }
        }
        Ok(())
    }
}

/// Why a signature string was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureProblem {
    #[error("unknown type code {0:?}")]
    UnknownTypeCode(char),
    #[error("unmatched struct parenthesis")]
    UnbalancedStruct,
    #[error("unmatched dict-entry brace")]
    UnbalancedDictEntry,
    #[error("dict-entry outside of an array")]
    DictEntryOutsideArray,
    #[error("dict-entry key must be a basic type")]
    NonBasicDictKey,
    #[error("dict-entry must hold exactly a key and a value")]
    DictEntryArity,
    #[error("struct has no fields")]
    EmptyStruct,
    #[error("array has no element type")]
    MissingArrayElement,
    #[error("signature is {0} bytes long, the maximum is 255")]
    TooLong(usize),
    #[error("nesting is deeper than the allowed 32 arrays and 32 structs")]
    TooDeep,
    #[error("expected exactly one complete type, found {0}")]
    NotSingleType(usize),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid signature {signature:?} at offset {offset}: {problem}")]
    Signature {
        signature: String,
        offset: usize,
        problem: SignatureProblem,
    },
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: CodingPath,
        expected: String,
        found: String,
    },
    #[error("container mismatch at {path}: {reason}")]
    ContainerMismatch { path: CodingPath, reason: String },
    #[error("value out of range at {path}: {value} does not fit {target}")]
    ValueRange {
        path: CodingPath,
        value: String,
        target: String,
    },
    #[error("unsupported value at {path}: {reason}")]
    UnsupportedValue { path: CodingPath, reason: String },
    #[error("corrupted data at {path} (body offset {offset}): {reason}")]
    DataCorrupted {
        path: CodingPath,
        offset: usize,
        reason: String,
    },
    #[error("a value was already encoded into the single-value slot at {path}")]
    EncodingInProgress { path: CodingPath },
    #[error("nesting limit of {limit} containers exceeded at {path}")]
    DepthLimitExceeded { path: CodingPath, limit: usize },
    #[error("error serializing: {0}")]
    Serializing(String),
    #[error("error deserializing: {0}")]
    Deserializing(String),
}

impl Error {
    pub(crate) fn type_mismatch(
        path: &CodingPath,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            path: path.clone(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn container_mismatch(reason: impl Into<String>) -> Self {
        Error::ContainerMismatch {
            path: CodingPath::root(),
            reason: reason.into(),
        }
    }

    pub(crate) fn value_range(
        path: &CodingPath,
        value: impl Display,
        target: impl Into<String>,
    ) -> Self {
        Error::ValueRange {
            path: path.clone(),
            value: value.to_string(),
            target: target.into(),
        }
    }

    pub(crate) fn unsupported(path: &CodingPath, reason: impl Into<String>) -> Self {
        Error::UnsupportedValue {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupted(offset: usize, reason: impl Into<String>) -> Self {
        Error::DataCorrupted {
            path: CodingPath::root(),
            offset,
            reason: reason.into(),
        }
    }

    /// The coding path an error refers to, when it has one.
    pub fn path(&self) -> Option<&CodingPath> {
        match self {
            Error::TypeMismatch { path, .. }
            | Error::ContainerMismatch { path, .. }
            | Error::ValueRange { path, .. }
            | Error::UnsupportedValue { path, .. }
            | Error::DataCorrupted { path, .. }
            | Error::EncodingInProgress { path }
            | Error::DepthLimitExceeded { path, .. } => Some(path),
            Error::Signature { .. } | Error::Serializing(_) | Error::Deserializing(_) => None,
        }
    }

    // Cursor-level errors know nothing about paths; the engines pin them
    // to the value being processed. The innermost location wins.
    pub(crate) fn located(mut self, at: &CodingPath) -> Self {
        match &mut self {
            Error::TypeMismatch { path, .. }
            | Error::ContainerMismatch { path, .. }
            | Error::ValueRange { path, .. }
            | Error::UnsupportedValue { path, .. }
            | Error::DataCorrupted { path, .. }
            | Error::EncodingInProgress { path }
            | Error::DepthLimitExceeded { path, .. } => {
                if path.is_root() {
                    *path = at.clone();
                }
            }
            Error::Signature { .. } | Error::Serializing(_) | Error::Deserializing(_) => {}
        }
        self
    }
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Serializing(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Deserializing(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{CodingPath, Error};
    use test_log::test;

    #[test]
    fn path_display() {
        let path = CodingPath::root().child_key("items").child_index(2).child_key("name");
        assert_eq!(path.to_string(), "$.items[2].name");
        assert_eq!(CodingPath::root().to_string(), "$");
    }

    #[test]
    fn innermost_location_wins() {
        let inner = CodingPath::root().child_index(3);
        let outer = CodingPath::root().child_key("outer");
        let err = Error::corrupted(12, "bad padding")
            .located(&inner)
            .located(&outer);
        assert_eq!(err.path(), Some(&inner));
    }
}
