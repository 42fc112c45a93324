//! Newtype IDs for store records.
//!
//! Every record kind gets its own id type so an image id can never be passed
//! where a category id is expected. Ids are allocated by the store; the
//! exchange document carries its own foreign ids, which stay plain `u64`
//! until the import pipeline resolves them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }
    };
}

record_id!(
    /// Identifier of a dataset in the store.
    DatasetId
);
record_id!(
    /// Identifier of a category in the store.
    CategoryId
);
record_id!(
    /// Identifier of an image in the store.
    ImageId
);
record_id!(
    /// Identifier of an annotation in the store.
    AnnotationId
);
record_id!(
    /// Identifier of an export artifact record.
    ExportId
);
record_id!(
    /// Identifier of the background job running a pipeline.
    JobId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        assert_eq!(ImageId(1), ImageId(1));
        assert_ne!(ImageId(1), ImageId(2));
    }

    #[test]
    fn test_id_debug_names_the_kind() {
        assert_eq!(format!("{:?}", CategoryId(7)), "CategoryId(7)");
        assert_eq!(format!("{}", CategoryId(7)), "7");
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(AnnotationId(1));
        set.insert(AnnotationId(2));
        set.insert(AnnotationId(1)); // duplicate
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&DatasetId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
