//! Newtype IDs for Waffle dataset records.
//!
//! Waffle numbers images, annotations and categories independently, each
//! starting at 1. Keeping them as distinct types stops an annotation id from
//! being used where a category id is expected during ID remapping.

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

            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of an image (`image_id` on disk).
    ImageId
);

record_id!(
    /// Identifier of an annotation (`annotation_id` on disk).
    AnnotationId
);

record_id!(
    /// Identifier of a category (`category_id` on disk).
    CategoryId
);

/// Hands out sequential 1-based ids, the numbering every importer uses.
#[derive(Clone, Copy, Debug)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn new() -> Self {
        Self(1)
    }

    /// Returns the current id and advances the counter.
    pub fn next_id(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}
