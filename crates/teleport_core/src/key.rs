//! Transition keys
//!
//! A [`TransitionKey`] correlates one source observer, one destination
//! observer and one controller. Keys come either from a caller-supplied
//! string or from the string form of an item's identity.
//!
//! Both roles report geometry through the same channel, so reports are
//! tagged with a [`CompositeKey`]: the bare key for the source and
//! `key#dest` for the destination.

use std::borrow::Borrow;
use std::fmt;

/// Suffix that marks destination reports in the composite key space
pub const DESTINATION_SUFFIX: &str = "#dest";

/// Stable identity of one transition
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionKey(String);

impl TransitionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key from an item's identity
    pub fn from_identity<T: Identifiable + ?Sized>(item: &T) -> Self {
        Self(item.id().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Composite key for reports made in `role`
    pub fn composite(&self, role: Role) -> CompositeKey {
        CompositeKey {
            key: self.clone(),
            role,
        }
    }
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TransitionKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransitionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TransitionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&TransitionKey> for TransitionKey {
    fn from(key: &TransitionKey) -> Self {
        key.clone()
    }
}

/// Which end of a transition an observer stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Source,
    Destination,
}

/// A transition key qualified by the reporting role
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub key: TransitionKey,
    pub role: Role,
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::Source => write!(f, "{}", self.key),
            Role::Destination => write!(f, "{}{}", self.key, DESTINATION_SUFFIX),
        }
    }
}

/// Items with a stable identity that can name a transition
pub trait Identifiable {
    type Id: fmt::Display;

    fn id(&self) -> Self::Id;
}

macro_rules! identifiable_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identifiable for $ty {
                type Id = $ty;

                fn id(&self) -> Self::Id {
                    self.clone()
                }
            }
        )*
    };
}

identifiable_by_value!(String, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, char);

impl Identifiable for str {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.to_string()
    }
}

impl<T: Identifiable + ?Sized> Identifiable for &T {
    type Id = T::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }
}
