//! Delivery channels and ordered channel sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A delivery channel supported by the platform.
///
/// The set of channels is closed: a channel that is not listed here cannot
/// be constructed, parsed, or routed to. Transports for each channel are
/// injected as adapters; this type only names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Push,
    InApp,
}

impl Channel {
    /// Every channel, in canonical order.
    pub const ALL: [Self; 3] = [Self::Email, Self::Push, Self::InApp];

    /// The canonical lowercase name (`email`, `push`, `in_app`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Push => "push",
            Self::InApp => "in_app",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown channel name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel `{0}`, expected one of: email, push, in_app")]
pub struct ParseChannelError(pub String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "push" => Ok(Self::Push),
            "in_app" => Ok(Self::InApp),
            other => Err(ParseChannelError(other.to_owned())),
        }
    }
}

/// An ordered set of channels.
///
/// Insertion order is preserved and duplicates collapse. Order matters: an
/// event's first-declared channel is the routing fallback when a preference
/// intersection comes up empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Channel>", into = "Vec<Channel>")]
pub struct ChannelSet(Vec<Channel>);

impl ChannelSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a channel, keeping insertion order. Returns `false` if it was
    /// already present.
    pub fn insert(&mut self, channel: Channel) -> bool {
        if self.0.contains(&channel) {
            false
        } else {
            self.0.push(channel);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, channel: Channel) -> bool {
        self.0.contains(&channel)
    }

    /// The first-declared channel, if any.
    #[must_use]
    pub fn first(&self) -> Option<Channel> {
        self.0.first().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> {
        self.0.iter().copied()
    }

    /// Channels of `self` that are also in `other`, in `self`'s order.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.iter().filter(|c| other.contains(*c)).collect())
    }

    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.iter().all(|c| other.contains(c))
    }
}

impl From<Vec<Channel>> for ChannelSet {
    fn from(channels: Vec<Channel>) -> Self {
        channels.into_iter().collect()
    }
}

impl From<ChannelSet> for Vec<Channel> {
    fn from(set: ChannelSet) -> Self {
        set.0
    }
}

impl<const N: usize> From<[Channel; N]> for ChannelSet {
    fn from(channels: [Channel; N]) -> Self {
        channels.into_iter().collect()
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<T: IntoIterator<Item = Channel>>(iter: T) -> Self {
        let mut set = Self::new();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

impl IntoIterator for ChannelSet {
    type Item = Channel;
    type IntoIter = std::vec::IntoIter<Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for channel in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(channel, f)?;
            first = false;
        }
        Ok(())
    }
}
