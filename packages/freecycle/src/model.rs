use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Category of a stored post.
///
/// The query wildcard is deliberately not representable here; it exists only
/// as [`Category::All`] and never ends up on a parsed post.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostKind {
    Offer,
    Wanted,
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKind::Offer => f.write_str("OFFER"),
            PostKind::Wanted => f.write_str("WANTED"),
        }
    }
}

/// Post category filter accepted by the group listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    Wanted,
    Offer,
    #[default]
    All,
}

impl Category {
    /// URL path segment the remote routes this filter on.
    pub(crate) fn path_segment(self) -> &'static str {
        match self {
            Category::Wanted => "wanted",
            Category::Offer => "offer",
            Category::All => "all",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// One listing parsed from a group's posts table.
///
/// Either every field was extracted from the row or no `Post` is produced at
/// all; there are no partially filled posts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Post {
    pub kind: PostKind,
    pub posted_at: OffsetDateTime,
    pub title: String,
    pub location: String,
    /// Source-assigned id, unique within a group but not globally.
    pub id: u64,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.kind, self.posted_at, self.title, self.location, self.id
        )
    }
}
