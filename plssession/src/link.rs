//! Liens `spotify:` vers les pistes et les playlists
//!
//! Links are kept in their canonical URI form, which doubles as their
//! identity: two links are equal iff their canonical strings are equal.

use std::{fmt, str::FromStr};

use plsdiff::Token;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

const SCHEME: &str = "spotify";
const WEB_PREFIXES: [&str; 2] = ["https://open.spotify.com/", "http://open.spotify.com/"];
const MAX_ID_LEN: usize = 64;

fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn valid_user(user: &str) -> bool {
    !user.is_empty()
        && !user
            .chars()
            .any(|c| c == ':' || c == '/' || c.is_whitespace() || c.is_control())
}

/// Splits `spotify:a:b:c` or `https://open.spotify.com/a/b/c` into parts.
fn segments(input: &str) -> Option<Vec<&str>> {
    let input = input.trim();
    if let Some(rest) = WEB_PREFIXES.iter().find_map(|p| input.strip_prefix(p)) {
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        return Some(rest.trim_end_matches('/').split('/').collect());
    }
    let mut parts = input.split(':');
    (parts.next() == Some(SCHEME)).then(|| parts.collect())
}

/// Canonical `spotify:track:<id>` link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackLink(String);

impl TrackLink {
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        match segments(input).as_deref() {
            Some(["track", id]) if valid_id(id) => Ok(Self(format!("{SCHEME}:track:{id}"))),
            _ => Err(SessionError::InvalidLink(input.to_string())),
        }
    }

    pub fn id(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Token for TrackLink {
    fn canonical(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PlaylistKind {
    Regular { owner: Option<String>, id: String },
    Starred { user: String },
}

/// Link to a playlist: `spotify:user:<user>:playlist:<id>`,
/// `spotify:playlist:<id>` or `spotify:user:<user>:starred`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaylistLink {
    uri: String,
    kind: PlaylistKind,
}

impl PlaylistLink {
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let kind = match segments(input).as_deref() {
            Some(["user", user, "playlist", id]) if valid_user(user) && valid_id(id) => {
                PlaylistKind::Regular {
                    owner: Some(user.to_string()),
                    id: id.to_string(),
                }
            }
            Some(["playlist", id]) if valid_id(id) => PlaylistKind::Regular {
                owner: None,
                id: id.to_string(),
            },
            Some(["user", user, "starred"]) if valid_user(user) => PlaylistKind::Starred {
                user: user.to_string(),
            },
            _ => return Err(SessionError::InvalidLink(input.to_string())),
        };
        Ok(Self::from_kind(kind))
    }

    pub fn for_user(owner: &str, id: &str) -> Result<Self, SessionError> {
        if !valid_user(owner) || !valid_id(id) {
            return Err(SessionError::InvalidLink(format!("{owner}/{id}")));
        }
        Ok(Self::from_kind(PlaylistKind::Regular {
            owner: Some(owner.to_string()),
            id: id.to_string(),
        }))
    }

    pub fn starred(user: &str) -> Result<Self, SessionError> {
        if !valid_user(user) {
            return Err(SessionError::InvalidLink(user.to_string()));
        }
        Ok(Self::from_kind(PlaylistKind::Starred {
            user: user.to_string(),
        }))
    }

    fn from_kind(kind: PlaylistKind) -> Self {
        let uri = match &kind {
            PlaylistKind::Regular {
                owner: Some(owner),
                id,
            } => format!("{SCHEME}:user:{owner}:playlist:{id}"),
            PlaylistKind::Regular { owner: None, id } => format!("{SCHEME}:playlist:{id}"),
            PlaylistKind::Starred { user } => format!("{SCHEME}:user:{user}:starred"),
        };
        Self { uri, kind }
    }

    /// User named in the link, if any
    pub fn user(&self) -> Option<&str> {
        match &self.kind {
            PlaylistKind::Regular { owner, .. } => owner.as_deref(),
            PlaylistKind::Starred { user } => Some(user),
        }
    }

    pub fn is_starred(&self) -> bool {
        matches!(self.kind, PlaylistKind::Starred { .. })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

macro_rules! impl_link_conversions {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = SessionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = SessionError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$ty> for String {
            fn from(link: $ty) -> String {
                link.as_str().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_link_conversions!(TrackLink);
impl_link_conversions!(PlaylistLink);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_links() {
        let link = TrackLink::parse("spotify:track:6JEK0CvvjDjjMUBFoXShNZ").unwrap();
        assert_eq!(link.id(), "6JEK0CvvjDjjMUBFoXShNZ");
        assert_eq!(link.canonical(), "spotify:track:6JEK0CvvjDjjMUBFoXShNZ");

        let web = TrackLink::parse("https://open.spotify.com/track/6JEK0CvvjDjjMUBFoXShNZ?si=x").unwrap();
        assert_eq!(web, link);

        for bad in ["", "spotify:track:", "spotify:album:abc", "track:abc", "spotify:track:a-b", "spotify:track:abc:extra"] {
            assert!(TrackLink::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_playlist_links() {
        let link = PlaylistLink::parse("spotify:user:alice:playlist:284on3DVWeAxWkgVuzZKGt").unwrap();
        assert_eq!(link.user(), Some("alice"));
        assert!(!link.is_starred());
        assert_eq!(link, PlaylistLink::for_user("alice", "284on3DVWeAxWkgVuzZKGt").unwrap());

        let anonymous = PlaylistLink::parse("spotify:playlist:284on3DVWeAxWkgVuzZKGt").unwrap();
        assert_eq!(anonymous.user(), None);

        let starred = PlaylistLink::parse("spotify:user:bob:starred").unwrap();
        assert!(starred.is_starred());
        assert_eq!(starred, PlaylistLink::starred("bob").unwrap());

        assert!(PlaylistLink::parse("spotify:track:abc").is_err());
        assert!(PlaylistLink::parse("spotify:user::playlist:abc").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let link = TrackLink::parse("spotify:track:abc").unwrap();
        assert_eq!(serde_json::to_string(&link).unwrap(), "\"spotify:track:abc\"");

        let parsed: PlaylistLink = serde_json::from_str("\"spotify:user:alice:starred\"").unwrap();
        assert!(parsed.is_starred());
        assert!(serde_json::from_str::<TrackLink>("\"nope\"").is_err());
    }
}
