//! The server identifier type.

use uuid::Uuid;

use crate::IdError;

/// Canonical length of a hyphenated UUID.
const UUID_LEN: usize = 36;

/// Byte offsets of the group separators in `8-4-4-4-12`.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Identifier of one (mock) compute node.
///
/// Only the lowercase hyphenated form is accepted; uppercase, braced, URN
/// and simple (unhyphenated) forms are all rejected even though they name
/// a valid UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerUuid(Uuid);

impl ServerUuid {
    /// Parses an identifier from its canonical string form.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }

        if s.len() != UUID_LEN {
            return Err(IdError::InvalidLength { actual: s.len() });
        }

        for (position, found) in s.char_indices() {
            let ok = if HYPHEN_POSITIONS.contains(&position) {
                found == '-'
            } else {
                matches!(found, '0'..='9' | 'a'..='f')
            };
            if !ok {
                return Err(IdError::InvalidCharacter { position, found });
            }
        }

        let uuid = Uuid::parse_str(s).map_err(|e| IdError::InvalidUuid(e.to_string()))?;
        Ok(Self(uuid))
    }
}

impl std::fmt::Display for ServerUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for ServerUuid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ServerUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ServerUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Returns true if `s` is a UUID in canonical lowercase hyphenated form.
pub fn is_uuid(s: &str) -> bool {
    ServerUuid::parse(s).is_ok()
}
