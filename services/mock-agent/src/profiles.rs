//! Canned hardware profiles.
//!
//! A profile is a template of inventory values for one real hardware
//! configuration. The set is loaded once at startup, either from the
//! embedded `profiles/canned_profiles.json` or from a file named in the
//! configuration, and never changes afterwards.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::inventory::InventoryRecord;

const EMBEDDED_PROFILES: &str = include_str!("../profiles/canned_profiles.json");

/// Errors loading the profile set.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profiles from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profiles: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("profile document must be an object of objects (bad entry: {0})")]
    NotAnObject(String),

    #[error("no canned profiles defined")]
    Empty,
}

/// One named hardware template.
#[derive(Debug, Clone)]
pub struct CannedProfile {
    name: String,
    template: InventoryRecord,
}

impl CannedProfile {
    /// Profile name (e.g. `C2100`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field values this profile supplies.
    pub fn template(&self) -> &InventoryRecord {
        &self.template
    }
}

/// The fixed, non-empty set of canned profiles.
#[derive(Debug, Clone)]
pub struct CannedProfiles {
    profiles: Vec<CannedProfile>,
}

impl CannedProfiles {
    /// The profiles compiled into the binary.
    pub fn embedded() -> Result<Self, ProfileError> {
        Self::from_json(EMBEDDED_PROFILES)
    }

    /// Load profiles from a JSON file.
    pub async fn load(path: &Path) -> Result<Self, ProfileError> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProfileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let profiles = Self::from_json(&data)?;
        info!(
            path = %path.display(),
            count = profiles.len(),
            "Loaded canned profiles"
        );
        Ok(profiles)
    }

    /// Parse a `{name: {field: value}}` document.
    pub fn from_json(data: &str) -> Result<Self, ProfileError> {
        let Value::Object(document) = serde_json::from_str::<Value>(data)? else {
            return Err(ProfileError::NotAnObject("<root>".to_string()));
        };

        let profiles = document
            .into_iter()
            .map(|(name, template)| match template {
                Value::Object(template) => Ok(CannedProfile { name, template }),
                _ => Err(ProfileError::NotAnObject(name)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(profiles)
    }

    /// Build from already-parsed profiles.
    pub fn new(profiles: Vec<CannedProfile>) -> Result<Self, ProfileError> {
        if profiles.is_empty() {
            return Err(ProfileError::Empty);
        }
        Ok(Self { profiles })
    }

    /// Pick one profile uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &CannedProfile {
        &self.profiles[rng.random_range(0..self.profiles.len())]
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<&CannedProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Profile names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if there are no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{field_spec, fields, ValidationMode};

    #[test]
    fn test_embedded_profiles() {
        let profiles = CannedProfiles::embedded().unwrap();
        let names: Vec<_> = profiles.names().collect();
        assert_eq!(names, vec!["C2100", "R710", "X4270"]);

        for name in names {
            let template = profiles.get(name).unwrap().template();
            assert!(
                template
                    .get(fields::NETWORK_INTERFACES)
                    .is_some_and(Value::is_object),
                "{name} has no NIC map"
            );
            // Defaults engine owns these.
            assert!(!template.contains_key(fields::UUID));
            assert!(!template.contains_key(fields::BOOT_TIME));
        }
    }

    #[test]
    fn test_embedded_values_pass_schema() {
        let profiles = CannedProfiles::embedded().unwrap();

        for name in profiles.names() {
            for (field, value) in profiles.get(name).unwrap().template() {
                let spec = field_spec(field)
                    .unwrap_or_else(|| panic!("{name} sets unknown field {field:?}"));
                for mode in [ValidationMode::Lenient, ValidationMode::Strict] {
                    assert!(
                        spec.kind.accepts(value, mode),
                        "{name}: {field:?} = {value} fails {mode:?} validation"
                    );
                }
            }
        }
    }

    #[test]
    fn test_choose_stays_in_set() {
        let profiles = CannedProfiles::embedded().unwrap();
        let mut rng = rand::rng();
        for _ in 0..32 {
            let chosen = profiles.choose(&mut rng);
            assert!(profiles.get(chosen.name()).is_some());
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            CannedProfiles::from_json("{}"),
            Err(ProfileError::Empty)
        ));
    }

    #[test]
    fn test_rejects_non_object_profile() {
        let err = CannedProfiles::from_json(r#"{"C2100": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, ProfileError::NotAnObject(name) if name == "C2100"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            CannedProfiles::from_json("{"),
            Err(ProfileError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, r#"{"Tiny": {"MiB of Memory": 1024}}"#).unwrap();

        let profiles = CannedProfiles::load(&path).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert!(profiles.get("Tiny").is_some());

        let missing = CannedProfiles::load(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(ProfileError::Io { .. })));
    }
}
