use std::path::Path;

use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// File the last signed-in profile is remembered in, under the data dir.
pub const PROFILE_FILE: &str = "profile.json";

/// Identity handed to the launch engine. Sign-in flows live outside this
/// crate; federated profiles arrive here already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LauncherProfile {
    Offline {
        name: String,
        uuid: String,
        access_token: String,
        client_token: String,
    },
    Federated {
        name: String,
        uuid: String,
        access_token: String,
        client_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        xuid: Option<String>,
        #[serde(default)]
        user_properties: serde_json::Value,
    },
}

impl LauncherProfile {
    /// Deterministic offline identity: the same name always yields the same
    /// uuid and tokens.
    pub fn offline(name: &str) -> Self {
        let name = name.trim();
        let digest: [u8; 16] = Md5::digest(format!("OfflinePlayer:{name}")).into();
        let uuid = uuid::Builder::from_md5_bytes(digest).into_uuid();

        Self::Offline {
            name: name.to_string(),
            uuid: uuid.hyphenated().to_string(),
            access_token: sha1_hex(&format!("Access:{name}:salt123")),
            client_token: sha1_hex(&format!("Client:{name}:salt456")),
        }
    }

    /// Saved profile if it belongs to `username`, otherwise an offline one.
    pub fn resolve(saved: Option<LauncherProfile>, username: &str) -> Self {
        match saved {
            Some(profile) if profile.name() == username.trim() => {
                debug!("Using saved {} profile for {}", profile.kind(), username);
                profile
            }
            _ => Self::offline(username),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Offline { name, .. } | Self::Federated { name, .. } => name,
        }
    }

    pub fn uuid(&self) -> &str {
        match self {
            Self::Offline { uuid, .. } | Self::Federated { uuid, .. } => uuid,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offline { .. } => "offline",
            Self::Federated { .. } => "federated",
        }
    }

    /// Remembered profile at `path`; unreadable files count as none.
    pub async fn load(path: &Path) -> Option<Self> {
        let raw = tokio::fs::read(path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Ignoring unreadable profile {:?}: {}", path, e);
                None
            }
        }
    }

    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }
}

fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_profile_is_deterministic() {
        let a = LauncherProfile::offline("Steve");
        let b = LauncherProfile::offline(" Steve ");
        assert_eq!(a, b);
        assert_eq!(a.name(), "Steve");
        // Same value vanilla servers compute for offline players.
        assert_eq!(a.uuid(), "5627dd98-e6be-3c21-b8a8-e92344183641");
        assert_ne!(LauncherProfile::offline("Alex").uuid(), a.uuid());
    }

    #[test]
    fn offline_uuid_is_name_based_md5() {
        let profile = LauncherProfile::offline("Notch");
        let parsed = uuid::Uuid::parse_str(profile.uuid()).unwrap();
        assert_eq!(parsed.get_version_num(), 3);
    }

    #[test]
    fn saved_profile_only_used_for_matching_name() {
        let saved = LauncherProfile::Federated {
            name: "Steve".into(),
            uuid: "069a79f4-44e9-4726-a5be-fca90e38aaf5".into(),
            access_token: "token".into(),
            client_token: "client".into(),
            xuid: Some("2535".into()),
            user_properties: serde_json::json!({}),
        };

        let same = LauncherProfile::resolve(Some(saved.clone()), "Steve");
        assert_eq!(same, saved);

        let other = LauncherProfile::resolve(Some(saved), "Alex");
        assert_eq!(other.kind(), "offline");
        assert_eq!(other.name(), "Alex");
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(LauncherProfile::offline("Steve")).unwrap();
        assert_eq!(json["type"], "offline");
        assert_eq!(json["name"], "Steve");
        assert_eq!(json["access_token"].as_str().unwrap().len(), 40);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROFILE_FILE);
        assert!(LauncherProfile::load(&path).await.is_none());

        let profile = LauncherProfile::offline("Steve");
        profile.save(&path).await.unwrap();
        assert_eq!(LauncherProfile::load(&path).await, Some(profile));
    }
}
