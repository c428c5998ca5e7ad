use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::HuddleError;

/// Call parameters fixed at startup.
///
/// Production deployments would source the token and channel from an auth
/// service; here they are static for the process lifetime, matching the demo
/// client this core backs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CallConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    /// 0 lets the engine assign a uid at join time.
    #[serde(default)]
    pub local_uid: u32,
}

fn default_app_id() -> String {
    "appId".to_string()
}

fn default_token() -> String {
    "token".to_string()
}

fn default_channel() -> String {
    "channel".to_string()
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            token: default_token(),
            channel: default_channel(),
            local_uid: 0,
        }
    }
}

impl CallConfig {
    /// Load config from a JSON file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error, since joining with half-read credentials would
    /// fail in a much less obvious way later.
    pub fn load(path: &Path) -> Result<Self, HuddleError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| HuddleError::Config(e.to_string()))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config() {
        let c = CallConfig::default();
        assert_eq!(c.app_id, "appId");
        assert_eq!(c.token, "token");
        assert_eq!(c.channel, "channel");
        assert_eq!(c.local_uid, 0);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = CallConfig::load(&dir.path().join("call.json")).unwrap();
        assert_eq!(c, CallConfig::default());
    }

    #[test]
    fn load_partial_json_uses_serde_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.json");
        fs::write(&path, r#"{"channel":"standup"}"#).unwrap();
        let c = CallConfig::load(&path).unwrap();
        assert_eq!(c.channel, "standup");
        assert_eq!(c.token, "token");
        assert_eq!(c.local_uid, 0);
    }

    #[test]
    fn load_full_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.json");
        fs::write(
            &path,
            r#"{"app_id":"a1","token":"t1","channel":"c1","local_uid":12}"#,
        )
        .unwrap();
        let c = CallConfig::load(&path).unwrap();
        assert_eq!(c.app_id, "a1");
        assert_eq!(c.token, "t1");
        assert_eq!(c.channel, "c1");
        assert_eq!(c.local_uid, 12);
    }

    #[test]
    fn load_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.json");
        fs::write(&path, "not json!!!").unwrap();
        assert!(matches!(
            CallConfig::load(&path),
            Err(HuddleError::Config(_))
        ));
    }
}
