use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform a push subscriber registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }

    /// Returns `true` for platforms served by a native shell.
    pub fn is_native(&self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            other => Err(format!("{other} is not a supported platform")),
        }
    }
}

/// State of the notification permission as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not decided yet. Browsers report this as `default`.
    #[serde(alias = "default", alias = "prompt-with-rationale")]
    Prompt,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

/// Maps the platform name reported by a native shell to a [`Platform`].
///
/// Anything that is not a native mobile platform, including no shell at all, is
/// treated as the browser.
pub fn detect_platform(native_shell: Option<&str>) -> Platform {
    native_shell
        .and_then(|name| name.parse::<Platform>().ok())
        .filter(Platform::is_native)
        .unwrap_or(Platform::Web)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_platform_prefers_native_shell() {
        assert_eq!(detect_platform(Some("ios")), Platform::Ios);
        assert_eq!(detect_platform(Some("Android")), Platform::Android);
        assert_eq!(detect_platform(Some("electron")), Platform::Web);
        assert_eq!(detect_platform(Some("web")), Platform::Web);
        assert_eq!(detect_platform(None), Platform::Web);
    }

    #[test]
    fn browser_default_permission_is_prompt() {
        let state: PermissionState = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(state, PermissionState::Prompt);
    }
}
