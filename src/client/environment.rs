//! Who is running the client, and on what.

/// Login name of the current user, from `USER` or `USERNAME`.
pub fn current_username() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
}

/// Short platform name the service groups readings by.
pub fn platform() -> String {
    platform_name(std::env::consts::OS)
}

fn platform_name(os: &str) -> String {
    match os {
        "macos" => "mac",
        "windows" => "win",
        "linux" => "linux",
        other => other,
    }
    .to_string()
}

/// Who the worker reports as. The platform string travels with the
/// [`ResolutionClient`](super::ResolutionClient) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Resolve the identity from an optional override and the environment.
    pub fn discover(username_override: Option<&str>) -> Option<Self> {
        username_override
            .map(str::to_string)
            .or_else(current_username)
            .map(Self::new)
    }
}
