use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

/// Policy for the effective read time of a ticket when no local read marker
/// exists. `UpdatedAt` reproduces the hosted platform's behavior: the
/// ticket's `updated_at` stands in for "last read", which retroactively
/// marks messages read whenever an unrelated update bumps the ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadMarkerFallback {
    UpdatedAt,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub documents: DocumentConfig,
    pub storage: StorageConfig,
}

/// Remote backend endpoints. `url == None` means the backend is not
/// configured: remote features degrade and the local fallback is selected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub realtime_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Restored sessions are trusted without server-side validation; a
    /// negative validator verdict is logged and ignored.
    #[serde(default = "default_trust_on_restore")]
    pub trust_on_restore: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_read_marker_fallback")]
    pub read_marker_fallback: ReadMarkerFallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite URL for the durable client store (and the local-fallback
    /// backend when no remote backend is configured).
    pub database_url: String,
}

fn default_trust_on_restore() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_read_marker_fallback() -> ReadMarkerFallback {
    ReadMarkerFallback::UpdatedAt
}

fn default_page_size() -> u32 {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            trust_on_restore: default_trust_on_restore(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            poll_interval_secs: default_poll_interval(),
            read_marker_fallback: default_read_marker_fallback(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            page_size: default_page_size(),
        }
    }
}

impl PortalConfig {
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("QUILLSIGN_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config: PortalConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [storage]
                database_url = "sqlite://portal.db"
                "#,
            ))
            .extract()
            .unwrap();

        assert!(config.backend.url.is_none());
        assert!(config.session.trust_on_restore);
        assert_eq!(config.notifications.poll_interval_secs, 30);
        assert_eq!(
            config.notifications.read_marker_fallback,
            ReadMarkerFallback::UpdatedAt
        );
        assert_eq!(config.documents.page_size, 10);
    }

    #[test]
    fn read_marker_fallback_parses_kebab_case() {
        let config: PortalConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [storage]
                database_url = "sqlite://portal.db"

                [notifications]
                read_marker_fallback = "none"
                "#,
            ))
            .extract()
            .unwrap();
        assert_eq!(
            config.notifications.read_marker_fallback,
            ReadMarkerFallback::None
        );
    }
}
