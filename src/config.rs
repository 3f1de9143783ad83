//! Resolved admin configuration. Loading (YAML, env, CLI) is the embedding
//! application's concern; this struct only carries already-resolved values.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub site_title: String,
    pub default_per_page: usize,
    pub theme_color: String,
    /// Session lifetime in hours, measured from login.
    pub session_ttl_hours: i64,
    /// BelongsTo targets with at least this many rows switch from an inline
    /// options list to remote search in form views.
    pub search_threshold: u64,
    pub upload_dir: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            site_title: "Admin".into(),
            default_per_page: 10,
            theme_color: "#2563eb".into(),
            session_ttl_hours: 24,
            search_threshold: 50,
            upload_dir: "uploads".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = AdminConfig::default();
        assert_eq!(c.default_per_page, 10);
        assert_eq!(c.session_ttl_hours, 24);
        assert_eq!(c.search_threshold, 50);
        assert_eq!(c.upload_dir, "uploads");
    }

    #[test]
    fn partial_deserialization_falls_back_to_defaults() {
        let c: AdminConfig = serde_json::from_str(r#"{"site_title":"Shop Admin"}"#).unwrap();
        assert_eq!(c.site_title, "Shop Admin");
        assert_eq!(c.default_per_page, 10);
    }
}
