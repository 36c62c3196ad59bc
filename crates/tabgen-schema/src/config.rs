use serde::{Deserialize, Serialize};
use url::Url;

use crate::path::{normalize_locator, normalize_path};

/// Location of the schemas API, used to synthesize `$id` values and to
/// recognize references that point back at locally served schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaApiConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Route prefix the schemas are served under.
    pub schemas_route: String,
}

impl Default for SchemaApiConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 5000,
            schemas_route: "/schemas-api/1.0.0/".to_string(),
        }
    }
}

impl SchemaApiConfig {
    /// `protocol://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// `$id` for the schema at `locator`, optionally pointing into it.
    pub fn schema_id(&self, locator: &str, fragment: Option<&str>) -> String {
        let route = normalize_path(&format!("{}{}", self.schemas_route, locator));
        format!("{}{}{}", self.base_url(), route, fragment.unwrap_or(""))
    }

    /// Map a reference URL back to a schema locator when it points at this
    /// API. Fragments are ignored.
    pub fn locator_for(&self, url: &Url) -> Option<String> {
        if url.scheme() != self.protocol
            || url.host_str() != Some(self.host.as_str())
            || url.port_or_known_default() != Some(self.port)
        {
            return None;
        }

        let route = normalize_path(&self.schemas_route);
        let rest = url
            .path()
            .strip_prefix(route.trim_end_matches('/'))?
            .strip_prefix('/')?;
        let locator = normalize_locator(rest);
        if locator.is_empty() { None } else { Some(locator) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_id_joins_route_and_locator() {
        let config = SchemaApiConfig::default();
        assert_eq!(
            config.schema_id("/generate", None),
            "http://localhost:5000/schemas-api/1.0.0/generate"
        );
        assert_eq!(
            config.schema_id("generate", Some("#/definitions/randomNumber")),
            "http://localhost:5000/schemas-api/1.0.0/generate#/definitions/randomNumber"
        );
    }

    #[test]
    fn locator_for_accepts_only_local_schema_urls() {
        let config = SchemaApiConfig::default();
        let local = Url::parse("http://localhost:5000/schemas-api/1.0.0/nested/generate#/x")
            .expect("valid url");
        assert_eq!(config.locator_for(&local).as_deref(), Some("nested/generate"));

        let other_host = Url::parse("http://example.com:5000/schemas-api/1.0.0/generate")
            .expect("valid url");
        assert_eq!(config.locator_for(&other_host), None);

        let other_route =
            Url::parse("http://localhost:5000/data-api/1.0.0/generate").expect("valid url");
        assert_eq!(config.locator_for(&other_route), None);

        let bare_route = Url::parse("http://localhost:5000/schemas-api/1.0.0/").expect("valid url");
        assert_eq!(config.locator_for(&bare_route), None);
    }
}
