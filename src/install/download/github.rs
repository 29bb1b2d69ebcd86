//! GitHub release API interaction

use std::time::Duration;

use log::{debug, info};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::LauncherConfig;
use crate::error::{LauncherError, Result};

/// Latest-release metadata from the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    #[serde(alias = "tagName")]
    pub tag_name: String,
    pub assets: Vec<ReleaseAsset>,
}

/// Release asset metadata
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(alias = "downloadUrl")]
    pub browser_download_url: String,
}

impl ReleaseMetadata {
    /// Asset whose name is exactly `name`
    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    /// Asset names starting with `prefix`, in release order
    pub fn asset_names_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.assets
            .iter()
            .filter(|asset| asset.name.starts_with(prefix))
            .map(|asset| asset.name.clone())
            .collect()
    }
}

/// HTTP client for the release index and asset downloads.
///
/// Redirects are never followed by the transport; `download_asset` handles
/// them itself with a bounded hop count.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    pub(super) http: reqwest::Client,
    latest_url: String,
    metadata_timeout: Duration,
    pub(super) download_timeout: Duration,
    pub(super) inactivity_timeout: Duration,
    pub(super) max_redirects: usize,
}

impl ReleaseClient {
    pub fn new(cfg: &LauncherConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(cfg.connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| LauncherError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            latest_url: cfg.latest_release_url(),
            metadata_timeout: cfg.metadata_timeout(),
            download_timeout: cfg.download_timeout(),
            inactivity_timeout: cfg.download_inactivity(),
            max_redirects: cfg.max_redirects,
        })
    }

    /// Fetch latest release metadata
    pub async fn fetch_latest_release(&self) -> Result<ReleaseMetadata> {
        info!("Fetching latest release information...");
        let network = |status: Option<u16>, message: String| LauncherError::Network {
            url: self.latest_url.clone(),
            status,
            message,
        };

        let response = self
            .http
            .get(&self.latest_url)
            .timeout(self.metadata_timeout)
            .send()
            .await
            .map_err(|e| network(None, e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(network(
                Some(status.as_u16()),
                format!("GitHub API request failed: HTTP {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| network(Some(status.as_u16()), e.to_string()))?;
        let release: ReleaseMetadata =
            serde_json::from_str(&body).map_err(|e| LauncherError::MetadataParse(e.to_string()))?;

        debug!(
            "Release {} lists {} assets",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_github_payload_and_ignores_extra_fields() {
        let body = r#"{
            "tag_name": "v1.4.0",
            "name": "v1.4.0",
            "assets": [
                {"name": "kirha-mcp-installer-linux-amd64", "size": 10,
                 "browser_download_url": "https://example.invalid/a"},
                {"name": "kirha-mcp-installer-linux-amd64.sha256", "size": 80,
                 "browser_download_url": "https://example.invalid/a.sha256"}
            ]
        }"#;
        let release: ReleaseMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(release.tag_name, "v1.4.0");
        assert_eq!(
            release
                .find_asset("kirha-mcp-installer-linux-amd64.sha256")
                .map(|a| a.browser_download_url.as_str()),
            Some("https://example.invalid/a.sha256")
        );
        assert!(release.find_asset("kirha-mcp-installer-linux").is_none());
    }

    #[test]
    fn accepts_camel_case_payload() {
        let body = r#"{"tagName": "v2", "assets": [{"name": "x", "downloadUrl": "u"}]}"#;
        let release: ReleaseMetadata = serde_json::from_str(body).unwrap();
        assert_eq!(release.assets[0].browser_download_url, "u");
    }

    #[test]
    fn missing_assets_is_structurally_invalid() {
        assert!(serde_json::from_str::<ReleaseMetadata>(r#"{"tag_name": "v1"}"#).is_err());
    }

    #[test]
    fn prefix_listing_keeps_release_order() {
        let release = ReleaseMetadata {
            tag_name: "v1".into(),
            assets: ["tool-linux-amd64", "README.md", "tool-darwin-arm64"]
                .iter()
                .map(|name| ReleaseAsset {
                    name: name.to_string(),
                    browser_download_url: String::new(),
                })
                .collect(),
        };
        assert_eq!(
            release.asset_names_with_prefix("tool-"),
            vec!["tool-linux-amd64", "tool-darwin-arm64"]
        );
    }
}
