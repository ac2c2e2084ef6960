//! Terraform provider version resolution.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use idcgen_core::Platform;

use crate::error::{IacError, IacResult};

/// Public Terraform registry.
pub const REGISTRY_URL: &str = "https://registry.terraform.io";

/// Terraform providers the generated configuration requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerraformProvider {
    Aws,
    Tfe,
}

impl TerraformProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerraformProvider::Aws => "aws",
            TerraformProvider::Tfe => "tfe",
        }
    }

    /// Version used when the registry is not consulted.
    pub fn pinned_version(&self) -> &'static str {
        match self {
            TerraformProvider::Aws => "5.85.0",
            TerraformProvider::Tfe => "0.63.0",
        }
    }
}

impl std::fmt::Display for TerraformProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lists published versions of a provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn versions(&self, provider: TerraformProvider) -> IacResult<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
}

/// [`VersionSource`] backed by the Terraform registry API.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: REGISTRY_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VersionSource for RegistryClient {
    async fn versions(&self, provider: TerraformProvider) -> IacResult<Vec<String>> {
        let url = format!(
            "{}/v1/providers/hashicorp/{}/versions",
            self.base_url.trim_end_matches('/'),
            provider
        );
        let registry_error = |message: String| IacError::Registry {
            provider: provider.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| registry_error(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(registry_error(format!("registry returned {}", response.status())));
        }

        let body: VersionsResponse = response
            .json()
            .await
            .map_err(|e| registry_error(format!("unreadable response: {}", e)))?;

        Ok(body.versions.into_iter().map(|v| v.version).collect())
    }
}

/// Highest version without a pre-release or build suffix.
pub fn latest_stable(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| {
            let parts: Option<Vec<u64>> = v.split('.').map(|p| p.parse().ok()).collect();
            parts.map(|parts| (parts, v))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, v)| v.clone())
}

/// Provider versions written into provider blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderVersions {
    pub aws: String,
    pub tfe: String,
}

impl Default for ProviderVersions {
    fn default() -> Self {
        Self {
            aws: TerraformProvider::Aws.pinned_version().to_string(),
            tfe: TerraformProvider::Tfe.pinned_version().to_string(),
        }
    }
}

/// Resolve provider versions, looking up the registry when a source is
/// given. TFE is only looked up for Terraform Cloud. Lookup failures fall
/// back to the pinned version.
pub async fn resolve_versions(
    source: Option<&dyn VersionSource>,
    platform: Platform,
) -> ProviderVersions {
    let mut versions = ProviderVersions::default();
    let Some(source) = source else {
        debug!("Using pinned provider versions");
        return versions;
    };

    versions.aws = lookup(source, TerraformProvider::Aws).await;
    if platform == Platform::Tfc {
        versions.tfe = lookup(source, TerraformProvider::Tfe).await;
    }
    versions
}

async fn lookup(source: &dyn VersionSource, provider: TerraformProvider) -> String {
    let pinned = provider.pinned_version().to_string();
    match source.versions(provider).await {
        Ok(found) => match latest_stable(&found) {
            Some(latest) => {
                info!("Using {} provider {}", provider, latest);
                latest
            }
            None => {
                warn!("No stable {} provider version found, using {}", provider, pinned);
                pinned
            }
        },
        Err(e) => {
            warn!("{}; using pinned {} provider {}", e, provider, pinned);
            pinned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_latest_stable_skips_prereleases() {
        let versions = strings(&["5.9.0", "5.85.0", "6.0.0-beta1", "5.100.0-rc.1", "5.10.2"]);
        assert_eq!(latest_stable(&versions), Some("5.85.0".to_string()));
        assert_eq!(latest_stable(&strings(&["1.0.0-alpha"])), None);
    }

    #[tokio::test]
    async fn test_resolve_without_source_is_pinned() {
        let versions = resolve_versions(None, Platform::Tfc).await;
        assert_eq!(versions, ProviderVersions::default());
        assert_eq!(versions.aws, "5.85.0");
        assert_eq!(versions.tfe, "0.63.0");
    }

    #[tokio::test]
    async fn test_resolve_local_only_looks_up_aws() {
        let mut source = MockVersionSource::new();
        source
            .expect_versions()
            .with(eq(TerraformProvider::Aws))
            .times(1)
            .returning(|_| Ok(vec!["5.90.1".to_string(), "5.91.0-beta".to_string()]));

        let versions = resolve_versions(Some(&source), Platform::Local).await;
        assert_eq!(versions.aws, "5.90.1");
        assert_eq!(versions.tfe, "0.63.0");
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back() {
        let mut source = MockVersionSource::new();
        source.expect_versions().returning(|provider| {
            Err(IacError::Registry {
                provider: provider.to_string(),
                message: "offline".to_string(),
            })
        });

        let versions = resolve_versions(Some(&source), Platform::Tfc).await;
        assert_eq!(versions, ProviderVersions::default());
    }
}
