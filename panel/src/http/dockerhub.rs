//! DockerHub tag lookup

use std::collections::BTreeMap;

use github_models::TagPage;
use tracing::debug;

use crate::errors::PanelError;
use crate::http::client::HttpClient;
use crate::storage::settings::DockerHubSettings;

/// Tags with this prefix are per-commit builds and are never offered
const COMMIT_TAG_PREFIX: &str = "sha-";

/// Image names are interpolated into the tags URL
pub fn validate_image_name(image: &str) -> Result<(), PanelError> {
    let valid = !image.is_empty()
        && image
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"._-".contains(&b));
    if valid {
        Ok(())
    } else {
        Err(PanelError::ValidationError("Image name is invalid".to_string()))
    }
}

/// Lists image tags of the configured DockerHub namespace
#[derive(Debug, Clone)]
pub struct DockerHubClient {
    http_client: HttpClient,
    settings: DockerHubSettings,
}

impl DockerHubClient {
    pub fn new(http_client: HttpClient, settings: DockerHubSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    /// Image whose tags are the available schema versions
    pub fn schema_image(&self) -> &str {
        &self.settings.schema_image
    }

    fn tags_url(&self, image: &str) -> String {
        format!(
            "{}/v2/repositories/{}/{}/tags/?page_size=1000",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.namespace,
            image
        )
    }

    /// All tags of `image`, name-sorted, mapped to their last update time
    pub async fn fetch_tags_for_image(
        &self,
        image: &str,
    ) -> Result<BTreeMap<String, Option<String>>, PanelError> {
        validate_image_name(image)?;
        let mut tags = BTreeMap::new();
        let mut next = Some(self.tags_url(image));

        while let Some(url) = next {
            let page: TagPage = self.http_client.get(&url).await?;
            debug!("Fetched {} tags of {}", page.results.len(), image);
            tags.extend(collect_tags(page.results));
            next = page.next.filter(|url| !url.is_empty());
        }

        Ok(tags)
    }
}

fn collect_tags(
    tags: Vec<github_models::Tag>,
) -> impl Iterator<Item = (String, Option<String>)> {
    tags.into_iter()
        .filter(|tag| !tag.name.starts_with(COMMIT_TAG_PREFIX))
        .map(|tag| (tag.name, tag.last_updated))
}
