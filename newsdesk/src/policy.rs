use common::ContentPolicyConfig;
use tracing::info;

/// Drops images served from syndication agencies we are not licensed to reuse.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    blocked: Vec<String>,
}

impl ContentPolicy {
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked: blocked
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ContentPolicyConfig) -> Self {
        Self::new(&config.blocked_image_hosts)
    }

    /// Returns the image URL to publish, or `None` when it is empty or blocklisted.
    pub fn filter_image(&self, image_url: Option<&str>) -> Option<String> {
        let url = image_url.map(str::trim).filter(|u| !u.is_empty())?;
        let lowered = url.to_lowercase();
        if let Some(hit) = self.blocked.iter().find(|b| lowered.contains(b.as_str())) {
            info!(image_url = url, blocked = %hit, "dropping syndicated image");
            return None;
        }
        Some(url.to_string())
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::from_config(&ContentPolicyConfig::default())
    }
}
