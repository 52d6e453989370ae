//! API key lookup per site.

use std::collections::BTreeMap;

use tracing::warn;

use crate::document::SettingsDocument;

/// API keys by site URL.
///
/// A site maps to `None` when it has no key or only offers the v1 API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteKeys {
    keys: BTreeMap<String, Option<String>>,
}

impl SiteKeys {
    /// Collect the keys of every non-default site in a document.
    ///
    /// The default block never contributes a key.
    pub fn from_document(document: &SettingsDocument) -> Self {
        let keys = document
            .sites()
            .map(|(site, settings)| {
                let key = if settings.v1 {
                    None
                } else {
                    settings.key.clone()
                };
                (site.to_string(), key)
            })
            .collect();

        Self { keys }
    }

    /// Apply command-line keys, pairing the n-th site with the n-th key.
    ///
    /// Sites without a matching key keep their current entry.
    pub fn override_with<S, K>(&mut self, sites: &[S], keys: &[K])
    where
        S: AsRef<str>,
        K: AsRef<str>,
    {
        if keys.len() > sites.len() {
            warn!(
                site_count = sites.len(),
                key_count = keys.len(),
                "More API keys than sites given; ignoring the surplus keys"
            );
        }

        for (site, key) in sites.iter().zip(keys) {
            self.keys
                .insert(site.as_ref().to_string(), Some(key.as_ref().to_string()));
        }
    }

    /// The API key for a site, if any.
    pub fn get(&self, site: &str) -> Option<&str> {
        self.keys.get(site).and_then(|key| key.as_deref())
    }

    /// The key to authenticate API calls for a site that are sent to `remote`.
    ///
    /// The remote site's own key wins. Without one, the site's key is used,
    /// so a site behind a keyless remote still gets the v2 API.
    pub fn api_key(&self, site: &str, remote: &str) -> Option<&str> {
        self.get(remote).or_else(|| self.get(site))
    }
}
