//! Intercepted requests and resource key normalization

use crate::error::PrecacheResult;
use crate::manifest::ResourceKey;
use reqwest::Method;
use url::{form_urlencoded, Url};

/// Default cache-busting query parameter
pub const DEFAULT_BUST_PARAM: &str = "v";

/// A request seen by the fetch interceptor
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL, or a path relative to the base URL
    pub url: String,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }
}

/// Maps request URLs to resource keys and back
///
/// All keys are relative to `base`. The base itself, with or without a
/// fragment-routing marker (`/#/route`), maps to the reserved root key.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    base: Url,
    bust_param: String,
}

impl KeyNormalizer {
    /// Build a normalizer for `base`; a trailing slash is added if missing
    pub fn new(base: &str, bust_param: impl Into<String>) -> PrecacheResult<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            base,
            bust_param: bust_param.into(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a possibly relative request URL against the base
    pub fn resolve(&self, raw: &str) -> PrecacheResult<Url> {
        Ok(self.base.join(raw)?)
    }

    /// Normalized key for a URL, or `None` if the URL is outside the base
    ///
    /// A fragment is dropped only from the base itself, so client-side routes
    /// map to the root. On any other path it stays part of the key.
    pub fn key_for(&self, url: &Url) -> Option<ResourceKey> {
        if url.origin() != self.base.origin() {
            return None;
        }

        let base_path = self.base.path();
        if url.path() == base_path.trim_end_matches('/') {
            return Some(ResourceKey::root());
        }
        let relative = url.path().strip_prefix(base_path)?;
        if relative.is_empty() {
            return Some(ResourceKey::root());
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| name != self.bust_param.as_str())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        let mut key = relative.to_string();
        if !kept.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(kept)
                .finish();
            key = format!("{}?{}", key, query);
        }
        if let Some(fragment) = url.fragment() {
            key = format!("{}#{}", key, fragment);
        }
        Some(ResourceKey::new(key))
    }

    /// Absolute URL a key is fetched from
    pub fn url_for(&self, key: &ResourceKey) -> PrecacheResult<Url> {
        if key.is_root() {
            return Ok(self.base.clone());
        }
        Ok(self.base.join(key.as_str())?)
    }
}
