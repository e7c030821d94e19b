//! Content loading: local cache first, Google Sheets second.
//!
//! [`ContentLoader::load`] never fails. Every failure (transport, HTTP status,
//! malformed body, wrong table shape) is logged and degrades to an empty
//! [`ContentMap`], so the page keeps its built-in text. The discriminated
//! result is still available through [`ContentLoader::try_load_at`].

mod table;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use sheetbind_shared::{
    CacheEntry, CacheSettings, ContentMap, Result, SheetSource, SheetbindError, TabularResponse,
};
use sheetbind_storage::KvStore;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub use table::{FIELD_ID_COLUMN, TEXT_COLUMN, parse_table};

/// User-Agent string for sheet requests.
const USER_AGENT: &str = concat!("sheetbind/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Where a successfully loaded map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Cache,
    Remote,
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => f.write_str("cache"),
            Self::Remote => f.write_str("sheet"),
        }
    }
}

/// A successful load.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub content: ContentMap,
    pub source: ContentSource,
}

/// State of the cache slot at a given instant.
#[derive(Debug)]
pub enum CacheLookup {
    /// Written less than one TTL ago.
    Fresh(ContentMap),
    /// Present but expired; discarded, never used as a fallback.
    Stale { age: Duration },
    /// Nothing written yet.
    Missing,
    /// Store failed or the stored strings don't decode. Treated as a miss.
    Unreadable(SheetbindError),
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Resolves the content map for one page render.
pub struct ContentLoader<S> {
    client: Client,
    source: SheetSource,
    cache: CacheSettings,
    store: S,
}

impl<S: KvStore> ContentLoader<S> {
    /// Build a loader around an injected store.
    pub fn new(source: SheetSource, cache: CacheSettings, store: S) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            source,
            cache,
            store,
        })
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load content as of now. Never fails; errors yield an empty map.
    pub async fn load(&self) -> ContentMap {
        let (content, _) = self.load_at(Utc::now()).await;
        content
    }

    /// Load content as of `now`. Never fails: any error is logged and yields
    /// an empty map with no source.
    pub async fn load_at(&self, now: DateTime<Utc>) -> (ContentMap, Option<ContentSource>) {
        match self.try_load_at(now).await {
            Ok(loaded) => (loaded.content, Some(loaded.source)),
            Err(e) => {
                error!(error = %e, "content load failed, page keeps default text");
                (ContentMap::new(), None)
            }
        }
    }

    /// Load content as of `now`, keeping the failure cause.
    #[instrument(skip_all, fields(sheet = %self.source.sheet_name))]
    pub async fn try_load_at(&self, now: DateTime<Utc>) -> Result<Loaded> {
        match self.read_cache(now).await {
            CacheLookup::Fresh(content) => {
                info!(fields = content.len(), "content loaded from cache");
                return Ok(Loaded {
                    content,
                    source: ContentSource::Cache,
                });
            }
            CacheLookup::Stale { age } => {
                debug!(age_secs = age.num_seconds(), "cache expired");
            }
            CacheLookup::Missing => debug!("cache empty"),
            CacheLookup::Unreadable(e) => warn!(error = %e, "cache unreadable, ignoring it"),
        }

        let content = self.fetch_remote().await?;

        // The fetch succeeded; a failed write only costs the next call a request
        if let Err(e) = self.write_cache(&content, now).await {
            warn!(error = %e, "failed to persist content cache");
        }

        info!(fields = content.len(), "content loaded from sheet");
        Ok(Loaded {
            content,
            source: ContentSource::Remote,
        })
    }

    /// Read the cache entry, if both of its parts are present.
    pub async fn cache_entry(&self) -> Result<Option<CacheEntry>> {
        let content = self.store.get(&self.cache.content_key).await?;
        let written_at = self.store.get(&self.cache.time_key).await?;

        match (content, written_at) {
            (Some(content), Some(written_at)) if !content.is_empty() && !written_at.is_empty() => {
                CacheEntry::decode(&content, &written_at).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Classify the cache slot at `now`.
    pub async fn read_cache(&self, now: DateTime<Utc>) -> CacheLookup {
        match self.cache_entry().await {
            Ok(Some(entry)) if entry.is_fresh(now, self.cache.ttl) => {
                CacheLookup::Fresh(entry.content)
            }
            Ok(Some(entry)) => CacheLookup::Stale {
                age: entry.age(now),
            },
            Ok(None) => CacheLookup::Missing,
            Err(e) => CacheLookup::Unreadable(e),
        }
    }

    /// Overwrite the cache slot with `content`, stamped `now`.
    pub async fn write_cache(&self, content: &ContentMap, now: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry::new(content.clone(), now);
        let content_json = entry.content_json()?;
        let written_at = entry.written_at_millis();

        self.store
            .set_all(&[
                (self.cache.content_key.as_str(), content_json.as_str()),
                (self.cache.time_key.as_str(), written_at.as_str()),
            ])
            .await
    }

    /// Fetch and transform the sheet. One request, no retry.
    #[instrument(skip_all)]
    pub async fn fetch_remote(&self) -> Result<ContentMap> {
        let url = self.sheet_url()?;

        // reqwest errors embed the URL, which carries the API key
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SheetbindError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetbindError::Network(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| {
            SheetbindError::Network(format!("failed to read body: {}", e.without_url()))
        })?;

        let parsed: TabularResponse = serde_json::from_str(&body)
            .map_err(|e| SheetbindError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let rows = parsed.values.ok_or_else(|| {
            SheetbindError::MalformedResponse("response has no `values` field".into())
        })?;

        debug!(rows = rows.len(), "sheet rows received");
        parse_table(&rows)
    }

    /// `{api_base}/spreadsheets/{sheet_id}/values/{sheet_name}?key={api_key}`
    pub fn sheet_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.source.api_base).map_err(|e| {
            SheetbindError::config(format!("invalid api_base '{}': {e}", self.source.api_base))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                SheetbindError::config(format!(
                    "api_base '{}' cannot be a base URL",
                    self.source.api_base
                ))
            })?
            .pop_if_empty()
            .extend([
                "spreadsheets",
                self.source.sheet_id.as_str(),
                "values",
                self.source.sheet_name.as_str(),
            ]);

        match &self.source.api_key {
            Some(key) => {
                url.query_pairs_mut().append_pair("key", key);
            }
            None => warn!("no API key configured, the sheet request will likely be rejected"),
        }

        Ok(url)
    }
}

/// Build a reqwest client. No explicit timeout: the transport default applies.
fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SheetbindError::Network(format!("failed to build HTTP client: {e}")))
}
