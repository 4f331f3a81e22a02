use crate::{Entry, Keys, NodeCache, NodeId, Snag, Subtree, Trek};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use std::{fs, path};

/// Anything that can fetch the raw envelope behind a URL.
///
/// Only GET semantics are required.  The navigator calls `load` from a spawned task, so the
/// future must be `Send`, and loaders are shared across tasks behind an [`std::sync::Arc`].
pub trait Loader: Send + Sync + 'static {
    fn load(&self, url: &str) -> impl Future<Output = Trek<Value>> + Send;
}

/// Appends `params` to `url` as a query string, using `&` if `url` already has a query and `?`
/// otherwise.  Values are percent-encoded.
pub fn with_query(url: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<String>>()
        .join("&");
    let glue = if url.contains('?') { '&' } else { '?' };
    format!("{url}{glue}{query}")
}

/// A single load the fetcher wants performed.
///
/// * node - The node whose children we are after, and the cache key for the result.
/// * base - The children link of the node, before any query string.
/// * url - The URL to load, with the query string attached.
/// * page - The page requested.
/// * cacheable - False while a search term is active.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new, derive_getters::Getters)]
pub struct Request {
    node: NodeId,
    base: String,
    url: String,
    page: u32,
    cacheable: bool,
}

/// What [`TreeFetcher::plan`] decided: the request that would fetch the node, and the cache
/// entry if the cache can answer instead.
#[derive(Debug, Clone, derive_getters::Getters, derive_getters::Dissolve)]
pub struct Plan {
    request: Request,
    cached: Option<Entry>,
}

/// The `TreeFetcher` resolves node ids into subtrees.
///
/// Resolution happens in two halves.  [`TreeFetcher::plan`] works out the URL for a node and
/// consults the [`NodeCache`].  If the cache cannot help, somebody loads the URL, and
/// [`TreeFetcher::settle`] parses the response and stores it.  The [`crate::Navigator`] runs the
/// load between the halves on a separate task, which keeps every touch of the cache on the
/// navigator's own task.  [`TreeFetcher::resolve`] does all three in a row for callers that do
/// not care.
///
/// While a search term is set, the fetcher neither reads nor writes the cache.  A filtered
/// column is not the column.
#[derive(Debug, derive_getters::Getters)]
pub struct TreeFetcher {
    cache: NodeCache,
    keys: Keys,
    root_url: String,
    limit: Option<u32>,
    search_key: String,
    search: Option<String>,
    latest: Option<Subtree>,
}

impl TreeFetcher {
    pub fn new(keys: Keys, root_url: &str, limit: Option<u32>, search_key: &str) -> Self {
        Self {
            cache: NodeCache::new(),
            keys,
            root_url: root_url.to_string(),
            limit,
            search_key: search_key.to_string(),
            search: None,
            latest: None,
        }
    }

    pub fn cache_mut(&mut self) -> &mut NodeCache {
        &mut self.cache
    }

    /// Releases the cache along with the fetcher.
    pub fn destroy(self) {
        self.cache.destroy();
    }

    pub fn set_root_url(&mut self, url: &str) {
        self.root_url = url.to_string();
    }

    /// Sets or clears the search term.  Empty terms count as no term.
    pub fn set_search(&mut self, term: Option<String>) {
        self.search = term.filter(|term| !term.is_empty());
    }

    /// Records the subtree now on display, whose children and parent are the places we can go
    /// next.
    pub fn remember(&mut self, subtree: &Subtree) {
        self.latest = Some(subtree.clone());
    }

    /// Finds the children link for `id`.
    ///
    /// The root goes to the children link of the last known parent when it has one, and to the
    /// root URL otherwise.  Any other node must be a child or the parent of the latest subtree.
    /// Will [`Snag::UnknownNode`] if it is neither, and [`Snag::Leaf`] if it has no link.
    pub fn target(&self, id: &NodeId) -> Trek<String> {
        let parent = self.latest.as_ref().and_then(|latest| latest.parent().as_ref());
        if id.is_root() {
            let link = parent
                .filter(|parent| parent.is_root())
                .and_then(|parent| parent.children_link().clone());
            return Ok(link.unwrap_or_else(|| self.root_url.clone()));
        }
        let node = self
            .latest
            .as_ref()
            .and_then(|latest| latest.child(id))
            .or_else(|| parent.filter(|parent| parent.id() == id))
            .ok_or_else(|| Snag::UnknownNode(id.clone()))?;
        node.children_link()
            .clone()
            .ok_or_else(|| Snag::Leaf(id.clone()))
    }

    /// Builds the request for `page` of `node`, whose children live at `base`.
    pub fn request(&self, node: &NodeId, base: &str, page: u32) -> Request {
        let mut params = Vec::new();
        if page > 1 || self.limit.is_some() {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(term) = &self.search {
            params.push((self.search_key.as_str(), term.clone()));
        }
        let url = with_query(base, &params);
        Request::new(node.clone(), base.to_string(), url, page, self.search.is_none())
    }

    /// Works out how to resolve `id`, answering from the cache when allowed.
    #[tracing::instrument(skip(self))]
    pub fn plan(&mut self, id: &NodeId) -> Trek<Plan> {
        let base = self.target(id)?;
        let request = self.request(id, &base, 1);
        let cached = if *request.cacheable() {
            self.cache.get(id)
        } else {
            tracing::debug!("Search active, skipping cache for {id}.");
            None
        };
        Ok(Plan { request, cached })
    }

    /// Parses the response to `request`, caching it when the request allows.
    #[tracing::instrument(skip_all)]
    pub fn settle(&mut self, request: &Request, raw: &Value) -> Trek<Subtree> {
        let subtree = self.keys.subtree(raw, request.page)?;
        if request.cacheable && request.page == 1 {
            self.cache.put(request.node.clone(), subtree.clone(), 1);
        }
        Ok(subtree)
    }

    /// Replaces the cached entry for `node` with `subtree`, now loaded through `page`, if there
    /// is an entry and no search is active.
    pub fn extend_cached(&mut self, node: &NodeId, subtree: &Subtree, page: u32) {
        if self.search.is_none() && self.cache.contains(node) {
            self.cache.put(node.clone(), subtree.clone(), page);
        }
    }

    /// Resolves `id` to its subtree, from the cache if possible and through `loader` if not.
    #[tracing::instrument(skip(self, loader))]
    pub async fn resolve<L: Loader>(&mut self, loader: &L, id: &NodeId) -> Trek<Subtree> {
        let (request, cached) = self.plan(id)?.dissolve();
        if let Some(entry) = cached {
            return Ok(entry.subtree().clone());
        }
        tracing::debug!("Loading {}.", request.url);
        let raw = loader.load(&request.url).await?;
        self.settle(&request, &raw)
    }
}

/// The `Fixtures` loader serves canned envelopes from memory.
///
/// Lookups try the full URL first, then the URL without its query string, so a fixture stored
/// under `/items` answers `/items?limit=20` while `/items?page=2` can still have its own entry.
/// Every requested URL is recorded, which makes the loader handy for counting fetches.  A delay
/// simulates a slow network, and URLs marked as failing produce [`Snag::Fetch`].
#[derive(Debug, Default)]
pub struct Fixtures {
    pages: HashMap<String, Value>,
    failing: Vec<String>,
    delay: Duration,
    requests: Mutex<Vec<String>>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads fixtures from a JSON file holding an object of `url -> envelope`.
    ///
    /// Will [`Snag::Io`] if the file cannot be read, [`Snag::Json`] if it is not JSON, and
    /// [`Snag::MalformedResponse`] if the top level is not an object.
    #[tracing::instrument]
    pub fn from_path(path: &path::Path) -> Trek<Self> {
        let text = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        let Value::Object(object) = value else {
            return Err(Snag::MalformedResponse(
                "fixtures must map urls to responses".to_string(),
            ));
        };
        let pages = object.into_iter().collect::<HashMap<String, Value>>();
        tracing::info!("Loaded {} fixtures.", pages.len());
        Ok(Self {
            pages,
            ..Default::default()
        })
    }

    pub fn with_page(mut self, url: &str, envelope: Value) -> Self {
        self.pages.insert(url.to_string(), envelope);
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replaces the envelope served for `url`.
    pub fn insert(&mut self, url: &str, envelope: Value) {
        self.pages.insert(url.to_string(), envelope);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// How many requests asked for `path`, ignoring query strings.
    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| strip_query(url) == path)
            .count()
    }

    fn record(&self, url: &str) {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(url.to_string()),
            Err(poisoned) => poisoned.into_inner().push(url.to_string()),
        }
    }

    fn lookup(&self, url: &str) -> Trek<Value> {
        if self.failing.iter().any(|failing| failing == strip_query(url)) {
            return Err(Snag::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.pages
            .get(url)
            .or_else(|| self.pages.get(strip_query(url)))
            .cloned()
            .ok_or_else(|| Snag::Fetch {
                url: url.to_string(),
                reason: "404 not found".to_string(),
            })
    }
}

impl Loader for Fixtures {
    async fn load(&self, url: &str) -> Trek<Value> {
        self.record(url);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.lookup(url)
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixtures() -> Fixtures {
        Fixtures::new()
            .with_page(
                "/nodes",
                json!({ "id": "root", "name": "Root", "_embedded": { "items": [
                    { "id": "1", "name": "A", "_links": { "children": { "href": "/a/children" } } },
                    { "id": "2", "name": "B" }
                ] } }),
            )
            .with_page(
                "/a/children",
                json!({ "id": "1", "name": "A", "_embedded": { "items": [
                    { "id": "11", "name": "AA" }
                ] } }),
            )
    }

    fn fetcher() -> TreeFetcher {
        TreeFetcher::new(Keys::default(), "/nodes", None, "search")
    }

    #[test]
    fn query_glue() {
        assert_eq!(with_query("/a", &[]), "/a");
        assert_eq!(
            with_query("/a", &[("page", "2".to_string()), ("limit", "10".to_string())]),
            "/a?page=2&limit=10"
        );
        assert_eq!(
            with_query("/a?sort=name", &[("search", "big cat".to_string())]),
            "/a?sort=name&search=big%20cat"
        );
    }

    #[test]
    fn requests_carry_paging_and_search() {
        let mut fetcher = TreeFetcher::new(Keys::default(), "/nodes", Some(20), "q");
        let request = fetcher.request(&NodeId::root(), "/nodes", 1);
        assert_eq!(request.url(), "/nodes?page=1&limit=20");
        assert!(*request.cacheable());
        fetcher.set_search(Some("x".to_string()));
        let request = fetcher.request(&NodeId::root(), "/nodes", 3);
        assert_eq!(request.url(), "/nodes?page=3&limit=20&q=x");
        assert!(!*request.cacheable());
        fetcher.set_search(Some(String::new()));
        assert_eq!(fetcher.search(), &None);
    }

    #[test]
    fn targets_follow_the_latest_subtree() {
        let mut fetcher = fetcher();
        assert_eq!(fetcher.target(&NodeId::root()).unwrap(), "/nodes");
        assert!(matches!(
            fetcher.target(&"1".into()),
            Err(Snag::UnknownNode(_))
        ));
        let root = Keys::default()
            .subtree(&fixtures().lookup("/nodes").unwrap(), 1)
            .unwrap();
        fetcher.remember(&root);
        assert_eq!(fetcher.target(&"1".into()).unwrap(), "/a/children");
        assert!(matches!(fetcher.target(&"2".into()), Err(Snag::Leaf(_))));
    }

    #[test]
    fn targets_fall_back_to_the_parent() {
        let mut fetcher = fetcher();
        let raw = json!({ "id": "11", "name": "AA", "_embedded": {
            "items": [ { "id": "111", "name": "AAA" } ],
            "parent": { "id": "1", "name": "A", "_links": { "children": { "href": "/a/children" } } }
        } });
        let subtree = Keys::default().subtree(&raw, 1).unwrap();
        fetcher.remember(&subtree);
        assert_eq!(fetcher.target(&"1".into()).unwrap(), "/a/children");
        assert!(matches!(fetcher.target(&"111".into()), Err(Snag::Leaf(_))));
        assert!(matches!(
            fetcher.target(&"2".into()),
            Err(Snag::UnknownNode(_))
        ));
        // the parent is not the root, so the root goes to the configured url
        assert_eq!(fetcher.target(&NodeId::root()).unwrap(), "/nodes");
    }

    #[test]
    fn later_pages_update_the_cached_page() {
        let mut fetcher = fetcher();
        let request = fetcher.request(&NodeId::root(), "/nodes", 1);
        let raw = json!({ "pages": 3, "_embedded": { "items": [ { "id": "1" } ] } });
        let mut subtree = fetcher.settle(&request, &raw).unwrap();
        let more = Keys::default()
            .subtree(&json!({ "pages": 3, "_embedded": { "items": [ { "id": "2" } ] } }), 2)
            .unwrap();
        subtree.extend(more.children(), *more.has_next_page());
        fetcher.extend_cached(&NodeId::root(), &subtree, 2);
        let (request, cached) = fetcher.plan(&NodeId::root()).unwrap().dissolve();
        assert_eq!(request.page(), &1);
        let (cached, page) = cached.unwrap().dissolve();
        assert_eq!(page, 2);
        assert_eq!(cached.child_ids(), vec![NodeId::from("1"), NodeId::from("2")]);
        assert!(*cached.has_next_page());
        // nothing cached under a search, so nothing to extend
        fetcher.set_search(Some("x".to_string()));
        fetcher.extend_cached(&"9".into(), &subtree, 2);
        assert!(!fetcher.cache().contains(&"9".into()));
    }

    #[tokio::test]
    async fn resolve_fills_the_cache_once() {
        let loader = fixtures();
        let mut fetcher = fetcher();
        let root = fetcher.resolve(&loader, &NodeId::root()).await.unwrap();
        fetcher.remember(&root);
        let first = fetcher.resolve(&loader, &"1".into()).await.unwrap();
        let second = fetcher.resolve(&loader, &"1".into()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(loader.count("/a/children"), 1);
        assert!(fetcher.cache().contains(&"1".into()));
    }

    #[tokio::test]
    async fn search_bypasses_the_cache() {
        let loader = fixtures();
        let mut fetcher = fetcher();
        fetcher.set_search(Some("a".to_string()));
        fetcher.resolve(&loader, &NodeId::root()).await.unwrap();
        fetcher.resolve(&loader, &NodeId::root()).await.unwrap();
        assert_eq!(*fetcher.cache().reads(), 0);
        assert_eq!(*fetcher.cache().writes(), 0);
        assert_eq!(loader.requests(), vec!["/nodes?search=a", "/nodes?search=a"]);
    }

    #[tokio::test]
    async fn failures_propagate() {
        let loader = fixtures().with_failure("/nodes");
        let mut fetcher = fetcher();
        let result = fetcher.resolve(&loader, &NodeId::root()).await;
        assert!(matches!(result, Err(Snag::Fetch { .. })));
        assert!(fetcher.cache().is_empty());
    }
}
