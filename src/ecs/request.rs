//! Request orchestration: query assembly, caching, fetching, fault checks
//! and pagination behind one [`Request::search`] call.

use crate::config::Config;
use crate::ecs::cache::Cache;
use crate::ecs::fault::FaultRegistry;
use crate::ecs::locale::Locale;
use crate::ecs::materialize::materialize;
use crate::ecs::node::{Node, Schema};
use crate::ecs::operation::{Operation, Params, ResponseGroup};
use crate::ecs::query::assemble_query;
use crate::ecs::response::Response;
use crate::ecs::transport::{HttpTransport, Transport};
use crate::error::{EcsError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Service name sent with every call.
pub const SERVICE: &str = "AWSECommerceService";

/// API version sent with every call.
pub const API_VERSION: &str = "2008-08-19";

/// How many result pages to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCount {
    Count(u32),
    All,
}

impl Default for PageCount {
    fn default() -> Self {
        PageCount::Count(1)
    }
}

impl From<u32> for PageCount {
    fn from(n: u32) -> Self {
        PageCount::Count(n)
    }
}

impl FromStr for PageCount {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(PageCount::All);
        }
        s.parse::<u32>()
            .map(PageCount::Count)
            .map_err(|_| format!("Invalid page count: {}. Use a number or 'all'", s))
    }
}

impl fmt::Display for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCount::Count(n) => write!(f, "{}", n),
            PageCount::All => write!(f, "all"),
        }
    }
}

/// Outcome of a search: one page, or several in page order.
#[derive(Debug, Clone)]
pub enum SearchResult {
    Single(Response),
    Pages(Vec<Response>),
}

impl SearchResult {
    /// The first page, `None` only for an empty `Pages`.
    pub fn first(&self) -> Option<&Response> {
        self.pages().first()
    }

    /// All pages, in order.
    pub fn pages(&self) -> &[Response] {
        match self {
            SearchResult::Single(response) => std::slice::from_ref(response),
            SearchResult::Pages(pages) => pages,
        }
    }

    pub fn into_pages(self) -> Vec<Response> {
        match self {
            SearchResult::Single(response) => vec![response],
            SearchResult::Pages(pages) => pages,
        }
    }

    pub fn len(&self) -> usize {
        self.pages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages().is_empty()
    }
}

/// A session with the service: credentials, locale, cache and connection.
pub struct Request {
    key_id: String,
    tag: String,
    locale: Locale,
    user_agent: String,
    cache: Option<Cache>,
    transport: Box<dyn Transport>,
    schema: Schema,
    faults: FaultRegistry,
}

impl Request {
    /// Creates a request over HTTP from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.proxy.clone());
        Self::with_transport(config, Box::new(transport))
    }

    /// Creates a request over a custom transport.
    ///
    /// Fails when no key id is configured or the cache directory is unusable.
    pub fn with_transport(config: &Config, transport: Box<dyn Transport>) -> Result<Self> {
        let key_id = config.key_id.clone().filter(|k| !k.is_empty()).ok_or(EcsError::MissingKeyId)?;
        let locale = config.locale;
        let tag = config
            .associate
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| locale.default_associate().to_string());

        let cache = if config.cache {
            let dir = config.cache_dir.clone().unwrap_or_else(Cache::default_dir);
            Some(Cache::new(dir)?)
        } else {
            None
        };

        Ok(Self {
            key_id,
            tag,
            locale,
            user_agent: config.user_agent.clone(),
            cache,
            transport,
            schema: Schema::new(),
            faults: FaultRegistry::new(),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Associate tag sent as `AssociateTag`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Switches locale.
    ///
    /// A tag that is the old locale's default becomes the new locale's
    /// default; any other tag is kept. The connection is dropped when the
    /// new locale is served by a different endpoint.
    pub fn set_locale(&mut self, locale: Locale) {
        let old = self.locale;
        if self.tag == old.default_associate() {
            self.tag = locale.default_associate().to_string();
        }
        if old.endpoint() != locale.endpoint() {
            self.transport.disconnect();
        }
        self.locale = locale;
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) {
        self.user_agent = user_agent.into();
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    /// Replaces the response cache; `None` disables caching.
    pub fn set_cache(&mut self, cache: Option<Cache>) {
        self.cache = cache;
    }

    /// Node kinds seen by this request so far.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Fault kinds seen by this request so far.
    pub fn faults(&self) -> &FaultRegistry {
        &self.faults
    }

    /// Runs `operation` and returns up to `pages` pages of results.
    ///
    /// Never fetches more pages than the service reports or than the
    /// operation kind allows. A combined operation only returns its first
    /// page.
    pub async fn search(
        &mut self,
        operation: &Operation,
        response_group: &ResponseGroup,
        pages: PageCount,
    ) -> Result<SearchResult> {
        let label = operation.label();
        info!("{} ({} page(s) requested)", label, pages);

        let mut params = self.query_params(operation, response_group);
        let document = self.load(&assemble_query(&params)).await?;
        self.faults.check_document(&document, operation.is_multiple())?;

        let first = Response::new(label.clone(), document);
        let total = first.total_pages();
        let requested = match pages {
            PageCount::Count(n) => n,
            PageCount::All => u32::MAX,
        };

        if operation.is_multiple() || requested <= 1 || total <= 1 {
            return Ok(SearchResult::Single(first));
        }

        let pagination = operation.kind().pagination();
        let last = requested.min(total).min(pagination.max_page);
        debug!("Fetching pages 2..={} of {} via {}", last, total, pagination.parameter);

        let mut results = vec![first];
        for page in 2..=last {
            params.insert(pagination.parameter.to_string(), page.to_string());
            let document = self.load(&assemble_query(&params)).await?;
            self.faults.check_page(&document)?;
            results.push(Response::new(label.clone(), document));
        }

        Ok(match results.len() {
            1 => SearchResult::Single(results.remove(0)),
            _ => SearchResult::Pages(results),
        })
    }

    /// Every wire parameter of one call.
    fn query_params(&self, operation: &Operation, response_group: &ResponseGroup) -> Params {
        let mut params = Params::new();
        params.insert("Service".to_string(), SERVICE.to_string());
        params.insert("Version".to_string(), API_VERSION.to_string());
        params.insert("AWSAccessKeyId".to_string(), self.key_id.clone());
        params.insert("AssociateTag".to_string(), self.tag.clone());
        params.extend(operation.params());
        let (key, value) = response_group.param();
        params.insert(key.to_string(), value);
        params
    }

    /// Fetches and materializes one page, from the cache when possible.
    async fn load(&mut self, query: &str) -> Result<Node> {
        let endpoint = self.locale.endpoint();
        let cache_url = format!("{}{}{}", endpoint.host, endpoint.path, query);

        if let Some(cache) = &self.cache {
            if cache.is_cached(&cache_url) {
                if let Some(bytes) = cache.fetch(&cache_url) {
                    match materialize(&bytes, &mut self.schema) {
                        Ok(document) => return Ok(document),
                        Err(e) => warn!("Ignoring unparsable cache entry for {}: {}", cache_url, e),
                    }
                }
            }
        }

        debug!("Fetching http://{}", cache_url);
        let bytes = self.transport.fetch(&endpoint, query, &self.user_agent).await?;
        let document = materialize(&bytes, &mut self.schema)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&cache_url, &bytes) {
                warn!("Failed to cache {}: {}", cache_url, e);
            }
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::locale::Endpoint;
    use crate::ecs::operation::{params, OperationKind};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Log {
        queries: Vec<String>,
        hosts: Vec<String>,
        disconnects: usize,
    }

    /// Serves an `ItemSearchResponse` echoing the requested page.
    struct PagedTransport {
        total_pages: u32,
        log: Arc<Mutex<Log>>,
    }

    fn page_of(query: &str) -> u32 {
        url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(k, _)| k.ends_with("Page"))
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1)
    }

    #[async_trait]
    impl Transport for PagedTransport {
        async fn fetch(&mut self, endpoint: &Endpoint, query: &str, _: &str) -> Result<Vec<u8>> {
            let mut log = self.log.lock().unwrap();
            log.queries.push(query.to_string());
            log.hosts.push(endpoint.host.to_string());
            let xml = format!(
                "<ItemSearchResponse><OperationRequest/><Items><Request><IsValid>True</IsValid></Request>\
                 <TotalPages>{}</TotalPages><Item><ASIN>page{}</ASIN></Item></Items></ItemSearchResponse>",
                self.total_pages,
                page_of(query)
            );
            Ok(xml.into_bytes())
        }

        fn disconnect(&mut self) {
            self.log.lock().unwrap().disconnects += 1;
        }
    }

    fn config() -> Config {
        Config { key_id: Some("KEYID".to_string()), cache: false, ..Config::default() }
    }

    fn request(config: &Config, total_pages: u32) -> (Request, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let transport = PagedTransport { total_pages, log: Arc::clone(&log) };
        (Request::with_transport(config, Box::new(transport)).unwrap(), log)
    }

    fn search_op() -> Operation {
        Operation::item_search("Books", params([("Title", "Ruby")])).unwrap()
    }

    #[test]
    fn test_missing_key_id() {
        let config = Config::default();
        let transport = PagedTransport { total_pages: 1, log: Arc::default() };
        let result = Request::with_transport(&config, Box::new(transport));
        assert!(matches!(result, Err(EcsError::MissingKeyId)));
    }

    #[test]
    fn test_page_count_parsing() {
        assert_eq!("all".parse::<PageCount>().unwrap(), PageCount::All);
        assert_eq!("ALL".parse::<PageCount>().unwrap(), PageCount::All);
        assert_eq!("7".parse::<PageCount>().unwrap(), PageCount::Count(7));
        assert!("-1".parse::<PageCount>().is_err());
        assert_eq!(PageCount::default(), PageCount::Count(1));
    }

    #[test]
    fn test_empty_pages_have_no_first() {
        let empty = SearchResult::Pages(Vec::new());
        assert!(empty.first().is_none());
        assert!(empty.is_empty());

        let single = SearchResult::Single(Response::new("Help", Node::new("")));
        assert_eq!(single.first().unwrap().operation(), "Help");
        assert_eq!(single.len(), 1);
    }

    #[tokio::test]
    async fn test_query_carries_service_parameters() {
        let (mut request, log) = request(&config(), 1);
        request.search(&search_op(), &ResponseGroup::default(), PageCount::Count(1)).await.unwrap();

        let log = log.lock().unwrap();
        let query = &log.queries[0];
        assert!(query.starts_with("?AWSAccessKeyId=KEYID&AssociateTag=calibanorg-20&"));
        assert!(query.contains("Operation=ItemSearch"));
        assert!(query.contains("ResponseGroup=Small"));
        assert!(query.contains("SearchIndex=Books"));
        assert!(query.contains("Service=AWSECommerceService"));
        assert!(query.contains("Version=2008-08-19"));
        assert_eq!(log.hosts[0], "ecs.amazonaws.com");
    }

    #[tokio::test]
    async fn test_single_page() {
        let (mut request, log) = request(&config(), 5);
        let result =
            request.search(&search_op(), &ResponseGroup::default(), PageCount::Count(1)).await.unwrap();

        assert!(matches!(result, SearchResult::Single(_)));
        assert_eq!(log.lock().unwrap().queries.len(), 1);
    }

    #[tokio::test]
    async fn test_requested_pages_limited_by_total() {
        let (mut request, log) = request(&config(), 3);
        let result =
            request.search(&search_op(), &ResponseGroup::default(), PageCount::Count(10)).await.unwrap();

        let pages = result.pages();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].kernel().unwrap().get("asin").unwrap().eq_text("page1"));
        assert!(pages[2].kernel().unwrap().get("asin").unwrap().eq_text("page3"));

        let log = log.lock().unwrap();
        assert!(log.queries[1].contains("ItemPage=2"));
        assert!(log.queries[2].contains("ItemPage=3"));
    }

    #[tokio::test]
    async fn test_all_pages_capped_by_kind() {
        let (mut request, log) = request(&config(), 50);
        let op = Operation::new(OperationKind::ListSearch, params([("ListType", "WishList")]));
        let result = request.search(&op, &ResponseGroup::default(), PageCount::All).await.unwrap();

        assert_eq!(result.len(), 20);
        assert!(log.lock().unwrap().queries[19].contains("ListPage=20"));
    }

    #[tokio::test]
    async fn test_multiple_operation_returns_first_page_only() {
        let (mut request, log) = request(&config(), 5);
        let lookup = Operation::item_lookup("ASIN", params([("ItemId", "B000")]), Vec::new());
        let op = Operation::combine(&search_op(), &lookup);

        let result = request.search(&op, &ResponseGroup::default(), PageCount::All).await.unwrap();
        assert!(matches!(result, SearchResult::Single(_)));
        assert_eq!(result.first().unwrap().operation(), "ItemSearch,ItemLookup");
        assert_eq!(log.lock().unwrap().queries.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_requests() {
        let dir = TempDir::new().unwrap();
        let config = Config { cache: true, cache_dir: Some(dir.path().to_path_buf()), ..config() };
        let (mut request, log) = request(&config, 1);

        for _ in 0..2 {
            request.search(&search_op(), &ResponseGroup::default(), PageCount::Count(1)).await.unwrap();
        }
        assert_eq!(log.lock().unwrap().queries.len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_cache_entry_refetched() {
        let dir = TempDir::new().unwrap();
        let config = Config { cache: true, cache_dir: Some(dir.path().to_path_buf()), ..config() };
        let (mut request, log) = request(&config, 1);

        request.search(&search_op(), &ResponseGroup::default(), PageCount::Count(1)).await.unwrap();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            std::fs::write(entry.unwrap().path(), b"<broken").unwrap();
        }

        let result =
            request.search(&search_op(), &ResponseGroup::default(), PageCount::Count(1)).await.unwrap();
        assert!(result.first().unwrap().kernel().is_ok());
        assert_eq!(log.lock().unwrap().queries.len(), 2);
    }

    #[test]
    fn test_set_locale_swaps_default_tag() {
        let (mut request, log) = request(&config(), 1);
        assert_eq!(request.tag(), "calibanorg-20");

        request.set_locale(Locale::Uk);
        assert_eq!(request.tag(), "caliban-21");
        assert_eq!(request.locale(), Locale::Uk);
        assert_eq!(log.lock().unwrap().disconnects, 1);
    }

    #[test]
    fn test_set_locale_keeps_custom_tag() {
        let config = Config { associate: Some("mytag-20".to_string()), ..config() };
        let (mut request, _) = request(&config, 1);

        request.set_locale(Locale::De);
        assert_eq!(request.tag(), "mytag-20");
    }

    #[test]
    fn test_set_same_locale_keeps_connection() {
        let (mut request, log) = request(&config(), 1);
        request.set_locale(Locale::Us);
        assert_eq!(log.lock().unwrap().disconnects, 0);
    }
}
