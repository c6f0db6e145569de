//! Shared connection handle for the search and completion calls.
//!
//! The remote side treats `role` / `database` / `schema` / `service` as
//! SQL-style identifiers: unquoted names are case-insensitive and stored
//! upper-case, double-quoted names are taken verbatim.
//! [`normalize_identifier`] applies that rule once, when the connection is
//! resolved.
//!
//! [`ConnectionCache`] owns a `OnceLock<Connection>`: the HTTP client and
//! the resolved identifiers are built on first use and reused for every call
//! after that. The cache is an explicit handle owned by whoever needs it —
//! deliberately not a process-wide `static`, so tests can build their own.

use std::sync::OnceLock;

use crate::config::{CompletionConfig, SearchConfig};

// ---------------------------------------------------------------------------
// Identifier normalisation
// ---------------------------------------------------------------------------

/// Uppercase unquoted identifiers; pass double-quoted ones through verbatim.
pub fn normalize_identifier(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('"') && name.ends_with('"') && name.len() >= 2 {
        name.to_string()
    } else {
        name.to_uppercase()
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Resolved connection context shared by the search and completion calls.
pub struct Connection {
    pub(crate) client: reqwest::Client,
    pub(crate) search_base: String,
    pub(crate) completion_base: String,
    pub(crate) api_key: Option<String>,
    pub(crate) role: String,
    pub(crate) database: String,
    pub(crate) schema: String,
    pub(crate) service: String,
    pub(crate) completion_model: String,
    pub(crate) chunk_limit: usize,
}

impl Connection {
    fn new(search: &SearchConfig, completion: &CompletionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(completion.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            search_base: search.base_url.clone(),
            completion_base: completion.base_url.clone(),
            api_key: search.api_key.clone(),
            role: normalize_identifier(&search.role),
            database: normalize_identifier(&search.database),
            schema: normalize_identifier(&search.schema),
            service: normalize_identifier(&search.service),
            completion_model: completion.model.clone(),
            chunk_limit: search.chunk_limit.max(1),
        }
    }

    /// One-line description of the resolved context, surfaced with every
    /// answer for diagnosis — success and failure alike.
    pub fn debug_line(&self) -> String {
        format!(
            "role={} db={} schema={} service={}",
            self.role, self.database, self.schema, self.service
        )
    }

    pub(crate) fn search_url(&self) -> String {
        format!(
            "{}/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
            self.search_base, self.database, self.schema, self.service
        )
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.completion_base)
    }

    /// Attach `Authorization: Bearer …` only when the key is a non-empty
    /// string — safe for self-hosted services that require no auth.
    pub(crate) fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.api_key.as_deref().unwrap_or("");
        if key.is_empty() {
            req
        } else {
            req.bearer_auth(key)
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionCache
// ---------------------------------------------------------------------------

/// Lazily-initialised, share-once holder for [`Connection`].
///
/// First access wins; every later call sees the same connection. Safe for
/// concurrent first access — `OnceLock` serialises initialisation.
pub struct ConnectionCache {
    search: SearchConfig,
    completion: CompletionConfig,
    cell: OnceLock<Connection>,
}

impl ConnectionCache {
    pub fn new(search: SearchConfig, completion: CompletionConfig) -> Self {
        Self {
            search,
            completion,
            cell: OnceLock::new(),
        }
    }

    /// The shared connection, built on first call.
    pub fn get(&self) -> &Connection {
        self.cell.get_or_init(|| {
            let conn = Connection::new(&self.search, &self.completion);
            log::debug!("rag: connection resolved ({})", conn.debug_line());
            conn
        })
    }

    /// Resolve the connection eagerly so the first question does not pay
    /// the setup cost. Callers treat this as best-effort.
    pub fn warmup(&self) {
        let _ = self.get();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache() -> ConnectionCache {
        let search = SearchConfig {
            base_url: "https://search.example.com".into(),
            database: "docs_db".into(),
            schema: "public".into(),
            service: "chunk_search".into(),
            ..SearchConfig::default()
        };
        let completion = CompletionConfig {
            base_url: "https://complete.example.com".into(),
            ..CompletionConfig::default()
        };
        ConnectionCache::new(search, completion)
    }

    #[test]
    fn normalize_uppercases_unquoted() {
        assert_eq!(normalize_identifier("docs_db"), "DOCS_DB");
        assert_eq!(normalize_identifier("  spaced  "), "SPACED");
        assert_eq!(normalize_identifier(""), "");
    }

    #[test]
    fn normalize_keeps_quoted_verbatim() {
        assert_eq!(normalize_identifier("\"MixedCase\""), "\"MixedCase\"");
        assert_eq!(normalize_identifier("\"lower\""), "\"lower\"");
    }

    #[test]
    fn connection_resolves_identifiers_once() {
        let cache = make_cache();
        let conn = cache.get();
        assert_eq!(conn.database, "DOCS_DB");
        assert_eq!(conn.schema, "PUBLIC");
        assert_eq!(conn.service, "CHUNK_SEARCH");
        assert_eq!(conn.role, "LAB_ROLE");
    }

    #[test]
    fn repeated_get_returns_same_connection() {
        let cache = make_cache();
        let a = cache.get() as *const Connection;
        let b = cache.get() as *const Connection;
        assert_eq!(a, b);
    }

    #[test]
    fn debug_line_lists_resolved_context() {
        let cache = make_cache();
        assert_eq!(
            cache.get().debug_line(),
            "role=LAB_ROLE db=DOCS_DB schema=PUBLIC service=CHUNK_SEARCH"
        );
    }

    #[test]
    fn search_url_shape() {
        let cache = make_cache();
        assert_eq!(
            cache.get().search_url(),
            "https://search.example.com/api/v2/databases/DOCS_DB/schemas/PUBLIC/cortex-search-services/CHUNK_SEARCH:query"
        );
    }

    #[test]
    fn completions_url_uses_completion_base() {
        let cache = make_cache();
        assert_eq!(
            cache.get().completions_url(),
            "https://complete.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn chunk_limit_floors_at_one() {
        let search = SearchConfig {
            chunk_limit: 0,
            ..SearchConfig::default()
        };
        let cache = ConnectionCache::new(search, CompletionConfig::default());
        assert_eq!(cache.get().chunk_limit, 1);
    }
}
