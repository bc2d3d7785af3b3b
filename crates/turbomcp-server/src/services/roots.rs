//! Roots service: client-advertised filesystem boundaries, `roots/list`,
//! and the reference monitor other services consult before touching the
//! filesystem on a client's behalf (spec.md §4.14).

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponsePayload};
use turbomcp_core::session::{Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::cursor::VersionedCursor;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{ListRootsResult, Root};

use crate::error::ServerResult;
use crate::pagination::DEFAULT_PAGE_SIZE;

const DEBOUNCE: Duration = Duration::from_millis(250);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A reference monitor built from one `roots/list` snapshot: answers
/// "is this path inside a root the client granted us" (spec.md §4.14
/// "RootGuard"). An empty snapshot denies everything, since an empty list
/// is indistinguishable from "the client hasn't told us yet" and the safe
/// default is to deny.
pub struct RootGuard {
    roots: Vec<PathBuf>,
}

impl RootGuard {
    pub fn new(roots: &[Root]) -> Self {
        Self {
            roots: roots.iter().filter_map(|r| parse_file_uri(&r.uri)).map(normalize).collect(),
        }
    }

    pub fn within(&self, path: &Path) -> bool {
        if self.roots.is_empty() {
            return false;
        }
        let candidate = normalize(expand_home(path.to_path_buf()));
        self.roots.iter().any(|root| candidate.starts_with(root))
    }
}

fn parse_file_uri(uri: &str) -> Option<PathBuf> {
    let path = uri.strip_prefix("file://")?;
    // file:///abs/path -> "/abs/path"; file://C:/Users -> "C:/Users" on Windows.
    let path = path.strip_prefix('/').map(|rest| format!("/{rest}")).unwrap_or_else(|| path.to_string());
    Some(expand_home(PathBuf::from(path)))
}

fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path;
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(stripped),
        None => path,
    }
}

/// Lexically collapse `.`/`..` and redundant separators without touching the
/// filesystem (no symlink resolution; roots are a policy boundary, not a
/// guarantee against a cooperating attacker with symlink access).
fn normalize(path: PathBuf) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

struct CacheEntry {
    version: u64,
    roots: Vec<Root>,
    guard: Arc<RootGuard>,
}

/// Caches each session's last-known roots snapshot and the `RootGuard`
/// built from it, refreshed on `roots/list_changed` with a 250ms debounce
/// (spec.md §4.14 "Cache & debounce").
pub struct RootsService {
    cache: Mutex<HashMap<SessionId, CacheEntry>>,
    debounce_epoch: Mutex<HashMap<SessionId, Arc<AtomicU64>>>,
    timeout: Duration,
}

impl Default for RootsService {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl RootsService {
    pub fn new(timeout: Duration) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            debounce_epoch: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn guard_for(&self, session_id: &SessionId) -> Option<Arc<RootGuard>> {
        self.cache.lock().get(session_id).map(|entry| Arc::clone(&entry.guard))
    }

    pub fn remove(&self, session_id: &SessionId) {
        self.cache.lock().remove(session_id);
        self.debounce_epoch.lock().remove(session_id);
    }

    /// Serve `roots/list` from the cache, paginating with a version-stamped
    /// cursor so a page walked across a `list_changed` refresh is detectably
    /// stale rather than silently skipping or repeating entries. On a cache
    /// miss (no snapshot fetched yet for this session) issues `roots/list`
    /// to the client first (spec.md §4.14 "on cache miss, issue `roots/list`
    /// to the client").
    pub async fn list(&self, sink: &dyn TransportSink, session: &Arc<Session>, cursor: Option<&str>) -> ServerResult<ListRootsResult> {
        if !self.cache.lock().contains_key(&session.id) {
            self.refresh(sink, session).await?;
        }

        let cache = self.cache.lock();
        let entry = cache.get(&session.id);
        let version = entry.map(|e| e.version).unwrap_or(0);
        let roots = entry.map(|e| e.roots.clone()).unwrap_or_default();

        let offset = match cursor {
            Some(raw) => {
                let decoded = VersionedCursor::decode(raw)?;
                decoded.check_version(version)?;
                decoded.offset
            }
            None => 0,
        };
        if offset > roots.len() {
            return Err(McpError::invalid_params("cursor offset past end of list"));
        }

        let end = (offset + DEFAULT_PAGE_SIZE).min(roots.len());
        let page = roots[offset..end].to_vec();
        let next_cursor = if end < roots.len() { Some(VersionedCursor::encode(version, end)) } else { None };

        Ok(ListRootsResult { roots: page, next_cursor })
    }

    /// Debounced response to `notifications/roots/list_changed`: only the
    /// call that observes no newer notification arriving during the 250ms
    /// window actually performs the refresh (spec.md §4.14 "debounce").
    pub async fn handle_list_changed(&self, sink: &dyn TransportSink, session: &Arc<Session>) -> ServerResult<()> {
        let epoch = {
            let mut epochs = self.debounce_epoch.lock();
            Arc::clone(epochs.entry(session.id.clone()).or_insert_with(|| Arc::new(AtomicU64::new(0))))
        };
        let mine = epoch.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(DEBOUNCE).await;

        if epoch.load(Ordering::SeqCst) != mine {
            return Ok(());
        }
        self.refresh(sink, session).await
    }

    /// Fetch a fresh snapshot from the peer via `roots/list` and replace the
    /// cached entry, bumping its version.
    async fn refresh(&self, sink: &dyn TransportSink, session: &Arc<Session>) -> ServerResult<()> {
        let (id, receiver) = session.begin_outbound();
        let wire = JsonRpcMessage::Request(JsonRpcRequest::new(methods::ROOTS_LIST, None, id.clone()));

        if sink.send(&session.id, wire).await.is_err() {
            session.abandon_outbound(&id);
            return Err(McpError::ServiceUnavailable("failed to deliver roots/list request".to_string()));
        }

        let outcome = tokio::time::timeout(self.timeout, receiver).await;
        let roots: Vec<Root> = match outcome {
            Ok(Ok(JsonRpcResponsePayload::Success { result })) => {
                let parsed: ListRootsResult =
                    serde_json::from_value(result).map_err(|e| McpError::Internal(format!("malformed roots/list result: {e}")))?;
                parsed.roots
            }
            Ok(Ok(JsonRpcResponsePayload::Error { error })) => {
                return Err(McpError::InvalidParamsWithData(error.message, serde_json::json!({"code": error.code})));
            }
            Ok(Err(_)) => return Err(McpError::Internal("roots response channel dropped".to_string())),
            Err(_) => {
                session.abandon_outbound(&id);
                return Err(McpError::ServiceUnavailable("roots/list request timed out".to_string()));
            }
        };

        let guard = Arc::new(RootGuard::new(&roots));
        let mut cache = self.cache.lock();
        let version = cache.get(&session.id).map(|e| e.version + 1).unwrap_or(1);
        cache.insert(session.id.clone(), CacheEntry { version, roots, guard });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_denies_everything() {
        let guard = RootGuard::new(&[]);
        assert!(!guard.within(Path::new("/home/user/project")));
    }

    #[test]
    fn allows_paths_inside_a_root() {
        let guard = RootGuard::new(&[Root { uri: "file:///home/user/project".to_string(), name: None }]);
        assert!(guard.within(Path::new("/home/user/project/src/main.rs")));
        assert!(guard.within(Path::new("/home/user/project")));
    }

    #[test]
    fn denies_paths_outside_every_root() {
        let guard = RootGuard::new(&[Root { uri: "file:///home/user/project".to_string(), name: None }]);
        assert!(!guard.within(Path::new("/home/user/other")));
        assert!(!guard.within(Path::new("/etc/passwd")));
    }

    #[test]
    fn denies_dot_dot_escape_attempts() {
        let guard = RootGuard::new(&[Root { uri: "file:///home/user/project".to_string(), name: None }]);
        assert!(!guard.within(Path::new("/home/user/project/../secrets")));
    }

    #[derive(Default)]
    struct NullSink;

    #[async_trait::async_trait]
    impl TransportSink for NullSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> turbomcp_core::transport::TransportResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn list_on_cache_miss_fetches_from_the_client() {
        let service = RootsService::new(Duration::from_millis(20));
        let session = Arc::new(Session::new(SessionId::generate()));

        // No client is actually listening on the other end of `NullSink`, so
        // the fetch this cache miss triggers times out rather than serving a
        // stale empty page.
        let err = service.list(&NullSink, &session, None).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn list_on_cache_hit_serves_without_refetching() {
        let service = RootsService::default();
        let session = Arc::new(Session::new(SessionId::generate()));
        let roots = vec![Root { uri: "file:///home/user/project".to_string(), name: None }];
        service.cache.lock().insert(
            session.id.clone(),
            CacheEntry { version: 1, roots: roots.clone(), guard: Arc::new(RootGuard::new(&roots)) },
        );

        // `NullSink` never answers, so a successful result here proves the
        // cache hit short-circuited the fetch rather than merely winning a
        // race against a timeout.
        let result = service.list(&NullSink, &session, None).await.unwrap();
        assert_eq!(result.roots.len(), 1);
        assert!(result.next_cursor.is_none());
    }
}
