//! Paginated, normalized listings of a workspace's dashboards.
//!
//! Both listings are lazy streams: each page is fetched only when the
//! consumer drains the previous one, and every raw entry is converted into a
//! [`DashboardRecord`] before it is yielded.

use std::collections::HashSet;
use std::future::{self, Future};

use dashmig_core::types::{parse_timestamp, DashboardKind, DashboardRecord};
use futures::stream::{self, Stream, TryStreamExt};

use crate::api::WorkspaceApi;
use crate::models::{PublishedInfo, RawLakeviewDashboard, RawLegacyDashboard};
use crate::transport::{Transport, TransportError};

/// A listing could not be retrieved.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to list {collection} dashboards: {source}")]
    Listing {
        collection: &'static str,
        #[source]
        source: TransportError,
    },
}

enum PageState {
    Start,
    Next(String),
    Done,
}

/// Dashboards of one tenant, read through that tenant's API client.
pub struct Catalog<T> {
    api: WorkspaceApi<T>,
    tenant: String,
}

impl<T: Transport> Catalog<T> {
    pub fn new(api: WorkspaceApi<T>, tenant: impl Into<String>) -> Self {
        Self {
            api,
            tenant: tenant.into(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The underlying client, for the effectful migration calls.
    pub fn api(&self) -> &WorkspaceApi<T> {
        &self.api
    }

    /// Legacy dashboards, in listing order.
    pub fn list_legacy(
        &self,
    ) -> impl Stream<Item = Result<DashboardRecord, CatalogError>> + '_ {
        let api = &self.api;
        let tenant = self.tenant.as_str();
        paginate("legacy", move |token: Option<String>| async move {
            api.list_legacy_page(token.as_deref())
                .await
                .map(|page| (page.results, page.next_page_token))
        })
        .try_filter_map(move |raw| future::ready(Ok(legacy_record(tenant, raw))))
    }

    /// Lakeview dashboards, each enriched with its detail and published state.
    pub fn list_lakeview(
        &self,
    ) -> impl Stream<Item = Result<DashboardRecord, CatalogError>> + '_ {
        let api = &self.api;
        paginate("lakeview", move |token: Option<String>| async move {
            api.list_lakeview_page(token.as_deref())
                .await
                .map(|page| {
                    let next = page.next_page_token.clone();
                    (page.into_entries(), next)
                })
        })
        .try_filter_map(move |raw| async move { Ok::<_, CatalogError>(self.enrich(raw).await) })
    }

    pub async fn collect_legacy(&self) -> Result<Vec<DashboardRecord>, CatalogError> {
        self.list_legacy().try_collect().await
    }

    pub async fn collect_lakeview(&self) -> Result<Vec<DashboardRecord>, CatalogError> {
        self.list_lakeview().try_collect().await
    }

    async fn enrich(&self, raw: RawLakeviewDashboard) -> Option<DashboardRecord> {
        let Some(id) = raw.id() else {
            tracing::warn!(tenant = %self.tenant, "Skipping Lakeview dashboard without an id");
            return None;
        };

        let raw = match self.api.get_lakeview(&id).await {
            Ok(detail) => raw.merge_detail(detail),
            Err(e) => {
                tracing::warn!(
                    tenant = %self.tenant,
                    lakeview_id = %id,
                    error = %e,
                    "Failed to fetch dashboard detail",
                );
                raw
            }
        };

        let published = match self.api.get_published(&id).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(
                    tenant = %self.tenant,
                    lakeview_id = %id,
                    error = %e,
                    "Failed to fetch published status",
                );
                None
            }
        };

        Some(lakeview_record(&self.tenant, id, &raw, published.as_ref()))
    }
}

/// Drain a `page_token` / `next_page_token` paginated listing.
///
/// Stops on an absent or empty token, or when the server hands back any
/// token it already gave out.
fn paginate<'a, I, F, Fut>(
    collection: &'static str,
    fetch: F,
) -> impl Stream<Item = Result<I, CatalogError>> + 'a
where
    I: 'a,
    F: Fn(Option<String>) -> Fut + 'a,
    Fut: Future<Output = Result<(Vec<I>, Option<String>), TransportError>> + 'a,
{
    let start = (PageState::Start, HashSet::<String>::new(), fetch);
    stream::try_unfold(start, move |(state, mut seen, fetch)| async move {
        let token = match state {
            PageState::Start => None,
            PageState::Next(token) => Some(token),
            PageState::Done => return Ok(None),
        };

        let (items, next) = fetch(token)
            .await
            .map_err(|source| CatalogError::Listing { collection, source })?;
        tracing::debug!(collection, count = items.len(), "Fetched listing page");

        let state = match next.filter(|next| !next.is_empty()) {
            Some(next) if seen.insert(next.clone()) => PageState::Next(next),
            Some(next) => {
                tracing::warn!(
                    collection,
                    token = %next,
                    "Page token repeated, stopping listing",
                );
                PageState::Done
            }
            None => PageState::Done,
        };
        Ok::<_, CatalogError>(Some((items, (state, seen, fetch))))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<I, CatalogError>)))
    .try_flatten()
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn legacy_record(tenant: &str, raw: RawLegacyDashboard) -> Option<DashboardRecord> {
    let Some(id) = raw.id() else {
        tracing::warn!(tenant, "Skipping legacy dashboard without an id");
        return None;
    };
    Some(DashboardRecord {
        tenant: tenant.to_string(),
        legacy_id: id,
        legacy_name: raw.name().to_string(),
        legacy_path: raw.path().to_string(),
        legacy_created_at: parse_timestamp(raw.created_at()),
        kind: DashboardKind::Legacy,
        name: raw.name().to_string(),
        path: raw.path().to_string(),
        created_at: raw.created_at().to_string(),
        updated_at: raw.updated_at().to_string(),
        owner: raw.owner(),
        description: raw.description().to_string(),
        ..Default::default()
    })
}

fn lakeview_record(
    tenant: &str,
    id: String,
    raw: &RawLakeviewDashboard,
    published: Option<&PublishedInfo>,
) -> DashboardRecord {
    DashboardRecord {
        tenant: tenant.to_string(),
        lakeview_id: id,
        // Lakeview-native dashboards need no migration.
        migrated: true,
        published: published.is_some() || raw.published == Some(true),
        published_at: published.and_then(|info| parse_timestamp(info.published_at())),
        kind: DashboardKind::Lakeview,
        name: raw.name().to_string(),
        path: raw.folder(),
        created_at: raw.created_at().to_string(),
        updated_at: raw.updated_at().to_string(),
        owner: raw.owner(),
        description: raw.description().to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::retry::RetryPolicy;
    use crate::transport::{ApiRequest, ApiResponse};

    /// Routes `(path, page_token)` to canned responses; anything else is 404.
    #[derive(Default)]
    struct Routes {
        responses: HashMap<(String, Option<String>), ApiResponse>,
        calls: Mutex<Vec<String>>,
    }

    impl Routes {
        fn on(mut self, path: &str, token: Option<&str>, status: u16, body: &str) -> Self {
            self.responses.insert(
                (path.to_string(), token.map(str::to_string)),
                ApiResponse::new(status, body),
            );
            self
        }

        fn api(self) -> WorkspaceApi<Self> {
            WorkspaceApi::new(self, RetryPolicy::immediate(0))
        }
    }

    impl Transport for Routes {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
            self.calls.lock().unwrap().push(request.path.clone());
            let key = (
                request.path.clone(),
                request.query_param("page_token").map(str::to_string),
            );
            Ok(self
                .responses
                .get(&key)
                .cloned()
                .unwrap_or_else(|| ApiResponse::new(404, "")))
        }
    }

    const LEGACY: &str = "/api/2.0/preview/sql/dashboards";
    const LAKEVIEW: &str = "/api/2.0/lakeview/dashboards";

    #[tokio::test]
    async fn legacy_listing_follows_page_tokens() {
        let api = Routes::default()
            .on(
                LEGACY,
                None,
                200,
                r#"{"results":[{"id":"1","name":"A","path":"/Users/a"}],"next_page_token":"p2"}"#,
            )
            .on(
                LEGACY,
                Some("p2"),
                200,
                r#"{"results":[{"id":"2","name":"B","user":{"user_name":"bob"}}]}"#,
            )
            .api();
        let catalog = Catalog::new(api, "prod");

        let records = catalog.collect_legacy().await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.legacy_id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(records[0].tenant, "prod");
        assert_eq!(records[0].legacy_path, "/Users/a");
        assert_eq!(records[1].owner, "bob");
        assert_eq!(records[1].kind, DashboardKind::Legacy);
    }

    #[tokio::test]
    async fn repeated_page_token_stops_pagination() {
        let api = Routes::default()
            .on(LEGACY, None, 200, r#"{"results":[{"id":"1"}],"next_page_token":"p2"}"#)
            .on(LEGACY, Some("p2"), 200, r#"{"results":[{"id":"2"}],"next_page_token":"p2"}"#)
            .api();
        let catalog = Catalog::new(api, "t");
        let records = catalog.collect_legacy().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(catalog.api().transport().calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn page_token_cycle_stops_pagination() {
        let api = Routes::default()
            .on(LEGACY, None, 200, r#"{"results":[{"id":"1"}],"next_page_token":"a"}"#)
            .on(LEGACY, Some("a"), 200, r#"{"results":[{"id":"2"}],"next_page_token":"b"}"#)
            .on(LEGACY, Some("b"), 200, r#"{"results":[{"id":"3"}],"next_page_token":"a"}"#)
            .api();
        let catalog = Catalog::new(api, "t");
        let records = catalog.collect_legacy().await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.legacy_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(catalog.api().transport().calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn entries_without_id_are_dropped() {
        let api = Routes::default()
            .on(LEGACY, None, 200, r#"{"results":[{"name":"orphan"},{"id":"7"}]}"#)
            .api();
        let records = Catalog::new(api, "t").collect_legacy().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].legacy_id, "7");
    }

    #[tokio::test]
    async fn failed_page_is_catalog_error() {
        let api = Routes::default()
            .on(LEGACY, None, 200, r#"{"results":[{"id":"1"}],"next_page_token":"p2"}"#)
            .on(LEGACY, Some("p2"), 500, "boom")
            .api();
        let result = Catalog::new(api, "t").collect_legacy().await;
        assert_matches!(
            result,
            Err(CatalogError::Listing {
                collection: "legacy",
                source: TransportError::Status { status: 500, .. }
            })
        );
    }

    #[tokio::test]
    async fn lakeview_entries_are_enriched() {
        let api = Routes::default()
            .on(
                LAKEVIEW,
                None,
                200,
                r#"{"dashboards":[{"dashboard_id":"lv1","display_name":"Ops"},{"dashboard_id":"lv2"}]}"#,
            )
            .on(
                "/api/2.0/lakeview/dashboards/lv1",
                None,
                200,
                r#"{"path":"/Shared/Ops.lvdash.json","creator":{"user_name":"carol"}}"#,
            )
            .on(
                "/api/2.0/lakeview/dashboards/lv1/published",
                None,
                200,
                r#"{"revision_create_time":"2024-05-01T10:00:00Z"}"#,
            )
            .api();

        let records = Catalog::new(api, "t").collect_lakeview().await.unwrap();
        assert_eq!(records.len(), 2);

        let ops = &records[0];
        assert_eq!(ops.kind, DashboardKind::Lakeview);
        assert_eq!(ops.legacy_id, "");
        assert_eq!(ops.name, "Ops");
        assert_eq!(ops.path, "/Shared");
        assert_eq!(ops.owner, "carol");
        assert!(ops.migrated);
        assert!(ops.published);
        assert!(ops.published_at.is_some());

        // detail and published lookups for lv2 are 404: tolerated
        let bare = &records[1];
        assert_eq!(bare.lakeview_id, "lv2");
        assert!(!bare.published);
    }
}
