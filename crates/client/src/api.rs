//! Typed wrappers for the workspace dashboard endpoints.
//!
//! Every call goes through a [`RetryingClient`], so the methods here only
//! build requests and decode responses.

use serde_json::json;

use crate::models::{LakeviewPage, LegacyPage, MigrateResponse, PublishedInfo, RawLakeviewDashboard};
use crate::retry::{RetryPolicy, RetryingClient};
use crate::transport::{ApiRequest, Transport, TransportError};

/// Page size requested from the listing endpoints.
pub const PAGE_SIZE: u32 = 100;

pub const LEGACY_DASHBOARDS_PATH: &str = "/api/2.0/preview/sql/dashboards";
pub const LAKEVIEW_DASHBOARDS_PATH: &str = "/api/2.0/lakeview/dashboards";
pub const LAKEVIEW_MIGRATE_PATH: &str = "/api/2.0/lakeview/dashboards/migrate";

/// Dashboard API of a single workspace.
pub struct WorkspaceApi<T> {
    client: RetryingClient<T>,
}

impl<T: Transport> WorkspaceApi<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            client: RetryingClient::new(transport, policy),
        }
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    /// Fetch one page of legacy dashboards.
    pub async fn list_legacy_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<LegacyPage, TransportError> {
        let request = paged(ApiRequest::get(LEGACY_DASHBOARDS_PATH), page_token);
        self.client
            .call(&request)
            .await?
            .json::<Option<LegacyPage>>()
            .map(Option::unwrap_or_default)
    }

    /// Fetch one page of Lakeview dashboards.
    pub async fn list_lakeview_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<LakeviewPage, TransportError> {
        let request = paged(ApiRequest::get(LAKEVIEW_DASHBOARDS_PATH), page_token);
        self.client
            .call(&request)
            .await?
            .json::<Option<LakeviewPage>>()
            .map(Option::unwrap_or_default)
    }

    /// Fetch the full detail of one Lakeview dashboard.
    pub async fn get_lakeview(
        &self,
        dashboard_id: &str,
    ) -> Result<RawLakeviewDashboard, TransportError> {
        let request = ApiRequest::get(format!("{LAKEVIEW_DASHBOARDS_PATH}/{dashboard_id}"));
        self.client
            .call(&request)
            .await?
            .json::<Option<RawLakeviewDashboard>>()
            .map(Option::unwrap_or_default)
    }

    /// Published state of a Lakeview dashboard; `None` when it has never
    /// been published (the endpoint answers `404`).
    pub async fn get_published(
        &self,
        dashboard_id: &str,
    ) -> Result<Option<PublishedInfo>, TransportError> {
        let request =
            ApiRequest::get(format!("{LAKEVIEW_DASHBOARDS_PATH}/{dashboard_id}/published"));
        match self.client.call(&request).await {
            Ok(response) => Ok(Some(
                response.json::<Option<PublishedInfo>>()?.unwrap_or_default(),
            )),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Convert a legacy dashboard, returning the new Lakeview id.
    pub async fn migrate(
        &self,
        legacy_id: &str,
        display_name: &str,
    ) -> Result<String, TransportError> {
        let request = ApiRequest::post(
            LAKEVIEW_MIGRATE_PATH,
            json!({
                "source_dashboard_id": legacy_id,
                "display_name": display_name,
            }),
        );
        let response: Option<MigrateResponse> = self.client.call(&request).await?.json()?;
        response
            .and_then(|r| r.lakeview_id())
            .ok_or_else(|| {
                TransportError::Decode("migrate response carried no dashboard id".into())
            })
    }

    /// Publish a Lakeview dashboard with embedded credentials.
    pub async fn publish(
        &self,
        dashboard_id: &str,
        warehouse_id: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "embed_credentials": true });
        if let Some(warehouse_id) = warehouse_id {
            body["warehouse_id"] = json!(warehouse_id);
        }
        let request = ApiRequest::post(
            format!("{LAKEVIEW_DASHBOARDS_PATH}/{dashboard_id}/published"),
            body,
        );
        self.client.call(&request).await.map(drop)
    }

    /// Move a legacy dashboard to the trash.
    pub async fn delete_legacy(&self, legacy_id: &str) -> Result<(), TransportError> {
        let request = ApiRequest::delete(format!("{LEGACY_DASHBOARDS_PATH}/{legacy_id}"));
        self.client.call(&request).await.map(drop)
    }
}

fn paged(request: ApiRequest, page_token: Option<&str>) -> ApiRequest {
    let request = request.with_query("page_size", PAGE_SIZE.to_string());
    match page_token {
        Some(token) => request.with_query("page_token", token),
        None => request,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
