//! In-memory workspace used by the pipeline integration tests.
//!
//! Behaves like the remote dashboard API closely enough to drive full batch
//! runs: listings paginate, migration creates a Lakeview dashboard with a
//! deterministic id, deleted legacy dashboards disappear from the listing.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmig_client::{ApiRequest, ApiResponse, Connector, Method, Transport, TransportError};
use dashmig_pipeline::Ledger;
use serde_json::json;

const LEGACY: &str = "/api/2.0/preview/sql/dashboards";
const LAKEVIEW: &str = "/api/2.0/lakeview/dashboards";
const PAGE: usize = 2;

#[derive(Default)]
struct State {
    legacy: BTreeMap<String, (String, String, String)>,
    deleted: BTreeSet<String>,
    lakeview: BTreeMap<String, (String, String)>,
    published: BTreeSet<String>,
    calls: HashMap<(&'static str, String), usize>,
}

/// One fake workspace. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct FakeWorkspace {
    state: Arc<Mutex<State>>,
    pub fail_listing: Arc<Mutex<bool>>,
    pub migrate_status: Arc<Mutex<Option<u16>>>,
    pub publish_status: Arc<Mutex<Option<u16>>>,
    /// Ledger file read back at the moment each publish call arrives.
    snapshot_path: Arc<Mutex<Option<PathBuf>>>,
    snapshots: Arc<Mutex<Vec<Ledger>>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy(self, id: &str, name: &str, path: &str, owner: &str) -> Self {
        self.state.lock().unwrap().legacy.insert(
            id.to_string(),
            (name.to_string(), path.to_string(), owner.to_string()),
        );
        self
    }

    pub fn with_lakeview(self, id: &str, name: &str, folder: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .lakeview
            .insert(id.to_string(), (name.to_string(), folder.to_string()));
        self
    }

    pub fn failing_listing(self) -> Self {
        *self.fail_listing.lock().unwrap() = true;
        self
    }

    pub fn set_migrate_status(&self, status: Option<u16>) {
        *self.migrate_status.lock().unwrap() = status;
    }

    pub fn set_publish_status(&self, status: Option<u16>) {
        *self.publish_status.lock().unwrap() = status;
    }

    /// Load the ledger at `path` whenever a publish call arrives.
    pub fn snapshot_ledger_on_publish(&self, path: &Path) {
        *self.snapshot_path.lock().unwrap() = Some(path.to_path_buf());
    }

    pub fn publish_snapshots(&self) -> Vec<Ledger> {
        std::mem::take(&mut *self.snapshots.lock().unwrap())
    }

    /// Number of attempts of `kind` ("migrate", "publish", "delete") for `id`.
    pub fn calls(&self, kind: &'static str, id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&(kind, id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Attempts of `kind` across all ids.
    pub fn total_calls(&self, kind: &'static str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, n)| n)
            .sum()
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        let path = request.path.as_str();
        let offset: usize = request
            .query_param("page_token")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);

        match request.method {
            Method::Get if path == LEGACY => {
                if *self.fail_listing.lock().unwrap() {
                    return ApiResponse::new(500, r#"{"message":"listing unavailable"}"#);
                }
                let live: Vec<_> = state
                    .legacy
                    .iter()
                    .filter(|(id, _)| !state.deleted.contains(*id))
                    .map(|(id, (name, path, owner))| {
                        json!({"id": id, "name": name, "path": path, "user": {"user_name": owner}})
                    })
                    .collect();
                page_body("results", live, offset)
            }
            Method::Get if path == LAKEVIEW => {
                let all: Vec<_> = state
                    .lakeview
                    .iter()
                    .map(|(id, (name, _))| json!({"dashboard_id": id, "display_name": name}))
                    .collect();
                page_body("dashboards", all, offset)
            }
            Method::Get => {
                let rest = path.trim_start_matches(LAKEVIEW).trim_start_matches('/');
                if let Some(id) = rest.strip_suffix("/published") {
                    return if state.published.contains(id) {
                        ApiResponse::new(200, r#"{"revision_create_time":"2024-06-01T12:00:00Z"}"#)
                    } else {
                        ApiResponse::new(404, r#"{"message":"not published"}"#)
                    };
                }
                match state.lakeview.get(rest) {
                    Some((name, folder)) => ApiResponse::new(
                        200,
                        json!({"dashboard_id": rest, "display_name": name, "parent_path": folder})
                            .to_string(),
                    ),
                    None => ApiResponse::new(404, ""),
                }
            }
            Method::Post if path.ends_with("/migrate") => {
                let body = request.body.clone().unwrap_or_default();
                let legacy_id = body["source_dashboard_id"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                *state.calls.entry(("migrate", legacy_id.clone())).or_default() += 1;
                if let Some(status) = *self.migrate_status.lock().unwrap() {
                    return ApiResponse::new(status, r#"{"message":"migration failed"}"#);
                }
                let Some((name, folder, _)) = state.legacy.get(&legacy_id).cloned() else {
                    return ApiResponse::new(404, r#"{"message":"no such dashboard"}"#);
                };
                let lakeview_id = format!("lv-{legacy_id}");
                state.lakeview.insert(lakeview_id.clone(), (name, folder));
                ApiResponse::new(200, json!({"dashboard_id": lakeview_id}).to_string())
            }
            Method::Post => {
                let id = path
                    .trim_start_matches(LAKEVIEW)
                    .trim_start_matches('/')
                    .trim_end_matches("/published")
                    .to_string();
                *state.calls.entry(("publish", id.clone())).or_default() += 1;
                if let Some(ledger_path) = self.snapshot_path.lock().unwrap().as_deref() {
                    self.snapshots.lock().unwrap().push(Ledger::load(ledger_path).unwrap());
                }
                if let Some(status) = *self.publish_status.lock().unwrap() {
                    return ApiResponse::new(status, r#"{"message":"publish failed"}"#);
                }
                state.published.insert(id);
                ApiResponse::new(200, "{}")
            }
            Method::Delete => {
                let id = path.trim_start_matches(LEGACY).trim_start_matches('/').to_string();
                *state.calls.entry(("delete", id.clone())).or_default() += 1;
                state.deleted.insert(id);
                ApiResponse::new(200, "{}")
            }
        }
    }
}

fn page_body(field: &str, items: Vec<serde_json::Value>, offset: usize) -> ApiResponse {
    let end = (offset + PAGE).min(items.len());
    let page: Vec<_> = items[offset.min(end)..end].to_vec();
    let mut body = json!({ field: page });
    if end < items.len() {
        body["next_page_token"] = json!(end.to_string());
    }
    ApiResponse::new(200, body.to_string())
}

impl Transport for FakeWorkspace {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        Ok(self.handle(request))
    }
}

/// Maps tenant names to fake workspaces.
#[derive(Clone, Default)]
pub struct FakeConnector {
    workspaces: HashMap<String, FakeWorkspace>,
}

impl FakeConnector {
    pub fn with(mut self, tenant: &str, workspace: FakeWorkspace) -> Self {
        self.workspaces.insert(tenant.to_string(), workspace);
        self
    }
}

impl Connector for FakeConnector {
    type Transport = FakeWorkspace;

    fn connect(&self, tenant: &str, _host: &str, _credential: &str) -> FakeWorkspace {
        self.workspaces.get(tenant).cloned().unwrap_or_default()
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
