//! Raw JSON shapes returned by the workspace API.
//!
//! The two dashboard APIs disagree on field names and omit fields freely, so
//! every field is optional here. These types never leave this crate's
//! normalization boundary ([`crate::catalog`]); downstream code sees only
//! [`dashmig_core::types::DashboardRecord`].

use serde::Deserialize;

/// Identifier that may arrive as a JSON string or number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

fn id_string(id: Option<RawId>) -> Option<String> {
    id.map(RawId::into_string).filter(|s| !s.is_empty())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Return the first present, non-empty candidate.
fn first_of<'a>(candidates: &[Option<&'a str>]) -> &'a str {
    candidates.iter().flatten().next().copied().unwrap_or("")
}

/// Embedded user object (`user`, `creator`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub id: Option<RawId>,
}

impl RawUser {
    fn name(&self) -> Option<String> {
        non_empty(&self.user_name)
            .or_else(|| non_empty(&self.email))
            .map(str::to_string)
            .or_else(|| id_string(self.id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Legacy dashboards
// ---------------------------------------------------------------------------

/// One page of `GET /api/2.0/preview/sql/dashboards`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyPage {
    #[serde(default)]
    pub results: Vec<RawLegacyDashboard>,
    pub next_page_token: Option<String>,
}

/// A legacy SQL dashboard as listed by the preview API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLegacyDashboard {
    pub id: Option<RawId>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub dashboard_path: Option<String>,
    pub created_at: Option<String>,
    pub create_time: Option<String>,
    pub updated_at: Option<String>,
    pub update_time: Option<String>,
    pub modified_at: Option<String>,
    pub owner: Option<String>,
    pub user: Option<RawUser>,
    pub user_name: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
}

impl RawLegacyDashboard {
    pub fn id(&self) -> Option<String> {
        id_string(self.id.clone())
    }

    pub fn name(&self) -> &str {
        first_of(&[non_empty(&self.name)])
    }

    pub fn path(&self) -> &str {
        first_of(&[non_empty(&self.path), non_empty(&self.dashboard_path)])
    }

    pub fn created_at(&self) -> &str {
        first_of(&[non_empty(&self.created_at), non_empty(&self.create_time)])
    }

    pub fn updated_at(&self) -> &str {
        first_of(&[
            non_empty(&self.updated_at),
            non_empty(&self.update_time),
            non_empty(&self.modified_at),
        ])
    }

    pub fn owner(&self) -> String {
        non_empty(&self.owner)
            .map(str::to_string)
            .or_else(|| self.user.as_ref().and_then(RawUser::name))
            .or_else(|| non_empty(&self.user_name).map(str::to_string))
            .unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        first_of(&[non_empty(&self.description), non_empty(&self.summary)])
    }
}

// ---------------------------------------------------------------------------
// Lakeview dashboards
// ---------------------------------------------------------------------------

/// One page of `GET /api/2.0/lakeview/dashboards`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LakeviewPage {
    #[serde(default)]
    pub dashboards: Vec<RawLakeviewDashboard>,
    #[serde(default)]
    pub results: Vec<RawLakeviewDashboard>,
    pub next_page_token: Option<String>,
}

impl LakeviewPage {
    /// Entries under `dashboards`, or `results` when the former is empty.
    pub fn into_entries(self) -> Vec<RawLakeviewDashboard> {
        if self.dashboards.is_empty() {
            self.results
        } else {
            self.dashboards
        }
    }
}

/// A Lakeview dashboard from the listing or detail endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLakeviewDashboard {
    pub dashboard_id: Option<RawId>,
    pub id: Option<RawId>,
    pub object_id: Option<RawId>,
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub parent_path: Option<String>,
    pub path_name: Option<String>,
    pub create_time: Option<String>,
    pub created_at: Option<String>,
    pub created_time: Option<String>,
    pub update_time: Option<String>,
    pub updated_at: Option<String>,
    pub modified_at: Option<String>,
    pub last_modified: Option<String>,
    pub owner: Option<String>,
    pub user: Option<RawUser>,
    pub user_name: Option<String>,
    pub creator: Option<RawUser>,
    pub created_by: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub display_description: Option<String>,
    pub published: Option<bool>,
}

/// Suffix of the Lakeview file name inside a workspace path.
const LAKEVIEW_FILE_SUFFIX: &str = ".lvdash.json";

impl RawLakeviewDashboard {
    pub fn id(&self) -> Option<String> {
        id_string(self.dashboard_id.clone())
            .or_else(|| id_string(self.id.clone()))
            .or_else(|| id_string(self.object_id.clone()))
    }

    /// Overlay the detail response on top of the listing entry.
    pub fn merge_detail(self, detail: RawLakeviewDashboard) -> Self {
        Self {
            dashboard_id: detail.dashboard_id.or(self.dashboard_id),
            id: detail.id.or(self.id),
            object_id: detail.object_id.or(self.object_id),
            display_name: detail.display_name.or(self.display_name),
            name: detail.name.or(self.name),
            path: detail.path.or(self.path),
            parent_path: detail.parent_path.or(self.parent_path),
            path_name: detail.path_name.or(self.path_name),
            create_time: detail.create_time.or(self.create_time),
            created_at: detail.created_at.or(self.created_at),
            created_time: detail.created_time.or(self.created_time),
            update_time: detail.update_time.or(self.update_time),
            updated_at: detail.updated_at.or(self.updated_at),
            modified_at: detail.modified_at.or(self.modified_at),
            last_modified: detail.last_modified.or(self.last_modified),
            owner: detail.owner.or(self.owner),
            user: detail.user.or(self.user),
            user_name: detail.user_name.or(self.user_name),
            creator: detail.creator.or(self.creator),
            created_by: detail.created_by.or(self.created_by),
            description: detail.description.or(self.description),
            summary: detail.summary.or(self.summary),
            display_description: detail.display_description.or(self.display_description),
            published: detail.published.or(self.published),
        }
    }

    pub fn name(&self) -> &str {
        first_of(&[non_empty(&self.display_name), non_empty(&self.name)])
    }

    /// Folder containing the dashboard.
    ///
    /// Prefers `parent_path`; otherwise strips the `*.lvdash.json` file name
    /// from `path`.
    pub fn folder(&self) -> String {
        if let Some(parent) = non_empty(&self.parent_path) {
            return parent.to_string();
        }
        match non_empty(&self.path) {
            Some(full) if full.contains(LAKEVIEW_FILE_SUFFIX) => {
                let without_ext = full.replace(LAKEVIEW_FILE_SUFFIX, "");
                match without_ext.rsplit_once('/') {
                    Some((dir, _)) => dir.to_string(),
                    None => without_ext,
                }
            }
            Some(full) => full.to_string(),
            None => first_of(&[non_empty(&self.path_name)]).to_string(),
        }
    }

    pub fn created_at(&self) -> &str {
        first_of(&[
            non_empty(&self.create_time),
            non_empty(&self.created_at),
            non_empty(&self.created_time),
        ])
    }

    pub fn updated_at(&self) -> &str {
        first_of(&[
            non_empty(&self.update_time),
            non_empty(&self.updated_at),
            non_empty(&self.modified_at),
            non_empty(&self.last_modified),
        ])
    }

    pub fn owner(&self) -> String {
        non_empty(&self.owner)
            .map(str::to_string)
            .or_else(|| self.user.as_ref().and_then(RawUser::name))
            .or_else(|| non_empty(&self.user_name).map(str::to_string))
            .or_else(|| self.creator.as_ref().and_then(RawUser::name))
            .or_else(|| non_empty(&self.created_by).map(str::to_string))
            .unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        first_of(&[
            non_empty(&self.description),
            non_empty(&self.summary),
            non_empty(&self.display_description),
        ])
    }
}

/// Response of `GET /api/2.0/lakeview/dashboards/{id}/published`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishedInfo {
    pub revision_create_time: Option<String>,
    pub published_at: Option<String>,
    pub publish_time: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub warehouse_id: Option<String>,
}

impl PublishedInfo {
    /// When the current revision was published.
    pub fn published_at(&self) -> &str {
        first_of(&[
            non_empty(&self.revision_create_time),
            non_empty(&self.published_at),
            non_empty(&self.publish_time),
            non_empty(&self.created_at),
            non_empty(&self.updated_at),
        ])
    }
}

/// Response of `POST /api/2.0/lakeview/dashboards/migrate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrateResponse {
    pub dashboard_id: Option<RawId>,
    pub id: Option<RawId>,
}

impl MigrateResponse {
    /// Id of the newly created Lakeview dashboard.
    pub fn lakeview_id(&self) -> Option<String> {
        id_string(self.id.clone()).or_else(|| id_string(self.dashboard_id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
