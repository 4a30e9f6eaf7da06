//! Tool listings with copy-on-write versions.
//!
//! A [`Tool`] row only holds identity, ownership, the availability flag, and
//! a pointer to its active [`ToolVersion`]. Editing listing terms appends a
//! new version and moves the pointer; old versions stay untouched so
//! bookings keep the terms they were made under.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::db::models::{NewTool, NewToolVersion, Tool, ToolChanges, ToolVersion};
use crate::error::{ApiResult, Error};
use crate::models::{
    CategoryView, CreateToolRequest, OwnerSummary, ToolDetails, ToolView, UpdateToolRequest,
};
use crate::services::SharedClock;
use crate::store::{Store, ToolFilter};

/// Result of checking whether an actor may mutate a tool. Absent and
/// foreign tools collapse into one case so callers cannot reveal which.
#[derive(Debug, Clone, PartialEq)]
pub enum Ownership {
    Authorized(Tool),
    NotFoundOrForbidden,
}

impl Ownership {
    pub fn check(tool: Option<Tool>, actor: Uuid) -> Self {
        match tool {
            Some(tool) if tool.owner_id == actor => Self::Authorized(tool),
            _ => Self::NotFoundOrForbidden,
        }
    }

    pub fn into_result(self, tool_id: Uuid) -> ApiResult<Tool> {
        match self {
            Self::Authorized(tool) => Ok(tool),
            Self::NotFoundOrForbidden => Err(tool_not_found(tool_id)),
        }
    }
}

pub(crate) fn tool_not_found(id: Uuid) -> Error {
    Error::not_found(format!("Tool with ID {id} not found"))
}

#[derive(Clone)]
pub struct ToolService {
    store: Arc<dyn Store>,
    clock: SharedClock,
}

impl ToolService {
    pub fn new(store: Arc<dyn Store>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Creates the tool and its first version in one transaction.
    pub fn create(&self, owner_id: Uuid, request: CreateToolRequest) -> ApiResult<ToolView> {
        validate_terms(&TermsRef {
            name: Some(&request.name),
            description: Some(&request.description),
            price_per_day: Some(request.price_per_day),
            replacement_value: request.replacement_value,
            latitude: request.latitude,
            longitude: request.longitude,
        })?;
        self.ensure_category(request.category_id)?;

        let now = self.clock.utc();
        let tool_id = Uuid::new_v4();
        let first = NewToolVersion {
            id: Uuid::new_v4(),
            tool_id,
            name: request.name.trim().to_owned(),
            description: request.description.trim().to_owned(),
            category_id: request.category_id,
            price_per_day: request.price_per_day,
            replacement_value: request.replacement_value,
            condition: request.condition,
            latitude: request.latitude,
            longitude: request.longitude,
            images: request.images,
            created_at: now,
        };
        let tool = NewTool {
            id: tool_id,
            owner_id,
            is_available: request.is_available.unwrap_or(true),
            active_version_id: None,
            created_at: now,
        };

        let (tool, version) = self.store.create_tool(tool, first)?;
        info!(tool_id = %tool.id, version_id = %version.id, %owner_id, "tool listed");
        self.view(tool)
    }

    /// Available tools, newest first, optionally hiding one owner's.
    pub fn list(&self, exclude_owner: Option<Uuid>) -> ApiResult<Vec<ToolView>> {
        let tools = self.store.list_tools(ToolFilter::Available { exclude_owner })?;
        self.compose(tools)
    }

    pub fn list_mine(&self, owner_id: Uuid) -> ApiResult<Vec<ToolView>> {
        let tools = self.store.list_tools(ToolFilter::OwnedBy(owner_id))?;
        self.compose(tools)
    }

    pub fn get(&self, id: Uuid) -> ApiResult<ToolView> {
        let tool = self.store.find_tool(id)?.ok_or_else(|| tool_not_found(id))?;
        self.view(tool)
    }

    /// `isAvailable` is patched in place; any other field appends a version
    /// seeded from the active one. Both happen in one transaction.
    pub fn update(&self, id: Uuid, actor: Uuid, request: UpdateToolRequest) -> ApiResult<ToolView> {
        let tool = Ownership::check(self.store.find_tool(id)?, actor).into_result(id)?;

        validate_terms(&TermsRef {
            name: request.name.as_deref(),
            description: request.description.as_deref(),
            price_per_day: request.price_per_day,
            replacement_value: request.replacement_value.flatten(),
            latitude: request.latitude.flatten(),
            longitude: request.longitude.flatten(),
        })?;
        if let Some(category_id) = request.category_id {
            self.ensure_category(category_id)?;
        }

        let is_available = request.is_available;
        let changes = ToolChanges {
            name: request.name.map(|n| n.trim().to_owned()),
            description: request.description.map(|d| d.trim().to_owned()),
            category_id: request.category_id,
            price_per_day: request.price_per_day,
            replacement_value: request.replacement_value,
            condition: request.condition,
            latitude: request.latitude,
            longitude: request.longitude,
            images: request.images,
        };

        let next = if changes.is_empty() {
            None
        } else {
            let active = self
                .active_version(&tool)?
                .ok_or_else(|| Error::invalid_request("Tool has no active version to revise"))?;
            Some(active.revise(changes, self.clock.utc()))
        };

        if is_available.is_none() && next.is_none() {
            return self.view(tool);
        }

        let next_id = next.as_ref().map(|v| v.id);
        let tool = self.store.revise_tool(id, is_available, next)?;
        info!(tool_id = %id, new_version = ?next_id, ?is_available, "tool updated");
        self.view(tool)
    }

    pub fn delete(&self, id: Uuid, actor: Uuid) -> ApiResult<()> {
        Ownership::check(self.store.find_tool(id)?, actor).into_result(id)?;
        self.store.delete_tool(id)?;
        info!(tool_id = %id, "tool deleted");
        Ok(())
    }

    fn active_version(&self, tool: &Tool) -> ApiResult<Option<ToolVersion>> {
        match tool.active_version_id {
            Some(version_id) => Ok(self.store.versions_by_ids(&[version_id])?.into_iter().next()),
            None => Ok(None),
        }
    }

    fn ensure_category(&self, category_id: Uuid) -> ApiResult<()> {
        match self.store.find_category(category_id)? {
            Some(_) => Ok(()),
            None => Err(Error::invalid_request(format!(
                "categoryId {category_id} does not match a known category"
            ))),
        }
    }

    fn view(&self, tool: Tool) -> ApiResult<ToolView> {
        let id = tool.id;
        self.compose(vec![tool])?
            .into_iter()
            .next()
            .ok_or_else(|| tool_not_found(id))
    }

    /// Joins each tool with its active version, category, and owner.
    fn compose(&self, tools: Vec<Tool>) -> ApiResult<Vec<ToolView>> {
        let version_ids: Vec<Uuid> = tools.iter().filter_map(|t| t.active_version_id).collect();
        let versions: HashMap<Uuid, ToolVersion> = self
            .store
            .versions_by_ids(&version_ids)?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let category_ids: Vec<Uuid> = versions.values().map(|v| v.category_id).collect();
        let categories: HashMap<Uuid, CategoryView> = self
            .store
            .categories_by_ids(&category_ids)?
            .iter()
            .map(|c| (c.id, CategoryView::from(c)))
            .collect();

        let owner_ids: Vec<Uuid> = tools.iter().map(|t| t.owner_id).collect();
        let owners: HashMap<Uuid, OwnerSummary> = self
            .store
            .users_by_ids(&owner_ids)?
            .iter()
            .map(|u| (u.id, OwnerSummary::from(u)))
            .collect();

        Ok(tools
            .into_iter()
            .map(|tool| {
                let version = tool.active_version_id.and_then(|id| versions.get(&id));
                ToolView {
                    id: tool.id,
                    owner_id: tool.owner_id,
                    is_available: tool.is_available,
                    active_version_id: tool.active_version_id,
                    details: version.map(ToolDetails::from),
                    category: version.and_then(|v| categories.get(&v.category_id).cloned()),
                    owner: owners.get(&tool.owner_id).cloned(),
                    created_at: tool.created_at,
                }
            })
            .collect())
    }
}

struct TermsRef<'a> {
    name: Option<&'a str>,
    description: Option<&'a str>,
    price_per_day: Option<f64>,
    replacement_value: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

fn validate_terms(terms: &TermsRef<'_>) -> ApiResult<()> {
    if terms.name.is_some_and(|n| n.trim().is_empty()) {
        return Err(Error::invalid_request("name must not be empty"));
    }
    if terms.description.is_some_and(|d| d.trim().is_empty()) {
        return Err(Error::invalid_request("description must not be empty"));
    }
    if terms.price_per_day.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(Error::invalid_request("pricePerDay must be a non-negative number"));
    }
    if terms.replacement_value.is_some_and(|v| !v.is_finite() || v < 0.0) {
        return Err(Error::invalid_request("replacementValue must be a non-negative number"));
    }
    if terms.latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(Error::invalid_request("latitude must be between -90 and 90"));
    }
    if terms.longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
        return Err(Error::invalid_request("longitude must be between -180 and 180"));
    }
    Ok(())
}
