use crate::http::RequestResult;

use super::Cabinet;

pub const NO_CABINET_ID: &str = "-1";
pub const NO_CABINET_NAME: &str = "Not available";

/// Cabinet list shown in the panel with the selected cabinet.
///
/// When loading failed or returned nothing, the list holds a single
/// "Not available" placeholder and [`CabinetData::has_cabinets`] is false.
#[derive(Debug, Clone, PartialEq)]
pub struct CabinetData {
    items: Vec<Cabinet>,
    current_cabinet_id: String,
}

impl CabinetData {
    pub fn new(result: Option<&RequestResult>, current_cabinet_id: Option<&str>) -> Self {
        let items = result
            .filter(|r| r.is_successful())
            .and_then(|r| r.parse_body::<Vec<Cabinet>>().ok())
            .filter(|items| !items.is_empty())
            .unwrap_or_else(|| vec![placeholder()]);

        let current_cabinet_id = match current_cabinet_id {
            Some(id) if items.iter().any(|c| c.id == id) => id.to_string(),
            _ => items[0].id.clone(),
        };

        Self {
            items,
            current_cabinet_id,
        }
    }

    pub fn items(&self) -> &[Cabinet] {
        &self.items
    }

    pub fn current_cabinet_id(&self) -> &str {
        &self.current_cabinet_id
    }

    /// Select `id`. Returns false and keeps the selection if it is not listed.
    pub fn select(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.current_cabinet_id = id.to_string();
        true
    }

    pub fn current_cabinet(&self) -> Option<&Cabinet> {
        self.find(&self.current_cabinet_id)
    }

    pub fn has_cabinets(&self) -> bool {
        !self.current_cabinet_id.is_empty() && self.current_cabinet_id != NO_CABINET_ID
    }

    pub fn find(&self, id: &str) -> Option<&Cabinet> {
        self.items.iter().find(|c| c.id == id)
    }
}

fn placeholder() -> Cabinet {
    Cabinet {
        id: NO_CABINET_ID.to_string(),
        name: NO_CABINET_NAME.to_string(),
        is_default: false,
        contains_workspaces: false,
        repository_id: None,
        hash_id: None,
    }
}
