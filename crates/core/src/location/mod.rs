//! Filing locations: wire types, naming helpers and panel collections.

mod data;
mod naming;
mod types;

pub use data::{LocationItem, PredictionData, QuickSearchData, SelectionChange};
pub use naming::{
    alternative_identifier, cabinet_id_from_url, display_name, location_identifier, parent_name,
};
pub use types::{
    FilingLocation, Location, LocationType, LocationsResponse, ParentLocation, SearchConfiguration,
};
