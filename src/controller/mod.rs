#[cfg(feature = "desktop")]
pub mod commands;
mod travel_map;
mod view;

pub use travel_map::{Options, TravelMap};
pub use view::{CategorySummary, MarkerView, RecordDetails, ViewState};
