pub mod geometry;
pub mod identity;
pub mod poi;
pub mod style;
pub mod validation;

pub use geometry::Geometry;
pub use identity::{identity_of, Identity, DEFAULT_CATEGORY};
pub use poi::{ChecklistItem, Coordinates, MustSee, PointOfInterest, VisitedSignal};
pub use style::CategoryStyle;
pub use validation::{PoiFields, ValidationError};
