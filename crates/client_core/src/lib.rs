//! Client side of the storefront category list: the locally held order, the
//! drag session that rearranges it, and the reconciler that pushes changed
//! ordinals back to the category store.

pub mod drag;
pub mod error;
pub mod events;
pub mod list;
pub mod projection;
pub mod reconciler;
pub mod session;
pub mod settings;
pub mod store;

pub use drag::{DragSession, DragState, DropOutcome, ItemRect, KeyStep, Point};
pub use error::ReorderError;
pub use events::{ClientEvent, Notice};
pub use list::SortableCategoryList;
pub use reconciler::{ConsistencyPolicy, ReconcileReport};
pub use session::{AdminCredentials, AdminSession, SessionError, ViewMode};
pub use settings::{load_settings, ClientSettings};
pub use store::{CategoryStore, HttpCategoryStore, MissingCategoryStore};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
