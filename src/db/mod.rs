mod error;
mod pages;
mod schema;

pub use error::{error_kind, StoreError, StoreErrorKind};
pub use pages::PageStore;
