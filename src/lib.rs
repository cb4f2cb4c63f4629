//! Client-side query builder over a hosted page/database API.
//!
//! A `Catalog` discovers the databases visible to a credential and resolves
//! display titles to ids; a `Table` accumulates filter/sort/limit state
//! through chained calls, flushes it into a paginated fetch, and marshals
//! property values both ways through each property's declared type.
//!
//! ```rust,ignore
//! let mut db = Catalog::new(api_key);
//! db.initialize().await?;
//!
//! let mut blogs = db.from("blogs")?;
//! let posts = blogs.gt("Score", 50).order("Score", false).limit(10).select(&[]).await?;
//!
//! let id = blogs.insert(&[
//!     ("title", "Sample Title".into()),
//!     ("description", "This is a sample description".into()),
//! ]).await?;
//! ```

pub mod api;
pub mod catalog;
pub mod error;
pub mod property;
pub mod table;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use property::{flatten_page, Page, PropertyKind, PropertyValue};
pub use table::{FilterOp, Table};
