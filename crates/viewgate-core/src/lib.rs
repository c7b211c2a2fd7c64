#[macro_use]
mod error;
pub use error::Error;

pub mod driver;
pub use driver::Connection;

pub mod metrics;

pub mod schema;
pub use schema::View;

pub mod selector;
pub use selector::Selector;

pub mod stmt;

/// A Result type alias that uses Viewgate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
