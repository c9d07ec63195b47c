//! Rule matching, application, storage, and import/export.

pub mod engine;
pub mod export;
pub mod matcher;
pub mod store;

pub use engine::*;
pub use export::*;
pub use store::*;
