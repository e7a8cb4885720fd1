// Resume storage, text extraction and the HTTP surface over them.

pub mod extract;
pub mod handlers;
pub mod store;
