pub mod url;

pub use url::{NewUrlRecord, StoreStats, UrlRecord};
