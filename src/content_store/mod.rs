mod models;
mod schema;
mod store;
mod trait_def;

pub use models::ContentStats;
pub use store::SqliteContentStore;
pub use trait_def::ContentStore;
