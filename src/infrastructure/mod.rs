pub mod appinfo_cache;
pub mod logging;
pub mod providers;
pub mod store_api;
