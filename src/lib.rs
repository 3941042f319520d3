pub mod browser;
pub mod chrome;
pub mod config;
pub mod cookie_store;
pub mod delay_manager;
pub mod detail;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod input_loader;
pub mod job_source;
pub mod logger;
pub mod models;
pub mod pagination;
pub mod session;
pub mod sites;
pub mod static_page;

#[cfg(test)]
mod testing;

// Exporting types for convenience
pub use config::{Backend, Config, Credentials};
pub use cookie_store::{CookieRecord, CookieStore};
pub use error::{Result, ScrapeError};
pub use input_loader::SearchRequest;
pub use job_source::{JobSource, SearchOutcome};
pub use models::{JobDetail, JobSummary, JobType, SearchCriteria};
pub use sites::{Site, SiteAdapter};
