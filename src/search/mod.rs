pub mod blackbox;
pub mod feedback;
pub mod provider;
pub mod viewer;

pub use provider::{SearchContext, SearchProvider, SearchProviderName, SearchRegistry};
pub use viewer::SearchResultRecord;
