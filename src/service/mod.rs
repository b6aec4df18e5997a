//! Business operations over the database pool; handlers stay thin.

pub mod categories;
pub mod entries;
pub mod favorites;
pub mod media;
pub mod search;
pub mod statistics;
pub mod users;
pub mod validation;

pub use categories::{CategoryChanges, CategoryService};
pub use entries::{EntryChanges, EntryService};
pub use favorites::FavoriteService;
pub use media::MediaStore;
pub use search::{SearchResults, SearchService};
pub use statistics::{Statistics, StatisticsService};
pub use users::UserService;
pub use validation::{RequestValidator, ValidationRule};
