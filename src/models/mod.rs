//! Row types loaded with `sqlx::FromRow` and the JSON representations built from them.

pub mod category;
pub mod entry;
pub mod favorite;
pub mod profile;
pub mod user;

pub use category::Category;
pub use entry::{EntryDetail, EntryImage, EntryImageView, EntryListItem, EntryRow, HistoryItem, HistoryRow};
pub use favorite::{FavoriteRow, FavoriteView};
pub use profile::{ProfileRow, ProfileView};
pub use user::{User, UserSummary};
