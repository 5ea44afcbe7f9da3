pub mod app;
pub mod club;

pub use app::AppState;
pub use club::{new_store, ClubData, ClubStore};
