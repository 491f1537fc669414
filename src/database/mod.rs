pub mod manager;
pub mod memory;
pub mod models;
pub mod users;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryUserStore;
pub use models::user::{NewUser, UserRecord};
pub use users::{PgUserStore, StoreError, UserStore};
