//! # MRP Store
//!
//! 資料存取介面的兩種實作：記憶體（測試用，可注入故障並計算查詢次數）與 SQLite。

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

// Re-export 主要類型
pub use error::{StoreError, StoreResult};
pub use memory::{FailurePoint, InMemoryStore, QueryKind};
pub use sqlite::{BomLine, SqliteStore};
