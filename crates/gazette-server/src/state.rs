//! Shared application state for the gazette server.

use gazette_core::reader::Reader;
use gazette_core::storage::DbPool;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    /// SQLite connection pool.
    pub db: DbPool,
    /// Edition assembler.
    pub reader: Reader,
}
