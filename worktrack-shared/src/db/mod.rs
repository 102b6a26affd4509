/// Database layer for WorkTrack.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: embedded migration runner and status reporting
///
/// Domain models live in the `models` module at the crate root.

pub mod migrations;
pub mod pool;
