/// Middleware modules for the API server
///
/// Authentication middleware lives in the shared crate; what remains here
/// is response-shaping middleware:
/// - Security headers

pub mod security;
