/// Router Module Index
///
/// Splits the surface by access requirement. Authentication is attached as a layer on
/// the whole protected router in `create_router`, so no content endpoint can be added
/// without it.

/// Probes and API documentation, reachable without a token.
pub mod public;

/// The `/content` API. Every route requires a verified bearer token.
pub mod authenticated;
