//! Catalog service implementations.

pub mod direct;
pub mod spotify;
pub mod types;

pub use direct::DirectFeatureRequest;
pub use spotify::SpotifyClient;
