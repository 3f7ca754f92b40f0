//! Umbrella crate re-exporting the Beehive work-session client.

pub use beehive_api as api;
pub use beehive_config as config;
pub use beehive_domain as domain;
pub use beehive_session as session;
pub use beehive_core as state;
