//! FACEIT upstream: the HTTP client and the map lookup tables.

pub mod http;
pub mod maps;

pub use http::{ClientConfig, FaceitClient, FACEIT_BASE_URL};
pub use maps::{map_name_for, map_type_for};
