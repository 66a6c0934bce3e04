//! Pure transformations: key mapping, part planning and filtering.
//!
//! Nothing in here touches the filesystem or the network.

mod filter;
mod key;
mod part;

pub use filter::ObjectFilter;
pub use key::{file_name_key, normalize_prefix, to_local_path, to_remote_key};
pub use part::{DEFAULT_MAX_PARTS, Part, plan_parts};
