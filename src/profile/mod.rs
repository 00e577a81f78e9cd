pub(crate) mod model;
mod store;

pub use model::{validate_profile_name, Profile, DEFAULT_PROFILE_NAME};
pub use store::ProfileStore;
