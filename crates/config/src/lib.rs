//! Configuration: schema, file discovery, and `${ENV_VAR}` substitution.
//!
//! Config lives in `waypost.{toml,yaml,yml,json}`, project-local first, then
//! `~/.config/waypost/`. Bot secrets may come from the environment instead
//! (`WAYPOST_BOT_TOKEN`, `WAYPOST_OWNER_ID`, `WAYPOST_ACCESS_CODE`), which
//! always win over file values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{data_dir, discover_and_load, load_config, set_config_dir},
    schema::WaypostConfig,
};
