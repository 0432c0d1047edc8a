mod r#impl;
mod secret;
mod structs;

pub use r#impl::{get_config, init_config};
pub use secret::{SECRET_FILE, SECRET_LEN, load_or_create_secret, resolve_secret};
pub use structs::*;
