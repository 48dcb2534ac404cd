//! CLI command implementations.
//!
//! | Module       | Commands handled |
//! |--------------|------------------|
//! | `chat`       | `Chat`           |
//! | `compress`   | `Compress`       |
//! | `characters` | `Characters`     |
//! | `config`     | `Config`         |

pub mod characters;
pub mod chat;
pub mod compress;
pub mod config;

pub use characters::cmd_characters;
pub use chat::{ChatArgs, cmd_chat};
pub use compress::cmd_compress;
pub use config::cmd_config;
