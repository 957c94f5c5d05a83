//! # radiodj - DJ accounts of the radio
//!
//! Accounts live in a JSON file. A single task owns the file and
//! [`UserDirectory`] handles talk to it through a channel, so concurrent
//! commands never interleave their writes.
//!
//! ```rust,no_run
//! use radiodj::{Flag, UserDirectory};
//!
//! # #[tokio::main]
//! # async fn main() -> radiodj::Result<()> {
//! let users = UserDirectory::open("users.json").await?;
//! let password = users.create_user("dj_kool").await?;
//! assert!(users.verify("dj_kool", &password).await?);
//! users.set_flag("dj_kool", Flag::Admin, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod directory;
pub mod error;
pub mod password;
pub mod store;

pub use directory::UserDirectory;
pub use error::{Error, Result};
pub use store::{Flag, UserRecord, UserStore, SUPERADMIN};
