//! Media side of the radio site
//!
//! Random picks from the media folders and the bump upload form:
//!
//! - [`MediaLibrary`]: the layout of the web and music folders
//! - [`random_file`]: one visible file of a folder, drawn at random
//! - [`render_webm_page`]: the HTML page looping a webm
//! - [`store_bump`]: a listener's bump, saved in the upload folder
//!
//! With the `server` feature (enabled by default), [`MediaExt`] registers
//! the routes on a `radioserver::Server`.

pub mod error;
pub mod library;
pub mod upload;
pub mod webm;

#[cfg(feature = "server")]
pub mod api_rest;
#[cfg(feature = "server")]
pub mod server_ext;
#[cfg(feature = "server")]
mod server_impl;

pub use error::{MediaError, Result};
pub use library::{list_files, random_file, random_file_matching, MediaLibrary};
pub use upload::{bump_stem, store_bump, Bump};
pub use webm::{random_webm, render_webm_page};

#[cfg(feature = "server")]
pub use server_ext::{MediaExt, MediaState};
