//! Small helpers shared by the terminal UI and the CLI.
//!
//! - **Text**: Unicode-aware width, truncation and wrapping, plus stripping
//!   of terminal escape sequences from server-supplied text
//! - **Links**: validation of URLs before they are opened in a browser

mod text;
mod url_validator;

pub use text::{display_width, one_line, strip_control_chars, truncate_to_width, wrap_to_width};
pub use url_validator::{validate_url_for_open, UrlValidationError};
