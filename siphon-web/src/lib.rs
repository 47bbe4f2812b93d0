//! Page-level web utilities that never touch the network.
//!
//! - URL resolution from structured fields or free text (`resolve`)
//! - Lenient HTML to clean text, plus title/description metadata (`extract`)

pub mod extract;
pub mod resolve;
