//! The `scrape_website` tool as the agent runtime sees it.
//!
//! - [`InvocationEvent`]: the payload the runtime delivers
//! - [`ScrapeHandler`]: resolve → fetch → extract for one invocation
//! - [`ResponseEnvelope`]: the fixed-shape reply, always `statusCode: 200`
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use siphon_action::{InvocationEvent, ScrapeHandler};
//! use siphon_config::SiphonConfig;
//!
//! let handler = ScrapeHandler::from_config(SiphonConfig::default())?;
//! let envelope = handler.handle(&InvocationEvent::for_url("https://example.com")).await?;
//! println!("{}", envelope.text().unwrap_or_default());
//! # Ok(()) }
//! ```

pub mod envelope;
pub mod handler;
pub mod invocation;

pub use envelope::{ActionRoute, EnvelopeError, ResponseEnvelope};
pub use handler::{ScrapeHandler, ScrapeRun};
pub use invocation::InvocationEvent;
