//! # hudtext
//!
//! Rich-text hints for fixed-width remote displays.
//!
//! `hudtext` ties together two pieces:
//!
//! - [`markup`]: a permissive compiler for `<size>`, `<line-height>`, case,
//!   `<color>`, `<noparse>` and `<nobr>` tags. Its output is always
//!   balanced and it measures lines against the display width.
//! - [`schedule`]: a debounced, rate-limited flush scheduler with pause,
//!   resume and cancel.
//!
//! A [`Coordinator`] owns one scheduler per recipient and sends the latest
//! compiled content through a [`Transport`] whenever a flush fires.
//!
//! ```no_run
//! use std::time::Duration;
//! use hudtext::{Coordinator, HudConfig, Priority, StdoutTransport};
//!
//! let hud: Coordinator<String> = Coordinator::new(HudConfig::default(), StdoutTransport);
//! let player = "player-1".to_string();
//!
//! hud.show(&player, "<size=150%>Round 2</size>", Priority::NORMAL, Duration::from_millis(50))?;
//! hud.show(&player, "<size=150%>Round 3</size>", Priority::NORMAL, Duration::from_millis(50))?;
//! // Only "Round 3" is delivered.
//! # Ok::<(), hudtext::HudError>(())
//! ```
//!
//! When something else writes to a recipient's display, report it with
//! [`Coordinator::external_display`] so the next delivery respects the rate
//! limit and repaints over the foreign content once it expires.

mod config;
mod coordinator;
mod error;
mod transport;

pub use hudtext_markup as markup;
pub use hudtext_schedule as schedule;

pub use config::{ConfigError, HookConfig, HudConfig};
pub use coordinator::Coordinator;
pub use error::HudError;
pub use transport::{MemoryTransport, StdoutTransport, Transport};

pub use hudtext_markup::{compile, CompiledText, Compiler, LayoutMetrics};
pub use hudtext_schedule::{Priority, SchedulerConfig, SchedulerState};
