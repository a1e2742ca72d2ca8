//! Dialogue tracking
//!
//! The policies never store conversation state. Everything they need is
//! reconstructed from the event log on every call, through the narrow
//! [`HistoryInspector`] view.
//!
//! ```text
//! DialogueHistory (raw events)
//!     │  replay restarts and reverts
//!     ▼
//! applied events ──▶ DialogueLog ──▶ HistoryInspector ──▶ policy rules
//! ```

pub mod events;
pub mod history;
pub mod inspector;

pub use events::{Event, UserMessage};
pub use history::{DialogueHistory, DialogueLog, HistoryError, HistoryResult};
pub use inspector::HistoryInspector;
