//! Ephemeral toast state for surfaced notifications.
//!
//! A toast walks `Entering → Visible → Exiting → Removed` on its own
//! timers. The manager owns every timer and cancels them on dismissal and
//! on [`ToastManager::dispose`].

pub mod manager;
pub mod toast;

pub use manager::ToastManager;
pub use toast::{Toast, ToastEvent, ToastPhase, ToastTimings};
