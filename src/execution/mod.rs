//! Monthly execution tracking.
//! Includes:
//! - The per-month record state machine
//! - Immutable snapshots frozen at start
//! - Contribution accrual and the bounded undo window
//!
//! ```plain
//! Record lifecycle:
//!
//!   (none) ── create ──▶ draft ── start ──▶ executing ── close ──▶ closed
//!                                    ▲                         │
//!                                    └────── reopen (undo) ────┘
//! ```

pub(crate) mod record;
pub(crate) mod snapshot;
