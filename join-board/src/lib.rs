//! Kanban board engine for the `Join` task manager.
//!
//! The board derives four ordered columns from a realtime task collection,
//! narrows them with a search filter, and turns drag-and-drop gestures into
//! reorders and status transitions that are persisted back to the store.
//!
//! - [`columns`] partitions and sorts tasks into columns
//! - [`filter`] narrows columns by a search term
//! - [`dragdrop`] plans and persists drops
//! - [`controller`] owns board state and wires the pieces together
//! - [`store`], [`permission`] and [`notify`] are the collaborators the
//!   controller is built from

pub mod columns;
pub mod config;
pub mod controller;
pub mod dragdrop;
pub mod filter;
pub mod highlight;
pub mod notify;
pub mod permission;
pub mod store;
pub mod summary;
