//! Shared data model for the `Join` task board.
//!
//! Holds the task document types exchanged with the backing store, the
//! fixed set of board columns, and the JSON document codec.

pub mod codec;
pub mod column;
pub mod task;
