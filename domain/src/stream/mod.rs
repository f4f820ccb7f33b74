//! Reply stream decoding.
//!
//! - [`framer::BlockFramer`]: turns text fragments into event blocks
//! - [`event::ChatEvent`]: the typed event carried by one block

pub mod event;
pub mod framer;
