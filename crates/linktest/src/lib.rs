//! Serial data-channel self-test.
//!
//! linktest continuously transmits a fixed reference frame over a
//! bidirectional serial channel, captures whatever comes back, and checks
//! it byte for byte — a bring-up and regression harness for physical links.
//!
//! # Crate Structure
//!
//! - [`channel`] — Channel-peripheral abstraction and the loopback implementation
//! - [`frame`] — Marker-delimited reference frames and validation
//! - [`harness`] — The self-test loop: scheduler, boundary detector, consumer, health

/// Re-export channel types.
pub mod channel {
    pub use linktest_channel::*;
}

/// Re-export frame types.
pub mod frame {
    pub use linktest_frame::*;
}

/// Re-export harness types.
pub mod harness {
    pub use linktest_harness::*;
}
