//! Audio capture
//!
//! A recording runs on a dedicated capture thread (cpal streams are not
//! Send, and the stream callbacks need a thread that outlives them).
//! The thread is represented by a [`CaptureHandle`] owned exclusively
//! by the recording session; stopping either joins the thread within a
//! deadline or abandons it (detached), so a wedged audio backend can
//! never hang process shutdown.

pub mod capture;
pub mod device;

pub use capture::CaptureHandle;
