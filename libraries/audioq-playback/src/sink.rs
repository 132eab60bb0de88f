//! Audio output sink abstraction
//!
//! The sink is the device boundary. The engine opens one stream per played
//! cue and hands it to the streaming thread; the control path never writes
//! audio itself, so operator actions are never stalled by hardware
//! backpressure.

use crate::error::Result;
use crate::types::SignalSpec;

/// An open, writable audio output stream.
///
/// Dropping the stream releases the device.
pub trait OutputStream: Send {
    /// Queue interleaved samples for playback.
    ///
    /// May block while the device buffer is full; the wait is bounded by
    /// the device's drain rate. Only the streaming thread calls this.
    fn write(&mut self, samples: &[f32]) -> Result<()>;

    /// Wait until everything queued has been played out.
    ///
    /// Used at the natural end of a cue so its tail is not cut off.
    fn drain(&mut self) -> Result<()>;

    /// Throw away queued samples for an immediate stop.
    fn discard(&mut self);
}

/// Audio output device.
pub trait AudioOutputSink: Send {
    /// Open a stream that will receive `buffer_frames` frames per write.
    fn open(&self, buffer_frames: u32, spec: SignalSpec) -> Result<Box<dyn OutputStream>>;
}
