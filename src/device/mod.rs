//! Capture device acquisition and release.
//!
//! [`DeviceResource`] hands out [`DeviceHandle`]s over a pluggable
//! [`CaptureBackend`]. A handle owns an open stream and is released exactly
//! once, either through [`DeviceResource::release`] or on drop.

mod backend;
mod constraints;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod resource;

pub use backend::{CaptureBackend, DeviceAcquisitionError, DeviceError, StreamError, VideoStream};
pub use constraints::{ConstraintError, DeviceConstraints};
pub use frame::{RawFrame, RGB_CHANNELS};
pub use mock::{MockControl, MockDevice};
#[cfg(feature = "camera")]
pub use native::NativeDevice;
pub use resource::{DeviceHandle, DeviceResource, HandleId};
