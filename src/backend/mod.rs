pub mod hardware;
pub mod software;
pub mod streams;

pub use hardware::WgpuBackend;
pub use software::SoftwareBackend;
pub use streams::{StreamBinding, StreamBindings};

/// The backend-specific half of an instance buffer.
///
/// The instance buffer owns the CPU-side records; a backend decides what locking,
/// unlocking and binding them means for wherever the records end up being drawn from.
pub trait InstanceBackend {
    /// Called when a write session begins.
    fn lock(&mut self) {}

    /// Called when a write session ends, with the whole block of records.
    fn unlock(&mut self, block: &[u8]);

    /// Make the records starting at `first_instance` available to the next instanced draw on `stream`.
    fn bind(&mut self, stream: u32, first_instance: u32, stride: u32);

    /// Release whatever `bind` set up for `stream`.
    fn unbind(&mut self, stream: u32);
}
