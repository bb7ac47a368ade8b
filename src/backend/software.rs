use crate::backend::InstanceBackend;

/// A backend for records that never leave CPU memory.
///
/// Every hook is a no-op; the records are always addressable and nothing needs flushing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareBackend;

impl InstanceBackend for SoftwareBackend {
    fn unlock(&mut self, block: &[u8]) {
        log::trace!("software instance buffer unlocked ({} bytes)", block.len());
    }

    fn bind(&mut self, stream: u32, first_instance: u32, _stride: u32) {
        log::trace!("software instance buffer bound to stream {stream} from instance {first_instance}");
    }

    fn unbind(&mut self, stream: u32) {
        log::trace!("software instance buffer unbound from stream {stream}");
    }
}
