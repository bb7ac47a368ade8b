pub mod buffer;

use wgpu::{
    DeviceDescriptor, ExperimentalFeatures, Features, Instance, InstanceDescriptor, Limits,
    PowerPreference, RequestAdapterOptions, Trace,
};

/// The device + queue a `WgpuBackend` creates its vertex buffer on and uploads records through.
///
/// Cheap to clone; every backend keeps its own copy.
#[derive(Clone, Debug)]
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Wrap a device + queue that the caller already requested (eg alongside a surface).
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Request a device + queue without a surface (ie for offscreen work and tests).
    pub async fn headless() -> anyhow::Result<Self> {
        let instance = Instance::new(&InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("headless_device"),
                required_features: Features::empty(),
                experimental_features: ExperimentalFeatures::disabled(),
                required_limits: Limits::downlevel_defaults(),
                memory_hints: Default::default(),
                trace: Trace::Off,
            })
            .await?;
        log::debug!("created headless gpu context on {:?}", adapter.get_info().name);
        Ok(Self::new(device, queue))
    }

    /// The device, for creating buffers and pipelines.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The queue instance records are written through.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
