//! A globally shared graphics context.

use std::sync::Arc;

/// Error raised while bringing up the graphics context.
#[derive(Debug)]
pub enum ContextError {
    /// No adapter satisfied the request, e.g. no GPU or no supported backend.
    AdapterNotFound(wgpu::RequestAdapterError),
    /// The adapter refused the device request.
    DeviceRequestFailed(wgpu::RequestDeviceError),
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::AdapterNotFound(err) => {
                write!(f, "no suitable GPU adapter found: {err}")
            }
            ContextError::DeviceRequestFailed(err) => {
                write!(f, "failed to create device: {err}")
            }
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextError::AdapterNotFound(err) => Some(err),
            ContextError::DeviceRequestFailed(err) => Some(err),
        }
    }
}

/// Shared handles to the GPU: instance, adapter, device and queue.
///
/// Returned as `Arc<Self>` so the context can be cheaply cloned into
/// everything that needs device access.
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GraphicsContext {
    /// Creates a graphics context with default settings.
    pub async fn new() -> Result<Arc<Self>, ContextError> {
        Self::new_with_descriptor(GraphicsContextDescriptor::default()).await
    }

    /// Creates a graphics context, blocking the current thread.
    pub fn new_sync() -> Result<Arc<Self>, ContextError> {
        pollster::block_on(Self::new())
    }

    /// Creates a graphics context with a custom descriptor.
    pub async fn new_with_descriptor(
        descriptor: GraphicsContextDescriptor,
    ) -> Result<Arc<Self>, ContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: descriptor.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: descriptor.power_preference,
                compatible_surface: None,
                force_fallback_adapter: descriptor.force_fallback_adapter,
            })
            .await
            .map_err(ContextError::AdapterNotFound)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: descriptor.limits.clone(),
                label: descriptor.label,
                ..Default::default()
            })
            .await
            .map_err(ContextError::DeviceRequestFailed)?;

        tracing::info!(
            adapter = %adapter.get_info().name,
            backend = ?adapter.get_info().backend,
            "created graphics context"
        );

        Ok(Arc::new(Self {
            instance,
            adapter,
            device,
            queue,
        }))
    }

    /// Adapter info for the selected GPU.
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Device limits.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }
}

/// Descriptor for configuring graphics context creation.
pub struct GraphicsContextDescriptor {
    /// GPU backends to consider.
    pub backends: wgpu::Backends,
    /// Power preference for adapter selection.
    pub power_preference: wgpu::PowerPreference,
    /// Whether to force the fallback (software) adapter.
    pub force_fallback_adapter: bool,
    /// Required device limits.
    pub limits: wgpu::Limits,
    /// Optional label for debugging.
    pub label: Option<&'static str>,
}

impl Default for GraphicsContextDescriptor {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            limits: wgpu::Limits::default(),
            label: None,
        }
    }
}

impl GraphicsContextDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the power preference.
    pub fn power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    /// Set the backends to use.
    pub fn backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Set the device limits.
    pub fn limits(mut self, limits: wgpu::Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the debug label.
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }
}
