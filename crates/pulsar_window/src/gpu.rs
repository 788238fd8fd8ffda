//! GPU renderer backends
//!
//! The coordinator never talks to a graphics API directly. It asks the
//! [`GpuRegistry`] for a renderer matching the API of its context; backends
//! register a [`GpuFactory`] for the APIs they support.
//!
//! # Example
//!
//! ```ignore
//! struct VulkanRenderer;
//!
//! impl GpuFactory for VulkanRenderer {
//!     fn name(&self) -> &str { "vulkan" }
//!     fn supports(&self, api: GpuApi) -> bool { api == GpuApi::Vulkan }
//!     fn create(&self, api: GpuApi) -> Result<Box<dyn Gpu>, ContextError> { ... }
//! }
//!
//! registry.register(Box::new(VulkanRenderer));
//! ```

use glam::IVec2;
use pulsar_input::Ops;

use crate::driver::{GpuApi, RenderTarget};
use crate::error::ContextError;

/// Renderer bound to one context.
pub trait Gpu {
    /// Render `ops` into `target`. Called with the context locked.
    fn frame(&mut self, ops: &Ops, target: RenderTarget, viewport: IVec2) -> Result<(), ContextError>;

    /// Clear the target to `color` before the next frame.
    fn clear(&mut self, color: [f32; 4]);

    /// Free device resources. The context is still alive.
    fn release(&mut self);
}

/// Constructor for renderers of one or more graphics APIs.
pub trait GpuFactory: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, api: GpuApi) -> bool;

    fn create(&self, api: GpuApi) -> Result<Box<dyn Gpu>, ContextError>;
}

/// Registry of renderer backends.
///
/// Factories are tried in registration order; the first one that supports
/// the API and constructs successfully wins.
pub struct GpuRegistry {
    factories: Vec<Box<dyn GpuFactory>>,
}

impl GpuRegistry {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn register(&mut self, factory: Box<dyn GpuFactory>) {
        self.factories.push(factory);
    }

    /// Create a renderer for `api`.
    ///
    /// # Returns
    /// The first renderer constructed, or [`ContextError::NoBackend`] naming
    /// every failed attempt. Device loss is passed through unchanged.
    pub fn create(&self, api: GpuApi) -> Result<Box<dyn Gpu>, ContextError> {
        profiling::profile_scope!("Gpu::create");
        let mut errors = Vec::new();
        for factory in self.factories.iter().filter(|f| f.supports(api)) {
            match factory.create(api) {
                Ok(gpu) => {
                    tracing::debug!(backend = factory.name(), ?api, "created GPU renderer");
                    return Ok(gpu);
                }
                Err(ContextError::DeviceLost) => return Err(ContextError::DeviceLost),
                Err(e) => errors.push(format!("{}: {e}", factory.name())),
            }
        }
        if errors.is_empty() {
            errors.push(format!("no renderer registered for {api:?}"));
        }
        Err(ContextError::NoBackend(errors))
    }
}

impl Default for GpuRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Gpu for Nop {
        fn frame(&mut self, _: &Ops, _: RenderTarget, _: IVec2) -> Result<(), ContextError> {
            Ok(())
        }
        fn clear(&mut self, _: [f32; 4]) {}
        fn release(&mut self) {}
    }

    struct Factory {
        name: &'static str,
        api: GpuApi,
        fail: bool,
    }

    impl GpuFactory for Factory {
        fn name(&self) -> &str {
            self.name
        }
        fn supports(&self, api: GpuApi) -> bool {
            api == self.api
        }
        fn create(&self, _: GpuApi) -> Result<Box<dyn Gpu>, ContextError> {
            if self.fail {
                Err(anyhow::anyhow!("init failed").into())
            } else {
                Ok(Box::new(Nop))
            }
        }
    }

    #[test]
    fn test_first_supporting_factory_wins() {
        let mut r = GpuRegistry::new();
        r.register(Box::new(Factory {
            name: "gl",
            api: GpuApi::OpenGl,
            fail: false,
        }));
        r.register(Box::new(Factory {
            name: "vk-broken",
            api: GpuApi::Vulkan,
            fail: true,
        }));
        r.register(Box::new(Factory {
            name: "vk",
            api: GpuApi::Vulkan,
            fail: false,
        }));
        assert!(r.create(GpuApi::Vulkan).is_ok());
    }

    #[test]
    fn test_unsupported_api_names_itself() {
        let r = GpuRegistry::new();
        match r.create(GpuApi::Metal) {
            Err(ContextError::NoBackend(errs)) => {
                assert_eq!(errs, vec!["no renderer registered for Metal"]);
            }
            _ => panic!("expected NoBackend"),
        }
    }

    #[test]
    fn test_failures_accumulate() {
        let mut r = GpuRegistry::new();
        r.register(Box::new(Factory {
            name: "vk",
            api: GpuApi::Vulkan,
            fail: true,
        }));
        match r.create(GpuApi::Vulkan) {
            Err(ContextError::NoBackend(errs)) => assert_eq!(errs, vec!["vk: init failed"]),
            _ => panic!("expected NoBackend"),
        }
    }
}
