//! Offscreen pick target ownership and sizing.

use crate::device::{PassKind, PickDevice, PickTarget};
use crate::error::Result;

/// The offscreen targets used by picking passes.
///
/// Created lazily on the first pick, resized to the drawable surface at the
/// start of every pick (a no-op when the size is unchanged), and released
/// together on teardown. The float depth-value target exists only when the
/// device supports it; its absence disables 3D-depth unprojection.
#[derive(Default)]
pub struct PickTargets {
    index: Option<Box<dyn PickTarget>>,
    depth: Option<Box<dyn PickTarget>>,
    /// Float-target support, probed once on first ensure.
    float_support: Option<bool>,
}

impl PickTargets {
    /// Creates an empty target set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the targets if needed and sizes them to the current surface.
    pub fn ensure(&mut self, device: &dyn PickDevice, width: u32, height: u32) -> Result<()> {
        if self.index.is_none() {
            self.index = Some(device.create_target(PassKind::Index)?);

            let float_support = *self
                .float_support
                .get_or_insert_with(|| device.supports_float_picking());
            if float_support {
                self.depth = Some(device.create_target(PassKind::Depth)?);
            } else {
                log::debug!("float pick target unsupported; 3D depth sampling disabled");
            }
        }

        if let Some(target) = self.index.as_mut() {
            if target.size() != (width, height) {
                device.resize_target(target.as_mut(), width, height)?;
            }
        }
        if let Some(target) = self.depth.as_mut() {
            if target.size() != (width, height) {
                device.resize_target(target.as_mut(), width, height)?;
            }
        }
        Ok(())
    }

    /// The index-color target, if created.
    pub fn index_target_mut(&mut self) -> Option<&mut Box<dyn PickTarget>> {
        self.index.as_mut()
    }

    /// The float depth-value target, if created and supported.
    pub fn depth_target_mut(&mut self) -> Option<&mut Box<dyn PickTarget>> {
        self.depth.as_mut()
    }

    /// Whether 3D-depth sampling is available.
    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    /// Size of the index target, if created.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.index.as_ref().map(|t| t.size())
    }

    /// Releases both targets.
    pub fn teardown(&mut self) {
        self.index = None;
        self.depth = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DevicePixelRange, PassEncoder, PixelBuffer};
    use crate::error::PickingError;
    use crate::rect::Rect;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTarget {
        size: (u32, u32),
    }

    impl PickTarget for CountingTarget {
        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct CountingDevice {
        float_support: bool,
        creates: AtomicUsize,
        resizes: AtomicUsize,
        probes: AtomicUsize,
    }

    impl CountingDevice {
        fn new(float_support: bool) -> Self {
            Self {
                float_support,
                creates: AtomicUsize::new(0),
                resizes: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
            }
        }
    }

    impl PickDevice for CountingDevice {
        fn surface_size(&self) -> (u32, u32) {
            (64, 64)
        }

        fn pixel_ratio(&self) -> f32 {
            1.0
        }

        fn supports_float_picking(&self) -> bool {
            self.probes.fetch_add(1, Ordering::Relaxed);
            self.float_support
        }

        fn create_target(&self, _kind: PassKind) -> Result<Box<dyn PickTarget>> {
            self.creates.fetch_add(1, Ordering::Relaxed);
            Ok(Box::new(CountingTarget { size: (0, 0) }))
        }

        fn resize_target(
            &self,
            target: &mut dyn PickTarget,
            width: u32,
            height: u32,
        ) -> Result<()> {
            self.resizes.fetch_add(1, Ordering::Relaxed);
            let target = target
                .as_any_mut()
                .downcast_mut::<CountingTarget>()
                .ok_or(PickingError::TargetUnavailable("wrong target type"))?;
            target.size = (width, height);
            Ok(())
        }

        fn begin_pick_pass(
            &self,
            _target: &mut dyn PickTarget,
            _kind: PassKind,
            _target_rect: Rect,
        ) -> Result<Box<dyn PassEncoder>> {
            Err(PickingError::Render("not drawable".to_string()))
        }

        fn end_pick_pass(
            &self,
            _target: &mut dyn PickTarget,
            _encoder: Box<dyn PassEncoder>,
        ) -> Result<()> {
            Ok(())
        }

        fn to_device_pixels(&self, x: f32, y: f32) -> DevicePixelRange {
            #[allow(clippy::cast_possible_truncation)]
            DevicePixelRange {
                x: x as i64,
                y: 63 - y as i64,
                width: 1,
                height: 1,
            }
        }

        fn read_pixels(
            &self,
            _target: &dyn PickTarget,
            _rect: Rect,
            _kind: PassKind,
        ) -> Result<PixelBuffer> {
            Ok(PixelBuffer::Index(Vec::new()))
        }
    }

    #[test]
    fn lazy_creation_and_idempotent_resize() {
        let device = CountingDevice::new(true);
        let mut targets = PickTargets::new();

        targets.ensure(&device, 64, 64).unwrap();
        assert_eq!(device.creates.load(Ordering::Relaxed), 2);
        assert_eq!(device.resizes.load(Ordering::Relaxed), 2);
        assert!(targets.has_depth());

        // Unchanged size must not touch the device.
        targets.ensure(&device, 64, 64).unwrap();
        assert_eq!(device.creates.load(Ordering::Relaxed), 2);
        assert_eq!(device.resizes.load(Ordering::Relaxed), 2);

        targets.ensure(&device, 128, 32).unwrap();
        assert_eq!(device.resizes.load(Ordering::Relaxed), 4);
        assert_eq!(targets.size(), Some((128, 32)));
    }

    #[test]
    fn missing_float_support_skips_depth_target() {
        let device = CountingDevice::new(false);
        let mut targets = PickTargets::new();

        targets.ensure(&device, 64, 64).unwrap();
        assert_eq!(device.creates.load(Ordering::Relaxed), 1);
        assert!(!targets.has_depth());
    }

    #[test]
    fn float_support_probed_once() {
        let device = CountingDevice::new(true);
        let mut targets = PickTargets::new();

        targets.ensure(&device, 64, 64).unwrap();
        targets.teardown();
        targets.ensure(&device, 64, 64).unwrap();
        assert_eq!(device.probes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn teardown_releases_both() {
        let device = CountingDevice::new(true);
        let mut targets = PickTargets::new();
        targets.ensure(&device, 64, 64).unwrap();
        targets.teardown();
        assert!(targets.size().is_none());
        assert!(!targets.has_depth());
    }
}
