use crate::surface::{BufferHandle, ProgramHandle, RenderSurface, Resource, TextureHandle};

/// Outcome of [`ResourceLedger::release_all`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ReleaseReport {
    pub released: usize,
    pub failed: usize,
}

/// Every surface resource a scene allocated and has not released yet.
///
/// Entries are appended at creation time. An entry leaves the ledger before
/// its release is attempted, so nothing is ever released twice even when the
/// surface reports a failure.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    buffers: Vec<BufferHandle>,
    programs: Vec<ProgramHandle>,
    textures: Vec<TextureHandle>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, resource: impl Into<Resource>) {
        match resource.into() {
            Resource::Buffer(h) => self.buffers.push(h),
            Resource::Program(h) => self.programs.push(h),
            Resource::Texture(h) => self.textures.push(h),
        }
    }

    pub fn buffers(&self) -> &[BufferHandle] {
        &self.buffers
    }

    pub fn programs(&self) -> &[ProgramHandle] {
        &self.programs
    }

    pub fn textures(&self) -> &[TextureHandle] {
        &self.textures
    }

    pub fn len(&self) -> usize {
        self.buffers.len() + self.programs.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, resource: Resource) -> bool {
        match resource {
            Resource::Buffer(h) => self.buffers.contains(&h),
            Resource::Program(h) => self.programs.contains(&h),
            Resource::Texture(h) => self.textures.contains(&h),
        }
    }

    /// Releases one recorded resource ahead of teardown.
    ///
    /// Returns `false` if `resource` was not in the ledger; a surface failure
    /// is logged and still counts as removed.
    pub fn release<S>(&mut self, surface: &mut S, resource: impl Into<Resource>) -> bool
    where
        S: RenderSurface + ?Sized,
    {
        let resource = resource.into();
        if !self.forget(resource) {
            return false;
        }
        if let Err(e) = surface.release(resource) {
            log::warn!("release of {resource:?} failed: {e}");
        }
        true
    }

    /// Releases everything, newest first within each list, and empties the ledger.
    ///
    /// A failing release is logged and skipped; the rest still run.
    pub fn release_all<S>(&mut self, surface: &mut S) -> ReleaseReport
    where
        S: RenderSurface + ?Sized,
    {
        let mut report = ReleaseReport::default();

        let pending = self
            .buffers
            .drain(..)
            .rev()
            .map(Resource::Buffer)
            .chain(self.programs.drain(..).rev().map(Resource::Program))
            .chain(self.textures.drain(..).rev().map(Resource::Texture))
            .collect::<Vec<_>>();

        for resource in pending {
            match surface.release(resource) {
                Ok(()) => report.released += 1,
                Err(e) => {
                    log::warn!("ignoring failed release of {resource:?}: {e}");
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn forget(&mut self, resource: Resource) -> bool {
        fn remove<T: PartialEq>(list: &mut Vec<T>, item: &T) -> bool {
            match list.iter().position(|x| x == item) {
                Some(i) => {
                    list.swap_remove(i);
                    true
                }
                None => false,
            }
        }

        match resource {
            Resource::Buffer(h) => remove(&mut self.buffers, &h),
            Resource::Program(h) => remove(&mut self.programs, &h),
            Resource::Texture(h) => remove(&mut self.textures, &h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;
    use crate::points::PointSet;
    use crate::sprite::SpriteImage;

    fn filled(surface: &mut HeadlessSurface) -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        for label in ["a", "b", "c"] {
            let h = surface.create_point_buffer(label, &PointSet::empty()).unwrap();
            ledger.record(h);
        }
        let t = surface.create_texture("sprite", &SpriteImage::radial(8, [255; 4], 0.3)).unwrap();
        ledger.record(t);
        ledger
    }

    #[test]
    fn release_all_empties_every_list_once() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = filled(&mut surface);
        assert_eq!(ledger.len(), 4);

        let report = ledger.release_all(&mut surface);
        assert_eq!(report, ReleaseReport { released: 4, failed: 0 });
        assert!(ledger.is_empty());
        assert!(ledger.buffers().is_empty() && ledger.programs().is_empty() && ledger.textures().is_empty());
        assert_eq!(surface.live_count(), 0);

        assert_eq!(ledger.release_all(&mut surface), ReleaseReport::default());
        assert_eq!(surface.released_count(), 4);
    }

    #[test]
    fn one_failure_does_not_block_the_rest() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = filled(&mut surface);
        let bad = Resource::Buffer(ledger.buffers()[1]);
        surface.fail_release_of(bad);

        let report = ledger.release_all(&mut surface);
        assert_eq!(report, ReleaseReport { released: 3, failed: 1 });
        assert!(ledger.is_empty());
        assert_eq!(surface.live_count(), 1);
        assert!(surface.is_live(bad));
    }

    #[test]
    fn early_release_is_not_repeated() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = filled(&mut surface);
        let first = ledger.buffers()[0];

        assert!(ledger.release(&mut surface, first));
        assert!(!ledger.release(&mut surface, first));
        assert!(!ledger.contains(first.into()));

        let report = ledger.release_all(&mut surface);
        assert_eq!(report.failed, 0);
        assert_eq!(surface.released_count(), 4);
    }
}
