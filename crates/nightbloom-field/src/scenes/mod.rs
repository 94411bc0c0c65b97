//! Scene builders: turn a validated config into layers, an optional
//! transient emitter and a camera.

mod cone_tree;
mod sakura;
mod starry;

use rand::Rng;

use crate::config::{CameraConfig, FieldConfig, SceneKind};
use crate::emitter::TransientEmitter;
use crate::error::Result;
use crate::layer::Layer;
use crate::ledger::ResourceLedger;
use crate::points::PointSet;
use crate::program::ProgramPrototype;
use crate::sprite::SpriteImage;
use crate::surface::{RenderSurface, TextureHandle};

/// Everything a scene contributes to a [`SceneContext`](crate::SceneContext).
#[derive(Debug)]
pub struct SceneParts {
    pub layers: Vec<Layer>,
    pub emitter: Option<TransientEmitter>,
    pub camera: CameraConfig,
    /// Linear RGBA background.
    pub clear: [f32; 4],
}

/// Allocation helpers that record everything in the ledger.
pub(crate) struct Builder<'a, S: ?Sized, R: ?Sized> {
    pub surface: &'a mut S,
    pub ledger: &'a mut ResourceLedger,
    pub rng: &'a mut R,
}

impl<S, R> Builder<'_, S, R>
where
    S: RenderSurface + ?Sized,
    R: Rng + ?Sized,
{
    pub fn texture(&mut self, label: &str, image: &SpriteImage) -> Result<TextureHandle> {
        let h = self.surface.create_texture(label, image)?;
        self.ledger.record(h);
        Ok(h)
    }

    pub fn layer(
        &mut self,
        label: &str,
        points: PointSet,
        prototype: &ProgramPrototype,
        texture: Option<TextureHandle>,
    ) -> Result<Layer> {
        Layer::build(&mut *self.surface, &mut *self.ledger, label, points, prototype, texture)
    }
}

/// Builds the scene selected by `config.scene`.
///
/// On error, whatever was allocated so far is still in `ledger`; the caller
/// owns releasing it.
pub fn build<S, R>(
    config: &FieldConfig,
    surface: &mut S,
    ledger: &mut ResourceLedger,
    rng: &mut R,
) -> Result<SceneParts>
where
    S: RenderSurface + ?Sized,
    R: Rng + ?Sized,
{
    let mut b = Builder { surface, ledger, rng };
    match config.scene {
        SceneKind::Starry => starry::build(&config.starry, &mut b),
        SceneKind::Sakura => sakura::build(&config.sakura, &mut b),
        SceneKind::ConeTree => cone_tree::build(&config.cone_tree, &mut b),
    }
}
