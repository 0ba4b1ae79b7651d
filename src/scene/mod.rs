pub mod camera;
pub mod frustum;
pub mod light;
pub mod mesh;
pub mod transform;

use hecs::{Entity, World};

use crate::{
    gpu::{Shared, texture::Texture},
    rhi::device::GlDevice,
};

use self::transform::{MTransform, Transform};

/// Diffuse + specular material with a scalar shininess. Either slot may be
/// empty, in which case the stage substitutes the context default texture.
#[derive(Debug)]
pub struct MaterialDs<D: GlDevice> {
    pub diffuse: Option<Shared<Texture<D>>>,
    pub specular: Option<Shared<Texture<D>>>,
    pub shininess: f32,
}

impl<D: GlDevice> Default for MaterialDs<D> {
    fn default() -> Self {
        Self {
            diffuse: None,
            specular: None,
            shininess: 128.0,
        }
    }
}

impl<D: GlDevice> Clone for MaterialDs<D> {
    fn clone(&self) -> Self {
        Self {
            diffuse: self.diffuse.clone(),
            specular: self.specular.clone(),
            shininess: self.shininess,
        }
    }
}

/// Adding this next to [`MaterialDs`] turns the entity into a DSN material
/// drawn by the normal-mapped geometry loop.
#[derive(Debug)]
pub struct MaterialNormal<D: GlDevice> {
    pub normal: Shared<Texture<D>>,
}

impl<D: GlDevice> Clone for MaterialNormal<D> {
    fn clone(&self) -> Self {
        Self {
            normal: self.normal.clone(),
        }
    }
}

/// Marks a light as a shadow caster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowCasting;

/// Marks a mesh whose diffuse alpha must be sampled for cutoff during
/// shadow-map drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlphaTested;

/// Excludes a mesh from the directional cascade shadow passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CulledFromCsm;

/// World matrix becomes `parent transform ∘ local transform`. Parents are
/// referenced by entity id; a dangling parent falls back to the local
/// transform alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildMesh {
    pub parent: Entity,
}

/// Resolves the world-space matrix pair of an entity, respecting
/// [`ChildMesh`].
pub fn world_mtransform(world: &World, entity: Entity, transform: &Transform) -> MTransform {
    if let Ok(child) = world.get::<&ChildMesh>(entity) {
        if let Ok(parent) = world.get::<&Transform>(child.parent) {
            return parent.mtransform() * transform.mtransform();
        }
    }
    transform.mtransform()
}

/// `true` when the entity currently has the component `T`.
pub fn has_component<T: hecs::Component>(world: &World, entity: Entity) -> bool {
    world
        .entity(entity)
        .map(|entity| entity.has::<T>())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn child_mesh_composes_with_parent() {
        let mut world = World::new();
        let parent = world.spawn((Transform::from_position(Vec3::new(0.0, 3.0, 0.0)),));
        let local = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let child = world.spawn((local, ChildMesh { parent }));

        let world_mt = world_mtransform(&world, child, &local);
        let position = world_mt.model().transform_point3(Vec3::ZERO);
        assert!(position.abs_diff_eq(Vec3::new(1.0, 3.0, 0.0), 1e-5));
    }

    #[test]
    fn dangling_parent_falls_back_to_local() {
        let mut world = World::new();
        let parent = world.spawn((Transform::from_position(Vec3::ONE),));
        world.despawn(parent).unwrap();

        let local = Transform::from_position(Vec3::new(2.0, 0.0, 0.0));
        let child = world.spawn((local, ChildMesh { parent }));

        let world_mt = world_mtransform(&world, child, &local);
        assert!(world_mt.model().abs_diff_eq(local.mtransform().model(), 1e-6));
    }
}
