//! Components that compete for an entity's single render geometry slot.

use glam::{Vec2, Vec3, Vec4};

use corvus_ecs::io::ResourceRef;
use corvus_ecs::Serializable;

use crate::bounds::Aabb;

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Mesh {
    pub mesh: Option<ResourceRef>,
    pub shader: Option<ResourceRef>,
    pub textures: Vec<ResourceRef>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
}

impl Default for Mesh {
    fn default() -> Self {
        Mesh {
            mesh: None,
            shader: None,
            textures: Vec::new(),
            cast_shadows: true,
            receive_shadows: true,
        }
    }
}

impl Mesh {
    pub fn new<M: Into<ResourceRef>, S: Into<ResourceRef>>(mesh: M, shader: S) -> Mesh {
        Mesh {
            mesh: Some(mesh.into()),
            shader: Some(shader.into()),
            ..Mesh::default()
        }
    }
}

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Water {
    pub size: Vec2,
    pub wave_height: f32,
    pub wave_length: f32,
    pub wave_speed: f32,
    pub color: Vec4,
    pub shader: Option<ResourceRef>,
    pub normal_map: Option<ResourceRef>,
}

impl Default for Water {
    fn default() -> Self {
        Water {
            size: Vec2::new(10.0, 10.0),
            wave_height: 0.2,
            wave_length: 2.0,
            wave_speed: 1.0,
            color: Vec4::new(0.1, 0.3, 0.5, 0.8),
            shader: None,
            normal_map: None,
        }
    }
}

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct ParticleEmitter {
    pub max_particles: u32,
    /// Particles per second
    pub emission_rate: f32,
    /// Seconds
    pub lifetime: f32,
    pub start_size: f32,
    pub end_size: f32,
    pub start_color: Vec4,
    pub end_color: Vec4,
    pub velocity: Vec3,
    pub spread: f32,
    pub looping: bool,
    pub texture: Option<ResourceRef>,
}

impl Default for ParticleEmitter {
    fn default() -> Self {
        ParticleEmitter {
            max_particles: 1000,
            emission_rate: 50.0,
            lifetime: 2.0,
            start_size: 0.1,
            end_size: 0.0,
            start_color: Vec4::ONE,
            end_color: Vec4::new(1.0, 1.0, 1.0, 0.0),
            velocity: Vec3::Y,
            spread: 0.2,
            looping: true,
            texture: None,
        }
    }
}

#[derive(Serializable, Clone, Debug, PartialEq)]
pub enum Shape {
    Cube { size: Vec3 },
    Sphere { radius: f32, rings: u32, sectors: u32 },
    Plane { size: Vec2 },
    Cylinder { radius: f32, height: f32, segments: u32 },
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Cube { size: Vec3::ONE }
    }
}

impl Shape {
    /// Bounds in the owner's local space.
    pub fn local_bounds(&self) -> Aabb {
        match *self {
            Shape::Cube { size } => Aabb::from_half_extents(0.5 * size),
            Shape::Sphere { radius, .. } => Aabb::from_half_extents(Vec3::splat(radius)),
            Shape::Plane { size } => Aabb::from_half_extents(Vec3::new(0.5 * size.x, 0.0, 0.5 * size.y)),
            Shape::Cylinder { radius, height, .. } => {
                Aabb::from_half_extents(Vec3::new(radius, 0.5 * height, radius))
            }
        }
    }
}

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub color: Vec4,
    pub shader: Option<ResourceRef>,
}

impl Default for Primitive {
    fn default() -> Self {
        Primitive {
            shape: Shape::default(),
            color: Vec4::ONE,
            shader: None,
        }
    }
}

#[cfg(test)]
mod test {
    use corvus_ecs::io::{from_bytes, to_bytes, RemapTable, Serializable};

    use super::*;
    use crate::component::assert_round_trips;

    #[test]
    fn shape_bounds() {
        assert_eq!(
            Shape::Cube { size: Vec3::new(2.0, 4.0, 6.0) }.local_bounds(),
            Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(
            Shape::Plane { size: Vec2::new(4.0, 2.0) }.local_bounds(),
            Aabb::new(Vec3::new(-2.0, 0.0, -1.0), Vec3::new(2.0, 0.0, 1.0))
        );
    }

    #[test]
    fn every_shape_variant_sizes_match() {
        let remap = RemapTable::new();
        let shapes = vec![
            Shape::Cube { size: Vec3::ONE },
            Shape::Sphere { radius: 1.0, rings: 16, sectors: 32 },
            Shape::Plane { size: Vec2::ONE },
            Shape::Cylinder { radius: 0.5, height: 2.0, segments: 12 },
        ];

        for shape in shapes {
            let primitive = Primitive { shape, ..Primitive::default() };
            let bytes = to_bytes(&primitive, &remap).unwrap();

            assert_eq!(bytes.len(), primitive.binary_size());
            assert_eq!(from_bytes::<Primitive>(&bytes, &remap).unwrap(), primitive);
        }
    }

    #[test]
    fn mesh_resources_are_remapped() {
        let mesh = Mesh {
            textures: vec!["textures/a.png".into(), "textures/b.png".into()],
            ..Mesh::new("meshes/ferris.mesh", "shaders/standard.glsl")
        };

        let mut remap = RemapTable::new();
        mesh.intern_resources(&mut remap);
        assert_eq!(remap.len(), 4);

        let tree = mesh.write_tree(&remap).unwrap();
        assert_eq!(tree["mesh"], 0);
        assert_eq!(tree["textures"], serde_json::json!([2, 3]));

        assert_eq!(Mesh::read_tree(&tree, Mesh::default(), &remap).unwrap(), mesh);
    }

    #[test]
    fn water_round_trips() {
        assert_round_trips(&Water::default());
        assert_round_trips(&Water {
            size: Vec2::new(64.0, 32.0),
            wave_height: 0.5,
            color: Vec4::new(0.0, 0.2, 0.4, 0.9),
            shader: Some("shaders/water.glsl".into()),
            normal_map: Some("textures/water_normal.png".into()),
            ..Water::default()
        });
    }

    #[test]
    fn particle_emitter_round_trips() {
        assert_round_trips(&ParticleEmitter::default());
        assert_round_trips(&ParticleEmitter {
            max_particles: 250,
            emission_rate: 10.0,
            end_color: Vec4::new(1.0, 0.5, 0.0, 0.0),
            velocity: Vec3::new(0.0, 3.0, 0.5),
            looping: false,
            texture: Some("textures/spark.png".into()),
            ..ParticleEmitter::default()
        });
    }
}
