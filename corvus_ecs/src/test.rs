use glam::Vec3;

use crate::io::ResourceRef;
use crate::Serializable;

#[derive(Clone, PartialEq, Default, Serializable, Debug)]
pub struct CompX {
    pub f: String,
}

impl CompX {
    pub fn new(s: &str) -> CompX {
        CompX {
            f: s.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Serializable, Debug)]
pub enum Shape {
    Point,
    Sphere { radius: f32 },
    Box(Vec3),
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Point
    }
}

#[derive(Clone, PartialEq, Default, Serializable, Debug)]
pub struct CompY {
    pub name: String,
    pub shape: Shape,
    pub texture: Option<ResourceRef>,
    pub extra: Vec<ResourceRef>,
    #[serializable(skip)]
    pub cached: u32,
}

#[derive(Clone, PartialEq, Default, Serializable, Debug)]
pub struct Pair(pub u8, pub i64);
