use glam::Vec3;

use corvus_ecs::Serializable;

#[derive(Serializable, Clone, Debug, PartialEq)]
pub enum LightKind {
    Directional,
    Point { range: f32 },
    /// Cone angles are in degrees
    Spot { range: f32, inner_angle: f32, outer_angle: f32 },
}

impl Default for LightKind {
    fn default() -> Self {
        LightKind::Directional
    }
}

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
}

impl Default for Light {
    fn default() -> Self {
        Light {
            kind: LightKind::default(),
            color: Vec3::ONE,
            intensity: 1.0,
            cast_shadows: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component::assert_round_trips;

    #[test]
    fn every_kind_round_trips() {
        let kinds = vec![
            LightKind::Directional,
            LightKind::Point { range: 12.0 },
            LightKind::Spot { range: 20.0, inner_angle: 15.0, outer_angle: 30.0 },
        ];

        for kind in kinds {
            assert_round_trips(&Light {
                kind,
                color: Vec3::new(1.0, 0.8, 0.6),
                intensity: 3.5,
                cast_shadows: true,
            });
        }
    }
}
