use corvus_ecs::io::ResourceRef;
use corvus_ecs::Serializable;

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct AudioSource {
    pub clip: Option<ResourceRef>,
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    /// Attenuated by distance to the listener
    pub spatial: bool,
    pub play_on_start: bool,
}

impl Default for AudioSource {
    fn default() -> Self {
        AudioSource {
            clip: None,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            spatial: true,
            play_on_start: false,
        }
    }
}
