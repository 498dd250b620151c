use std::error::Error;
use std::fs::{self, File};

use corvus_core::component::{Camera, Light, LightKind, Mesh, Primitive, Shape, Transform};
use corvus_core::glam::Vec3;
use corvus_core::{Scene, SceneConfig, NULL_UID};

fn build_scene(config: SceneConfig) -> Result<Scene, Box<dyn Error>> {
    let mut scene = Scene::with_config(config);

    let root = scene.new_entity("World", NULL_UID)?;

    let camera = scene.new_entity("Camera", root)?;
    let transform = scene.entity(camera)?.transform();
    scene.get_mut::<Transform>(transform)?.position = Vec3::new(0.0, 2.0, 8.0);
    scene.add_component::<Camera>(camera)?.1.primary = true;

    let sun = scene.new_entity("Sun", root)?;
    scene.add_component::<Light>(sun)?.1.kind = LightKind::Directional;

    let crate_ = scene.new_entity("Crate", root)?;
    scene.add_component::<Mesh>(crate_)?.1.value = Mesh::new("meshes/crate.mesh", "shaders/standard.glsl");

    let ball = scene.new_entity("Ball", crate_)?;
    scene.add_component::<Primitive>(ball)?.1.shape = Shape::Sphere {
        radius: 0.5,
        rings: 16,
        sectors: 32,
    };

    scene.update();
    Ok(scene)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::from_reader(File::open(path)?)?,
        None => SceneConfig::default(),
    };

    let scene = build_scene(config.clone())?;

    let document = scene.save_tree(None)?;
    let serialized = serde_json::to_string_pretty(&document)?;
    println!("{}", serialized);

    let bytes = scene.save_binary(None)?;
    let path = std::env::temp_dir().join("corvus_scene.bin");
    fs::write(&path, &bytes)?;
    log::info!("wrote {} bytes to {}", bytes.len(), path.display());

    let from_tree = Scene::load_tree(&serde_json::from_str(&serialized)?, config.clone())?;
    let from_binary = Scene::load_binary(&fs::read(&path)?, config)?;

    for loaded in [&from_tree, &from_binary].iter() {
        for (id, entity) in loaded.entities().iter() {
            println!(
                "{:#018x} {:<8} parent {:#018x}, {} component(s)",
                id,
                entity.name,
                entity.parent(),
                entity.handles().len()
            );
        }
    }

    if let Some(ball) = from_binary.entities().find_by_name("Ball") {
        let bounds = from_binary.entity(ball)?.global_bounds;
        println!("Ball bounds: {:?} .. {:?}", bounds.min, bounds.max);
    }

    Ok(())
}
