use scenestack::{AssetLoader, demo};

/// Directory searched for meshes and textures when `SCENESTACK_ASSETS` is unset.
const DEFAULT_ASSET_DIR: &str = "assets";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let which = std::env::args().nth(1).unwrap_or_else(|| "aquarium".to_string());
    let asset_dir =
        std::env::var("SCENESTACK_ASSETS").unwrap_or_else(|_| DEFAULT_ASSET_DIR.to_string());
    let loader = AssetLoader::new(asset_dir);
    if !loader.is_available() {
        log::warn!(
            "Asset directory {} not found, using procedural stand-ins",
            loader.root().display()
        );
    }

    let result = match which.as_str() {
        "aquarium" => scenestack::run(demo::aquarium_config(), move |backend| {
            demo::aquarium(backend, &loader)
        }),
        "cubes" => scenestack::run(demo::cubes_config(), move |backend| {
            demo::cubes(backend, &loader)
        }),
        other => {
            log::error!("Unknown demo '{}', expected 'aquarium' or 'cubes'", other);
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
