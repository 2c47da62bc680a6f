//! Ambient Plugin
//!
//! Native scene plugin with calm background scenes.
//! Built as `libambient.so` / `ambient.dll`, exporting `createAmbient` and
//! `destroyAmbient`.

use sdk::{HostError, Scene, ScenePlugin};
use std::sync::Arc;

/// Scene described by a name and a one-line description
struct AmbientScene {
    name: &'static str,
    description: &'static str,
}

impl Scene for AmbientScene {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }
}

const SCENES: [(&str, &str); 4] = [
    ("star_field", "Stars drifting towards the viewer"),
    ("metablobs", "Slowly merging colour blobs"),
    ("fire", "Classic flame effect"),
    ("clock", "Current time over a dim gradient"),
];

/// The ambient scene collection
pub struct AmbientPlugin {
    scenes: Vec<Arc<dyn Scene>>,
    running: bool,
}

impl Default for AmbientPlugin {
    fn default() -> Self {
        let scenes = SCENES
            .iter()
            .map(|&(name, description)| {
                Arc::new(AmbientScene { name, description }) as Arc<dyn Scene>
            })
            .collect();
        Self {
            scenes,
            running: false,
        }
    }
}

impl AmbientPlugin {
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl ScenePlugin for AmbientPlugin {
    fn name(&self) -> &str {
        "Ambient Scenes"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn start(&mut self) -> Result<(), HostError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HostError> {
        self.running = false;
        Ok(())
    }

    fn scenes(&self) -> Vec<Arc<dyn Scene>> {
        self.scenes.clone()
    }
}

sdk::export_plugin!("createAmbient", "destroyAmbient", AmbientPlugin::default);
