use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::backend::{GraphicsBackend, WgpuBackend};
use crate::config::AppConfig;
use crate::error::{RenderError, Result};
use crate::input::PanTracker;
use crate::orchestrator::FrameOrchestrator;
use crate::scene::Scene;

type BuildSceneFn = Box<dyn FnOnce(&mut dyn GraphicsBackend) -> Result<Scene>>;

/// Opens a window and renders the scene built by `build_scene` until the
/// window is closed.
///
/// `build_scene` runs once the GPU is up, with the backend its meshes and
/// textures must be uploaded to. Startup failures and fatal frame errors
/// close the window and are returned.
///
/// # Example
/// ```ignore
/// scenestack::run(AppConfig::new().title("Aquarium"), |backend| {
///     scenestack::demo::aquarium(backend, &AssetLoader::new("assets"))
/// })?;
/// ```
pub fn run<F>(config: AppConfig, build_scene: F) -> Result<()>
where
    F: FnOnce(&mut dyn GraphicsBackend) -> Result<Scene> + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = SceneApp::Pending {
        config,
        build_scene: Some(Box::new(build_scene)),
    };
    event_loop.run_app(&mut app)?;

    match app {
        SceneApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

enum SceneApp {
    Pending {
        config: AppConfig,
        build_scene: Option<BuildSceneFn>,
    },
    Running {
        window: Arc<Window>,
        backend: WgpuBackend,
        orchestrator: FrameOrchestrator,
        pan: PanTracker,
    },
    Failed(RenderError),
}

impl SceneApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        build_scene: BuildSceneFn,
    ) -> Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let mut backend = WgpuBackend::new(window.clone(), config.renderer.in_flight_frames)?;
        backend.set_clear_color(config.renderer.clear_color);

        let scene = build_scene(&mut backend)?;
        let orchestrator = FrameOrchestrator::new(&mut backend, scene, config.renderer.clone())?;

        let mut pan = PanTracker::default();
        pan.set_view_width(window.inner_size().width);

        Ok(SceneApp::Running {
            window,
            backend,
            orchestrator,
            pan,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        log::error!("{}", err);
        *self = SceneApp::Failed(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for SceneApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let SceneApp::Pending {
            config,
            build_scene,
        } = self
        else {
            return;
        };
        let Some(build_scene) = build_scene.take() else {
            return;
        };

        match SceneApp::start(event_loop, config, build_scene) {
            Ok(running) => {
                if let SceneApp::Running { window, .. } = &running {
                    window.request_redraw();
                }
                *self = running;
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let SceneApp::Running {
            window,
            backend,
            orchestrator,
            pan,
        } = self
        else {
            return;
        };

        pan.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                backend.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                orchestrator.add_pan_delta(pan.take_delta());
                match orchestrator.tick(backend) {
                    // skipped and dropped frames are logged by the orchestrator
                    Ok(_) => window.request_redraw(),
                    Err(err) => self.fail(event_loop, err),
                }
            }
            _ => {}
        }
    }
}
