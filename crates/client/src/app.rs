//! Application state and event loop handler.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use vitrine_core::Scene;

use crate::renderer::Renderer;

/// Main application state.
pub struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Scene,
    last_frame: Option<f64>,
    /// Stop after this many rendered frames; `None` runs forever.
    frame_budget: Option<u64>,
    frames_rendered: u64,
}

impl App {
    /// Frames longer than this are clamped (tab was backgrounded, debugger).
    const MAX_FRAME_SECONDS: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            scene: Scene::new(),
            last_frame: None,
            frame_budget: None,
            frames_rendered: 0,
        }
    }

    /// Run for a bounded number of frames, then exit the event loop.
    ///
    /// The render loop never stops on its own in normal use; this is the
    /// cancellation handle a test harness needs.
    pub fn with_frame_budget(frames: u64) -> Self {
        Self {
            frame_budget: Some(frames),
            ..Self::new()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn init_window(&mut self, event_loop: &ActiveEventLoop) {
        use crate::assets;
        use crate::renderer::{environment, gltf_loader};

        let window_attrs = Window::default_attributes()
            .with_title("Vitrine")
            .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("failed to create window"),
        );

        let mut renderer = pollster::block_on(Renderer::new(window.clone()))
            .expect("failed to create renderer");

        // Both loads are independent; each failure is terminal for that asset
        // only and the page keeps rendering.
        let model = assets::load_bytes(assets::MODEL_PATH)
            .and_then(|bytes| Ok(gltf_loader::load_model(&bytes)?));
        match model {
            Ok(data) => {
                renderer.install_model(&data);
                self.scene.attach_model();
            }
            Err(e) => tracing::error!("Failed to load model: {e}"),
        }

        let hdri = assets::load_bytes(assets::HDRI_PATH)
            .and_then(|bytes| Ok(environment::decode_hdr(&bytes)?));
        match hdri {
            Ok(image) => renderer.install_environment(image),
            Err(e) => tracing::warn!("Could not load HDRI: {e}"),
        }

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);

        tracing::info!("Window and renderer initialized");
    }

    #[cfg(target_arch = "wasm32")]
    fn init_window(&mut self, event_loop: &ActiveEventLoop) {
        use winit::platform::web::WindowAttributesExtWebSys;

        let canvas = match crate::wasm::get_canvas() {
            Some(c) => c,
            None => {
                tracing::error!("Canvas not found");
                return;
            }
        };

        let window_attrs = Window::default_attributes()
            .with_title("Vitrine")
            .with_canvas(Some(canvas));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                tracing::error!("Failed to create window: {e}");
                return;
            }
        };

        self.window = Some(window.clone());

        // Renderer construction and both asset loads run as independent
        // async tasks; results come back through thread-local cells.
        crate::wasm::spawn_renderer_init(window);
        crate::wasm::spawn_asset_loads();

        tracing::info!("Window created, initializing renderer...");
    }

    /// Pick up whatever the async tasks have finished since the last event.
    #[cfg(target_arch = "wasm32")]
    fn poll_async_results(&mut self) {
        if self.renderer.is_none() {
            if let Some(mut renderer) = crate::wasm::take_renderer() {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    if size.width > 0 && size.height > 0 {
                        renderer.resize(size);
                    }
                    window.request_redraw();
                }
                self.renderer = Some(renderer);
                tracing::info!("Renderer attached to app");
            }
        }

        // Asset results wait in their cells until the renderer exists.
        if let Some(renderer) = &mut self.renderer {
            if let Some(result) = crate::wasm::take_model() {
                match result {
                    Ok(data) => {
                        renderer.install_model(&data);
                        self.scene.attach_model();
                    }
                    Err(e) => tracing::error!("Failed to load model: {e}"),
                }
            }
            if let Some(result) = crate::wasm::take_environment() {
                match result {
                    Ok(image) => renderer.install_environment(image),
                    Err(e) => tracing::warn!("Could not load HDRI: {e}"),
                }
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = now_seconds();
        let dt = match self.last_frame {
            Some(last) => ((now - last) as f32).clamp(0.0, Self::MAX_FRAME_SECONDS),
            None => 0.0,
        };
        self.last_frame = Some(now);

        self.scene.advance(dt);

        if let Some(renderer) = &mut self.renderer {
            match renderer.render(&self.scene) {
                Ok(()) => {
                    self.frames_rendered += 1;
                    if let Some(budget) = self.frame_budget {
                        if self.frames_rendered >= budget {
                            tracing::info!("Frame budget reached, exiting");
                            event_loop.exit();
                            return;
                        }
                    }
                }
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    if let Some(window) = &self.window {
                        renderer.resize(window.inner_size());
                    }
                }
                Err(
                    wgpu::SurfaceError::OutOfMemory
                    | wgpu::SurfaceError::Timeout
                    | wgpu::SurfaceError::Other,
                ) => {
                    tracing::error!("Fatal render error, exiting");
                    event_loop.exit();
                    return;
                }
            }
        }

        // Keep the loop going at display refresh rate.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.init_window(event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(target_arch = "wasm32")]
        self.poll_async_results();

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(new_size);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.scene.pointer_moved(
                        position.x,
                        position.y,
                        size.width as f64,
                        size.height as f64,
                    );
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }

            _ => {}
        }
    }
}

/// Monotonic seconds since the first call. Wall-clock time would go
/// backwards on an NTP step and zero out the frame delta.
#[cfg(not(target_arch = "wasm32"))]
fn now_seconds() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

#[cfg(target_arch = "wasm32")]
fn now_seconds() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now() / 1000.0)
        .unwrap_or(0.0)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn frame_clock_never_runs_backwards() {
        let mut prev = now_seconds();
        assert!(prev >= 0.0);
        for _ in 0..100 {
            let next = now_seconds();
            assert!(next >= prev);
            prev = next;
        }
    }
}
