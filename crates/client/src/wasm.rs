//! Browser-specific glue: canvas lookup, async bootstrap, result handoff.
//!
//! `winit` event handlers are synchronous but everything interesting on the
//! web is async, so each async task parks its result in a thread-local cell
//! and the app drains the cells from the event loop.

use std::cell::RefCell;
use std::sync::Arc;

use wasm_bindgen::JsCast;
use winit::event_loop::EventLoop;
use winit::platform::web::EventLoopExtWebSys;
use winit::window::Window;

use crate::app::App;
use crate::assets;
use crate::renderer::environment::{self, HdriImage};
use crate::renderer::gltf_loader::{self, ModelData};
use crate::renderer::{surface_scale, Renderer};

thread_local! {
    static RENDERER: RefCell<Option<Renderer>> = RefCell::new(None);
    static MODEL: RefCell<Option<anyhow::Result<ModelData>>> = RefCell::new(None);
    static ENVIRONMENT: RefCell<Option<anyhow::Result<HdriImage>>> = RefCell::new(None);
}

/// Entry point for the browser build.
pub fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    // spawn_app returns immediately; the browser drives the loop from
    // requestAnimationFrame.
    event_loop.spawn_app(App::new());
    Ok(())
}

/// Find the target canvas and size its backing store to the displayed
/// rect, capped at 2x device pixel ratio.
pub(crate) fn get_canvas() -> Option<web_sys::HtmlCanvasElement> {
    let document = web_sys::window()?.document()?;
    let canvas = document
        .get_element_by_id("draw")?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .ok()?;

    let scale = surface_scale(web_sys::window()?.device_pixel_ratio());
    let rect = canvas.get_bounding_client_rect();
    canvas.set_width(((rect.width() * scale) as u32).max(1));
    canvas.set_height(((rect.height() * scale) as u32).max(1));

    Some(canvas)
}

/// Create the renderer on a background task and park it for the app.
pub(crate) fn spawn_renderer_init(window: Arc<Window>) {
    wasm_bindgen_futures::spawn_local(async move {
        match Renderer::new(window.clone()).await {
            Ok(renderer) => {
                RENDERER.with(|cell| *cell.borrow_mut() = Some(renderer));
                // Wake the event loop so the app picks it up.
                window.request_redraw();
            }
            Err(e) => tracing::error!("Failed to create renderer: {e}"),
        }
    });
}

/// Fetch and parse the model and the HDRI as two independent tasks.
pub(crate) fn spawn_asset_loads() {
    wasm_bindgen_futures::spawn_local(async {
        let result = match assets::fetch_bytes(assets::MODEL_PATH).await {
            Ok(bytes) => gltf_loader::load_model(&bytes).map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        MODEL.with(|cell| *cell.borrow_mut() = Some(result));
    });

    wasm_bindgen_futures::spawn_local(async {
        let result = match assets::fetch_bytes(assets::HDRI_PATH).await {
            Ok(bytes) => environment::decode_hdr(&bytes).map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        ENVIRONMENT.with(|cell| *cell.borrow_mut() = Some(result));
    });
}

pub(crate) fn take_renderer() -> Option<Renderer> {
    RENDERER.with(|cell| cell.borrow_mut().take())
}

pub(crate) fn take_model() -> Option<anyhow::Result<ModelData>> {
    MODEL.with(|cell| cell.borrow_mut().take())
}

pub(crate) fn take_environment() -> Option<anyhow::Result<HdriImage>> {
    ENVIRONMENT.with(|cell| cell.borrow_mut().take())
}
