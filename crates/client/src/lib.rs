//! Vitrine client: windowing, rendering, and asset loading.

pub mod app;
pub mod assets;
pub mod renderer;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Run the native client until the window closes.
#[cfg(not(target_arch = "wasm32"))]
pub fn run() -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine=info,wgpu=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let event_loop = winit::event_loop::EventLoop::new()?;
    let mut app = app::App::new();
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Browser entry point, invoked automatically when the module loads.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    if let Err(e) = wasm::run() {
        tracing::error!("Failed to start: {e}");
    }
}
