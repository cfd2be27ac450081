#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    vitrine_client::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Browser builds start through the wasm-bindgen entry point.
}
