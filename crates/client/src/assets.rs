//! Asset byte loading.
//!
//! Native builds read from disk; the web build fetches over HTTP. Both
//! assets are loaded independently, in either order, and a failure of one
//! never blocks the other.

/// Model asset path (native) / URL path (web).
#[cfg(not(target_arch = "wasm32"))]
pub const MODEL_PATH: &str = "assets/damaged_helmet.glb";
#[cfg(target_arch = "wasm32")]
pub const MODEL_PATH: &str = "/assets/damaged_helmet.glb";

/// HDRI panorama: local copy natively, Poly Haven CDN on the web.
#[cfg(not(target_arch = "wasm32"))]
pub const HDRI_PATH: &str = "assets/pond_bridge_night_1k.hdr";
#[cfg(target_arch = "wasm32")]
pub const HDRI_PATH: &str =
    "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/pond_bridge_night_1k.hdr";

/// Load raw asset bytes from disk.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_bytes(path: &str) -> anyhow::Result<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

/// Fetch raw asset bytes over HTTP.
#[cfg(target_arch = "wasm32")]
pub async fn fetch_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    fn js_err(value: wasm_bindgen::JsValue) -> anyhow::Error {
        anyhow::anyhow!("{value:?}")
    }

    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let resp_value = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_err)?;
    let resp: web_sys::Response = resp_value.dyn_into().map_err(js_err)?;

    if !resp.ok() {
        anyhow::bail!("HTTP {} {}", resp.status(), resp.status_text());
    }

    let buf_promise = resp.array_buffer().map_err(js_err)?;
    let buf_value = JsFuture::from(buf_promise).await.map_err(js_err)?;
    let bytes = js_sys::Uint8Array::new(&buf_value);
    let mut out = vec![0u8; bytes.length() as usize];
    bytes.copy_to(&mut out);
    Ok(out)
}
