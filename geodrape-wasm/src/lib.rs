use js_sys::Float64Array;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;
use web_time::Instant;

use geodrape::config::OverlayConfig;
use geodrape::geo::LatLng;
use geodrape::math::general_projection as core_general_projection;
use geodrape::overlay::surface::HeadlessSurface;
use geodrape::overlay::{OverlayEvent, ProjectiveOverlay, Recompute};
use geodrape::viewport::WebMercator;

// ── Tsify types for TypeScript interface generation ──

/// Map view passed from JavaScript.
#[derive(Tsify, Serialize, Deserialize)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct WasmView {
    /// `[lat, lng]` at the middle of the map.
    pub center: [f64; 2],
    pub zoom: f64,
    /// Map container size in pixels.
    pub width: f64,
    pub height: f64,
}

/// Result of placing the image, returned to JavaScript.
#[derive(Tsify, Serialize, Deserialize)]
#[tsify(into_wasm_abi)]
pub struct WasmPlacement {
    /// "applied", "degraded" or "skipped".
    pub outcome: String,
    /// Layer position of the image's top-left pixel.
    pub origin: Option<[f64; 2]>,
    /// Column-major 4x4 matrix for CSS `matrix3d`.
    pub matrix: Option<Vec<f64>>,
    /// Complete CSS `transform` value.
    pub css: Option<String>,
    pub error: Option<String>,
    /// The renderer was found to lack 3D transforms during this call.
    pub degraded_mode: bool,
}

fn points<const N: usize>(name: &str, flat: &[f64]) -> Result<[[f64; 2]; N], JsError> {
    if flat.len() != N * 2 {
        return Err(JsError::new(&format!(
            "{name} must hold {} numbers, got {}",
            N * 2,
            flat.len(),
        )));
    }
    Ok(std::array::from_fn(|i| [flat[2 * i], flat[2 * i + 1]]))
}

/// Solve the homography carrying four source points onto four destination
/// points. Both arguments are flat `[x0, y0, x1, y1, ...]` arrays; the result
/// is the 3x3 matrix in row-major order, normalized so the last entry is 1.
#[wasm_bindgen(js_name = generalProjection)]
pub fn general_projection(src: &[f64], dst: &[f64]) -> Result<Float64Array, JsError> {
    let src = points::<4>("src", src)?;
    let dst = points::<4>("dst", dst)?;
    let h = core_general_projection(&src, &dst).map_err(|e| JsError::new(&e.to_string()))?;
    let flat: Vec<f64> = h.data.iter().flatten().copied().collect();
    Ok(Float64Array::from(&flat[..]))
}

// ── Overlay wrapper ──

/// An image draped onto four map corners, for use from JavaScript/TypeScript.
///
/// The host owns the DOM element: it applies `css` from each placement as the
/// element's transform (with `transform-origin: 0 0 0`), calls `attach` and
/// `detach` as the element enters and leaves the map, and polls `pulseTick`
/// every `pulseInterval` milliseconds.
#[wasm_bindgen]
pub struct DrapeOverlay {
    inner: ProjectiveOverlay<HeadlessSurface>,
    view: WebMercator,
}

#[wasm_bindgen]
impl DrapeOverlay {
    #[wasm_bindgen(constructor)]
    pub fn new(supports_3d: bool) -> DrapeOverlay {
        let surface = HeadlessSurface {
            supports_3d,
            ..HeadlessSurface::default()
        };
        DrapeOverlay {
            inner: ProjectiveOverlay::new(surface, OverlayConfig::default()),
            view: WebMercator::new(0.0, kurbo::Point::ZERO),
        }
    }

    /// The element was added to the map. Starts the pulse.
    pub fn attach(&mut self) {
        self.attach_at(Instant::now());
    }

    /// The element was removed from the map. Stops the pulse.
    pub fn detach(&mut self) {
        self.inner.detach();
    }

    #[wasm_bindgen(getter, js_name = isAttached)]
    pub fn is_attached(&self) -> bool {
        self.inner.is_attached()
    }

    /// Record the current map view. The image follows it on `moveEnd`.
    #[wasm_bindgen(js_name = setView)]
    pub fn set_view(&mut self, view: WasmView) {
        self.view = WebMercator::centered(
            LatLng::from(view.center),
            view.zoom,
            Size::new(view.width, view.height),
        );
    }

    /// The map finished panning or zooming.
    #[wasm_bindgen(js_name = moveEnd)]
    pub fn move_end(&mut self) -> Result<JsValue, JsError> {
        let out = self.inner.on_move_end(&self.view);
        self.to_js(out)
    }

    /// The image finished loading and knows its natural size.
    #[wasm_bindgen(js_name = setImageSize)]
    pub fn set_image_size(&mut self, width: f64, height: f64) -> Result<JsValue, JsError> {
        self.inner.surface_mut().size = Some(Size::new(width, height));
        let out = self.inner.refresh(&self.view);
        self.to_js(out)
    }

    /// Replace the corners: eight numbers, `[lat, lng]` for top-left,
    /// top-right, bottom-right, bottom-left.
    #[wasm_bindgen(js_name = setCorners)]
    pub fn set_corners(&mut self, corners: &[f64]) -> Result<JsValue, JsError> {
        let corners = points::<4>("corners", corners)?.map(LatLng::from);
        let out = self.inner.set_corners(corners, &self.view);
        self.to_js(out)
    }

    /// Current corners, flat, in the order `setCorners` takes them.
    pub fn corners(&self) -> Float64Array {
        let flat: Vec<f64> = self
            .inner
            .corners()
            .iter()
            .flat_map(|ll| [ll.lat, ll.lng])
            .collect();
        Float64Array::from(&flat[..])
    }

    /// CSS transform of the last applied placement.
    #[wasm_bindgen(js_name = cssTransform)]
    pub fn css_transform(&self) -> Option<String> {
        self.inner.placement().map(|p| p.css_transform())
    }

    /// Next opacity for the pulse animation, or `undefined` when detached or
    /// not yet due.
    #[wasm_bindgen(js_name = pulseTick)]
    pub fn pulse_tick(&mut self) -> Option<f64> {
        self.pulse_tick_at(Instant::now())
    }

    /// Milliseconds between `pulseTick` calls.
    #[wasm_bindgen(js_name = pulseInterval)]
    pub fn pulse_interval(&self) -> f64 {
        self.inner.config().pulse_interval.as_secs_f64() * 1000.0
    }
}

impl DrapeOverlay {
    fn attach_at(&mut self, now: Instant) {
        self.inner.attach(now);
    }

    fn pulse_tick_at(&mut self, now: Instant) -> Option<f64> {
        self.inner.poll_pulse(now)
    }

    fn to_js(&mut self, out: Recompute) -> Result<JsValue, JsError> {
        let degraded_mode = self
            .inner
            .drain_events()
            .contains(&OverlayEvent::DegradedMode);
        let placement = placement_to_wasm(&out, degraded_mode);
        serde_wasm_bindgen::to_value(&placement).map_err(|e| JsError::new(&e.to_string()))
    }
}

fn placement_to_wasm(out: &Recompute, degraded_mode: bool) -> WasmPlacement {
    let (outcome, error) = match out {
        Recompute::Applied(_) => ("applied", None),
        Recompute::Degraded(_) => ("degraded", None),
        Recompute::Skipped(err) => ("skipped", Some(err.to_string())),
    };
    let placement = out.placement();
    WasmPlacement {
        outcome: outcome.to_owned(),
        origin: placement.map(|p| [p.origin.x, p.origin.y]),
        matrix: placement.and_then(|p| p.warp).map(|m| m.to_vec()),
        css: placement.map(|p| p.css_transform()),
        error,
        degraded_mode,
    }
}
