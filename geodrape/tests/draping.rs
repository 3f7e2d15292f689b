/// End-to-end draping: drawn polygon → session → overlay → placement on a
/// web-mercator viewport.
use kurbo::Size;
use web_time::Instant;

use geodrape::config::OverlayConfig;
use geodrape::controller::{ControllerEffect, ControllerInput, PolygonId};
use geodrape::error::{Degeneracy, DrapeError};
use geodrape::geo::LatLng;
use geodrape::math::homography::from_render_matrix;
use geodrape::overlay::surface::HeadlessSurface;
use geodrape::overlay::{OverlayEvent, ProjectiveOverlay, Recompute};
use geodrape::ring::Ring;
use geodrape::session::{DrapeSession, DrawEvent};
use geodrape::viewport::{Projection, WebMercator};

/// A field near Utrecht, logical order: TL, TR, BR, BL.
fn field() -> [LatLng; 4] {
    [
        LatLng::new(52.0910, 5.1210),
        LatLng::new(52.0915, 5.1260),
        LatLng::new(52.0880, 5.1265),
        LatLng::new(52.0876, 5.1205),
    ]
}

fn view(zoom: f64) -> WebMercator {
    WebMercator::centered(LatLng::new(52.0895, 5.1235), zoom, Size::new(800.0, 600.0))
}

fn session(surface: HeadlessSurface) -> DrapeSession<HeadlessSurface> {
    DrapeSession::new(ProjectiveOverlay::new(surface, OverlayConfig::default()))
}

/// Apply a placement to an image pixel, giving a layer point.
fn place_pixel(overlay: &ProjectiveOverlay<HeadlessSurface>, x: f64, y: f64) -> (f64, f64) {
    let placement = overlay.placement().unwrap();
    let m = from_render_matrix(&placement.warp.unwrap());
    let w = m[2][0] * x + m[2][1] * y + m[2][2];
    (
        (m[0][0] * x + m[0][1] * y + m[0][2]) / w + placement.origin.x,
        (m[1][0] * x + m[1][1] * y + m[1][2]) / w + placement.origin.y,
    )
}

fn assert_image_on_corners(overlay: &ProjectiveOverlay<HeadlessSurface>, view: &WebMercator) {
    let size = overlay.last_size();
    let (w, h) = (size.width, size.height);
    let [tl, tr, br, bl] = overlay.corners();
    let expected = [(0.0, 0.0, tl), (w, 0.0, tr), (w, h, br), (0.0, h, bl)];
    for (x, y, ll) in expected {
        let (px, py) = place_pixel(overlay, x, y);
        let target = view.project(ll);
        assert!(
            (px - target.x).abs() < 1e-6 && (py - target.y).abs() < 1e-6,
            "pixel ({x}, {y}) placed at ({px}, {py}), corner at ({}, {})",
            target.x,
            target.y,
        );
    }
}

#[test]
fn drawn_quad_drapes_image() {
    let mut s = session(HeadlessSurface::with_size(1024.0, 768.0));
    let v = view(16.0);
    let out = s.handle_draw(
        DrawEvent::Created(PolygonId(7), Ring::Nested(vec![Ring::from_quad(field())])),
        &v,
        Instant::now(),
    );
    assert!(matches!(out, Some(Recompute::Applied(_))));
    assert_eq!(s.overlay().last_size(), Size::new(1024.0, 768.0));
    assert_image_on_corners(s.overlay(), &v);
}

#[test]
fn zoom_realigns_only_on_move_end() {
    let mut s = session(HeadlessSurface::default());
    let z16 = view(16.0);
    s.handle_draw(DrawEvent::Created(PolygonId(1), Ring::from_quad(field())), &z16, Instant::now());
    let before = *s.overlay().placement().unwrap();

    let z18 = view(18.0);
    assert_eq!(s.overlay().placement(), Some(&before));

    s.on_move_end(&z18);
    assert_ne!(s.overlay().placement(), Some(&before));
    assert_image_on_corners(s.overlay(), &z18);
}

#[test]
fn missing_pixel_size_uses_fallback() {
    let mut s = session(HeadlessSurface::default());
    let v = view(17.0);
    let out = s.handle_draw(DrawEvent::Created(PolygonId(1), Ring::from_quad(field())), &v, Instant::now());
    assert!(matches!(out, Some(Recompute::Applied(_))));
    assert_eq!(s.overlay().last_size(), Size::new(500.0, 375.0));
    assert_image_on_corners(s.overlay(), &v);

    // the image finished loading
    s.overlay_mut().surface_mut().size = Some(Size::new(4000.0, 3000.0));
    s.overlay_mut().refresh(&v);
    assert_eq!(s.overlay().last_size(), Size::new(4000.0, 3000.0));
    assert_image_on_corners(s.overlay(), &v);
}

#[test]
fn collinear_edit_keeps_last_frame() {
    let mut s = session(HeadlessSurface::default());
    let v = view(16.0);
    let now = Instant::now();
    s.handle_draw(DrawEvent::Created(PolygonId(1), Ring::from_quad(field())), &v, now);
    let good = *s.overlay().placement().unwrap();

    let [tl, tr, _, bl] = field();
    // midpoint of the top edge on screen; a lat/lng midpoint bows under mercator
    let on_line = v.unproject(v.project(tl).midpoint(v.project(tr)));
    let out = s.handle_draw(
        DrawEvent::Edited(PolygonId(1), Ring::from_quad([tl, on_line, tr, bl])),
        &v,
        now,
    );
    assert_eq!(
        out,
        Some(Recompute::Skipped(DrapeError::DegenerateGeometry(Degeneracy::Collinear)))
    );
    assert_eq!(s.overlay().placement(), Some(&good));
    assert_eq!(s.overlay().surface().placement, Some(good));
    assert!(s.overlay().transform().unwrap().data.iter().flatten().all(|x| x.is_finite()));
}

#[test]
fn marker_drag_shifts_every_polygon_once() {
    let mut s = session(HeadlessSurface::default());
    let v = view(16.0);
    let now = Instant::now();
    let other = Ring::Nested(vec![
        Ring::Flat(vec![LatLng::new(10.0, 10.0), LatLng::new(11.0, 10.0), LatLng::new(11.0, 12.0)]),
        Ring::Flat(vec![LatLng::new(10.5, 10.5), LatLng::new(10.6, 10.5), LatLng::new(10.6, 10.7)]),
    ]);
    s.handle_draw(DrawEvent::Created(PolygonId(1), Ring::from_quad(field())), &v, now);
    s.handle_draw(DrawEvent::Created(PolygonId(2), other.clone()), &v, now);
    s.overlay_mut().drain_events();

    s.toggle_transform_mode();
    let effects = s.handle_input(ControllerInput::Click(LatLng::new(0.0, 0.0)), &v, now);
    let [ControllerEffect::MarkerAdded { id, .. }] = effects[..] else {
        panic!("expected a marker, got {effects:?}");
    };
    s.handle_input(ControllerInput::DragStart(id), &v, now);
    let effects = s.handle_input(ControllerInput::Drag(id, LatLng::new(1.0, 2.0)), &v, now);
    assert_eq!(
        effects,
        vec![
            ControllerEffect::PolygonEdited(PolygonId(1)),
            ControllerEffect::PolygonEdited(PolygonId(2)),
        ]
    );

    let mut expected = other;
    expected.translate(1.0, 2.0);
    assert_eq!(s.polygons()[&PolygonId(2)], expected);

    let moved = field().map(|ll| ll.offset(1.0, 2.0));
    assert_eq!(s.overlay().corners(), moved);
    assert_eq!(s.overlay_mut().drain_events(), vec![OverlayEvent::Updated(moved)]);
}

#[test]
fn disabling_transform_mode_drops_markers() {
    let mut s = session(HeadlessSurface::default());
    let v = view(16.0);
    let now = Instant::now();
    s.toggle_transform_mode();
    s.handle_input(ControllerInput::Click(LatLng::new(1.0, 1.0)), &v, now);
    s.handle_input(ControllerInput::Click(LatLng::new(2.0, 2.0)), &v, now);
    assert_eq!(s.controller().unwrap().markers().len(), 2);

    let removed = s.toggle_transform_mode();
    assert_eq!(removed.len(), 2);
    assert!(s.controller().is_none());
    assert!(s
        .handle_input(ControllerInput::Click(LatLng::new(3.0, 3.0)), &v, now)
        .is_empty());
}

#[test]
fn degraded_surface_places_image_at_first_corner() {
    let mut surface = HeadlessSurface::default();
    surface.supports_3d = false;
    let mut s = session(surface);
    let v = view(16.0);
    let out = s.handle_draw(DrawEvent::Created(PolygonId(1), Ring::from_quad(field())), &v, Instant::now());

    let Some(Recompute::Degraded(p)) = out else {
        panic!("expected degraded placement, got {out:?}");
    };
    assert_eq!(p.origin, v.project(field()[0]));
    assert_eq!(p.css_transform(), format!("translate({}px,{}px)", p.origin.x, p.origin.y));
    assert!(s.overlay_mut().drain_events().contains(&OverlayEvent::DegradedMode));
}
