use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};

use geodrape::config::OverlayConfig;
use geodrape::geo::LatLng;
use geodrape::overlay::corners::CornerQuad;
use geodrape::overlay::surface::HeadlessSurface;
use geodrape::overlay::{ProjectiveOverlay, Recompute};
use geodrape::viewport::WebMercator;

/// Geodrape CLI: compute where an image lands when draped onto a geographic quad
#[derive(Parser)]
#[command(name = "geodrape", version)]
struct Args {
    /// Scene files (JSON)
    #[arg(required = true)]
    scenes: Vec<String>,

    /// Image to drape; its size is read from the file header
    #[arg(short, long)]
    image: Option<String>,

    /// Overlay configuration (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Pretend the renderer has no 3D transforms
    #[arg(long)]
    no_3d: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Suppress non-JSON output
    #[arg(short, long)]
    quiet: bool,

    /// Log each placement step
    #[arg(short, long)]
    verbose: bool,
}

/// A map view with a quad to drape onto.
#[derive(Deserialize)]
struct Scene {
    /// `[lat, lng]` corners: top-left, top-right, bottom-right, bottom-left.
    corners: [[f64; 2]; 4],
    /// `[lat, lng]` at the middle of the view; defaults to the corners' center.
    #[serde(default)]
    center: Option<[f64; 2]>,
    zoom: f64,
    viewport: [f64; 2],
}

#[derive(Serialize)]
struct OutputPlacement {
    file: String,
    outcome: &'static str,
    image_width: f64,
    image_height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<[f64; 2]>,
    matrix: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn load_config(path: Option<&str>) -> Result<OverlayConfig> {
    let Some(path) = path else {
        return Ok(OverlayConfig::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    OverlayConfig::from_toml_str(&text).with_context(|| format!("invalid config: {path}"))
}

fn load_scene(path: &str) -> Result<Scene> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("failed to read scene: {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("invalid scene: {path}"))
}

fn image_size(path: &str) -> Result<Size> {
    let (w, h) = image::image_dimensions(Path::new(path))
        .with_context(|| format!("failed to read image header: {path}"))?;
    Ok(Size::new(w.into(), h.into()))
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn drape(
    scene: &Scene,
    surface: HeadlessSurface,
    config: OverlayConfig,
    file: &str,
) -> OutputPlacement {
    let corners = scene.corners.map(LatLng::from);
    let center = match scene.center {
        Some(c) => LatLng::from(c),
        None => CornerQuad::from_logical(corners).bounds().center(),
    };
    let view = WebMercator::centered(
        center,
        scene.zoom,
        Size::new(scene.viewport[0], scene.viewport[1]),
    );

    let mut overlay = ProjectiveOverlay::new(surface, config);
    let outcome = overlay.set_corners(corners, &view);
    let size = overlay.image_size();

    let mut out = OutputPlacement {
        file: file.to_owned(),
        outcome: "applied",
        image_width: size.width,
        image_height: size.height,
        origin: None,
        matrix: None,
        transform: None,
        error: None,
    };
    match outcome {
        Recompute::Applied(p) | Recompute::Degraded(p) => {
            if p.warp.is_none() {
                out.outcome = "degraded";
            }
            out.origin = Some([p.origin.x, p.origin.y]);
            out.matrix = p.warp.map(|m| m.to_vec());
            out.transform = Some(p.css_transform());
        }
        Recompute::Skipped(err) => {
            out.outcome = "skipped";
            out.error = Some(err.to_string());
        }
    }
    out
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = load_config(args.config.as_deref())?;
    let size = args.image.as_deref().map(image_size).transpose()?;
    match size {
        Some(s) => debug!(width = s.width, height = s.height, "image size from header"),
        None => debug!("no image given, using fallback size"),
    }

    for scene_path in &args.scenes {
        let scene = load_scene(scene_path)?;
        let surface = HeadlessSurface {
            size,
            supports_3d: !args.no_3d,
            ..HeadlessSurface::default()
        };

        let result = drape(&scene, surface, config.clone(), scene_path);
        info!(file = %scene_path, outcome = result.outcome, "draped");

        let json = if args.pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{json}");
    }

    Ok(())
}
