// roi-blur CLI.
//
// Usage:
//   roi-blur still --input in.png --output out.png --rect 100,80,120,160 --sigma 8
//   roi-blur still --input in.png --output out.png --tile-size 512      # whole frame, tiled
//   roi-blur live --camera 0 --rect 0.3,0.4,0.2,0.3 --normalized        # needs `window` + `camera`

use std::io::IsTerminal;
use std::path::PathBuf;
#[cfg(feature = "window")]
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use roi_blur::draw::outline_rect;
use roi_blur::readback::{load_frame, save_frame};
use roi_blur::{Compositor, CompositorConfig, CpuBackend, Rect, DEFAULT_SIGMA, DEFAULT_TILE_SIZE};

/// Outline colour for `--outline`, BGRA.
const OUTLINE_BGRA: [u8; 4] = [0x33, 0xCC, 0xFF, 0xFF];

#[derive(Parser, Debug)]
#[command(
    name = "roi-blur",
    version,
    about = "Blur detector rectangles (or whole frames, tiled) in BGRA video frames",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Composite a single image file and write the result.
    Still(StillArgs),
    /// Pull frames from a camera or file and show them composited.
    #[cfg(feature = "window")]
    Live(LiveArgs),
}

#[derive(Args, Debug, Clone)]
struct BlurArgs {
    /// Gaussian sigma in pixels.
    #[arg(long, default_value_t = DEFAULT_SIGMA)]
    sigma: f32,

    /// Tile edge for whole-frame blur; 0 or less blurs in one tile.
    #[arg(long = "tile-size", default_value_t = DEFAULT_TILE_SIZE, allow_negative_numbers = true)]
    tile_size: i32,

    /// Process rectangles/tiles one at a time.
    #[arg(long)]
    serial: bool,

    /// Rectangle to blur as x,y,w,h. Repeatable. None blurs the whole frame.
    #[arg(long = "rect", value_parser = parse_rect, allow_hyphen_values = true)]
    rects: Vec<[f32; 4]>,

    /// Rectangles are detector boxes: [0, 1] units, origin bottom-left.
    #[arg(long)]
    normalized: bool,

    /// Draw rectangle outlines on top of the result.
    #[arg(long)]
    outline: bool,
}

impl BlurArgs {
    fn config(&self) -> CompositorConfig {
        CompositorConfig::default()
            .with_sigma(self.sigma)
            .with_tile_size(self.tile_size)
            .with_parallel(!self.serial)
    }

    /// Pixel rectangles for a frame of the given size.
    fn rects_for(&self, width: usize, height: usize) -> Vec<Rect> {
        self.rects
            .iter()
            .map(|&[x, y, w, h]| {
                if self.normalized {
                    Rect::from_normalized(x, y, w, h, width, height)
                } else {
                    Rect::from_f32(x, y, w, h)
                }
            })
            .collect()
    }
}

#[derive(Args, Debug)]
struct StillArgs {
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output image; format follows the extension.
    #[arg(short = 'o', long)]
    output: PathBuf,

    #[command(flatten)]
    blur: BlurArgs,
}

#[cfg(feature = "window")]
#[derive(Args, Debug)]
struct LiveArgs {
    /// Camera index to open.
    #[cfg(feature = "camera")]
    #[arg(long, conflicts_with = "input")]
    camera: Option<u32>,

    /// Requested capture size (the camera may pick something close).
    #[cfg(feature = "camera")]
    #[arg(long, default_value_t = 640)]
    width: u32,

    #[cfg(feature = "camera")]
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Image file played back as a still stream.
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    #[command(flatten)]
    blur: BlurArgs,
}

fn parse_rect(s: &str) -> Result<[f32; 4], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected x,y,w,h, got {s:?}"));
    }
    let mut out = [0.0f32; 4];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f32>()
            .map_err(|e| format!("bad number {part:?} in {s:?}: {e}"))?;
    }
    Ok(out)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Still(args) => run_still(args),
        #[cfg(feature = "window")]
        Commands::Live(args) => run_live(args),
    }
}

fn init_tracing() {
    let ansi_enabled = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(ansi_enabled)
        .init();
}

fn run_still(args: StillArgs) -> Result<()> {
    let compositor = Compositor::new(CpuBackend::new(), args.blur.config())
        .context("initialise compositor")?;
    let frame = load_frame(&args.input)
        .with_context(|| format!("load {}", args.input.display()))?;
    let rects = args.blur.rects_for(frame.width(), frame.height());

    let mut out = compositor
        .composite_frame(&frame, &rects)
        .context("composite frame")?;
    if args.blur.outline {
        for rect in &rects {
            outline_rect(&mut out, rect, OUTLINE_BGRA);
        }
    }

    save_frame(&out, &args.output)
        .with_context(|| format!("save {}", args.output.display()))?;
    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        width = out.width(),
        height = out.height(),
        rects = rects.len(),
        "wrote composited frame"
    );
    Ok(())
}

#[cfg(feature = "window")]
fn run_live(args: LiveArgs) -> Result<()> {
    use roi_blur::draw::Viewer;
    use roi_blur::{FrameSource, StillImageSource};

    let mut source: Box<dyn FrameSource> = match &args.input {
        Some(path) => Box::new(
            StillImageSource::open(path, None)
                .with_context(|| format!("open {}", path.display()))?,
        ),
        #[cfg(feature = "camera")]
        None => Box::new(
            roi_blur::camera::CameraSource::new(args.camera.unwrap_or(0), args.width, args.height)
                .context("open camera")?,
        ),
        #[cfg(not(feature = "camera"))]
        None => anyhow::bail!("--input is required (built without the `camera` feature)"),
    };

    let compositor = Compositor::new(CpuBackend::new(), args.blur.config())
        .context("initialise compositor")?;
    let (w, h) = source.resolution();
    let mut viewer = Viewer::new("roi-blur", w, h).context("open window")?;

    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;

    while viewer.is_open() {
        let Some(frame) = source.next_frame().context("next frame")? else {
            break;
        };
        let rects = args.blur.rects_for(frame.width(), frame.height());

        // a failed composite shows the raw frame rather than stopping the stream
        let mut out = compositor.composite_or_passthrough(&frame, &rects);
        if args.blur.outline {
            for rect in &rects {
                outline_rect(&mut out, rect, OUTLINE_BGRA);
            }
        }
        viewer.present(&out).context("present frame")?;

        frames_this_second += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            info!("FPS: {fps:.1}");
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}
