use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fieldscene", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene to a PNG.
    Render(RenderArgs),
    /// Print scene dimensions, tile counts, and conditional params.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Layers to draw, e.g. `0,1,3`. Defaults to all four.
    #[arg(long, value_delimiter = ',')]
    layers: Option<Vec<usize>>,

    /// Override a param's active bitmask, e.g. `--param 2=0x05`. Repeatable.
    #[arg(long = "param", value_parser = parse_param_override)]
    params: Vec<(u8, u8)>,

    /// Cycle a param to its next used bit before rendering. Repeatable.
    #[arg(long = "cycle")]
    cycle: Vec<u8>,

    /// Overlay the 16-pixel grid.
    #[arg(long)]
    grid: bool,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn parse_param_override(s: &str) -> Result<(u8, u8), String> {
    let (param, mask) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PARAM=MASK, got '{s}'"))?;
    let param: u8 = param
        .trim()
        .parse()
        .map_err(|e| format!("bad param '{param}': {e}"))?;
    let mask = mask.trim();
    let mask = match mask.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => mask.parse(),
    }
    .map_err(|e| format!("bad mask '{mask}': {e}"))?;
    Ok((param, mask))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn open_session(path: &Path) -> anyhow::Result<fieldscene::ViewerSession> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read scene '{}'", path.display()))?;
    let mut session = fieldscene::ViewerSession::new(Box::new(fieldscene::JsonSceneDecoder));
    session.open(bytes)?;
    Ok(session)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.in_path)?;

    if let Some(layers) = &args.layers {
        for index in 0..fieldscene::LAYER_COUNT {
            if !layers.contains(&index) {
                session.toggle_layer(index);
            }
        }
    }
    for &(param, mask) in &args.params {
        session.set_param_mask(param, mask);
    }
    for &param in &args.cycle {
        session.cycle_param(param);
    }
    session.set_grid(args.grid);

    let frame = session.render()?;
    if frame.stats.tiles_total > 0 && frame.stats.tiles_drawn == 0 {
        eprintln!(
            "warning: no tiles drawn ({} hidden, {} missing textures)",
            frame.stats.tiles_hidden, frame.stats.tiles_missing_texture
        );
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        frame.raster.rgba8(),
        frame.raster.width(),
        frame.raster.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.in_path)?;
    let stats = session.stats()?;
    let view = session.view();

    println!("layers:");
    for (index, count) in stats.tile_counts.iter().enumerate() {
        println!("  {index}: {count} tiles");
    }
    println!("texture/palette pairs: {}", stats.texture_pairs);
    println!("params:");
    for (param, used) in &stats.params {
        println!(
            "  {param}: used bits {used:#010b}, initial mask {:#010b}",
            view.params().active_mask(*param)
        );
    }
    if stats.params.is_empty() {
        println!("  (none)");
    }
    Ok(())
}
