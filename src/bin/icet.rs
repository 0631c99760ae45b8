use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use icet::{
    ColorFormat, CompositeConfig, CompositeMode, Context, DepthFormat, DrawRequest, FrameOutput,
    LocalCluster, OwnedImage, RadixkInfo, RoundInfo, SingleImageStrategy, Viewport, color_to_rgba8,
    matrix,
};

#[derive(Parser, Debug)]
#[command(name = "icet", version)]
struct Cli {
    /// Log protocol steps to stderr.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite an in-process demo scene and write the result as a PNG.
    Quadrants(QuadrantsArgs),
    /// Print the radix-k round schedule and partition table as JSON.
    Partitions(PartitionsArgs),
}

#[derive(Parser, Debug)]
struct QuadrantsArgs {
    /// Number of ranks. Four ranks draw quadrants, any other count draws
    /// overlapping vertical bands.
    #[arg(long, default_value_t = 4)]
    ranks: usize,

    /// Image size as WIDTHxHEIGHT.
    #[arg(long, default_value = "512x512", value_parser = parse_size)]
    size: (usize, usize),

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Single-image strategy: radixk, bswap, tree or automatic.
    #[arg(long)]
    strategy: Option<SingleImageStrategy>,

    /// Radix-k branching factor.
    #[arg(long)]
    magic_k: Option<usize>,

    /// Blend translucent layers in rank order instead of z-buffering.
    #[arg(long, default_value_t = false)]
    blend: bool,

    /// Compositor configuration JSON; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PartitionsArgs {
    /// Group size.
    #[arg(long)]
    size: usize,

    /// Radix-k branching factor.
    #[arg(long, default_value_t = icet::DEFAULT_MAGIC_K)]
    magic_k: usize,

    /// Cap on the number of partitions.
    #[arg(long, default_value_t = icet::DEFAULT_MAX_IMAGE_SPLIT)]
    max_split: usize,
}

fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: usize = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: usize = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 || w > i32::MAX as usize || h > i32::MAX as usize {
        return Err(format!("size {w}x{h} out of range"));
    }
    Ok((w, h))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();
    match cli.cmd {
        Command::Quadrants(args) => cmd_quadrants(args),
        Command::Partitions(args) => cmd_partitions(args),
    }
}

/// Pixels rank `rank` covers and the depth it draws them at.
fn scene_region(rank: usize, ranks: usize, width: usize, height: usize) -> (Viewport, f32) {
    let (w, h) = (width as i32, height as i32);
    let depth = 0.2 + 0.6 * rank as f32 / ranks as f32;
    if ranks == 4 {
        let (qx, qy) = ((rank % 2) as i32, (rank / 2) as i32);
        let x0 = qx * w / 2;
        let y0 = qy * h / 2;
        let x1 = (qx + 1) * w / 2;
        let y1 = (qy + 1) * h / 2;
        return (Viewport::new(x0, y0, x1 - x0, y1 - y0), depth);
    }
    let band = (w / ranks as i32).max(1);
    let margin = band / 4;
    let x0 = (rank as i32 * band - margin).max(0);
    let x1 = ((rank as i32 + 1) * band + margin).min(w);
    (Viewport::new(x0, 0, (x1 - x0).max(0), h), depth)
}

const PALETTE: [[f32; 3]; 6] = [
    [0.90, 0.20, 0.20],
    [0.20, 0.75, 0.30],
    [0.20, 0.40, 0.90],
    [0.95, 0.80, 0.20],
    [0.70, 0.30, 0.85],
    [0.20, 0.80, 0.85],
];

/// Draw callback of one demo rank: a flat rectangle, premultiplied when
/// translucent.
fn scene_painter(
    rank: usize,
    ranks: usize,
    size: (usize, usize),
    alpha: f32,
) -> impl FnMut(&DrawRequest, &mut OwnedImage) -> icet::CompositeResult<()> {
    let (region, depth) = scene_region(rank, ranks, size.0, size.1);
    let [r, g, b] = PALETTE[rank % PALETTE.len()];
    let color = [r * alpha, g * alpha, b * alpha, alpha];
    move |request: &DrawRequest, image: &mut OwnedImage| {
        let width = image.width();
        let format = image.format();
        let (cb, db) = (format.color_bytes(), format.depth_bytes());
        let vp = request.readback_viewport;
        let (color_plane, depth_plane) = image.planes_mut()?;
        for y in vp.y..vp.top() {
            for x in vp.x..vp.right() {
                let i = y as usize * width + x as usize;
                let inside = region.contains(Viewport::new(x, y, 1, 1));
                let px = if inside { color } else { [0.0; 4] };
                match format.color {
                    ColorFormat::RgbaUbyte => {
                        color_plane[i * cb..(i + 1) * cb].copy_from_slice(&color_to_rgba8(px));
                    }
                    ColorFormat::RgbaFloat => {
                        for (c, v) in px.iter().enumerate() {
                            let o = i * cb + c * 4;
                            color_plane[o..o + 4].copy_from_slice(&v.to_le_bytes());
                        }
                    }
                    ColorFormat::None => {}
                }
                if db > 0 {
                    let d = if inside { depth } else { 1.0 };
                    depth_plane[i * db..(i + 1) * db].copy_from_slice(&d.to_le_bytes());
                }
            }
        }
        Ok(())
    }
}

fn cmd_quadrants(args: QuadrantsArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.ranks > 0, "need at least one rank");
    let mut config = match &args.config {
        Some(path) => CompositeConfig::from_path(path)?,
        None => CompositeConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.single_image_strategy = strategy;
    }
    if let Some(k) = args.magic_k {
        config.magic_k = k;
    }
    if args.blend {
        config.composite_mode = CompositeMode::Blend;
        config.depth_format = DepthFormat::None;
        config.ordered_composite = true;
    }
    config.validate().context("invalid compositor configuration")?;

    let (width, height) = args.size;
    let ranks = args.ranks;
    let alpha = if args.blend { 0.6 } else { 1.0 };
    let outputs = LocalCluster::run(ranks, |comm| -> icet::CompositeResult<FrameOutput> {
        let rank = icet::Communicator::rank(comm);
        let mut ctx = Context::new(comm, config.clone())?;
        ctx.add_tile(0, 0, width as i32, height as i32, 0)?;
        ctx.set_draw_callback(scene_painter(rank, ranks, args.size, alpha));
        ctx.draw_frame(&matrix::identity(), &matrix::identity(), [0.0, 0.0, 0.0, 1.0])
    })?;

    let mut frames = Vec::with_capacity(outputs.len());
    for (rank, out) in outputs.into_iter().enumerate() {
        frames.push(out.with_context(|| format!("rank {rank} failed to composite"))?);
    }
    let bytes_sent: u64 = frames.iter().map(|f| f.stats.bytes_sent).sum();
    let display = &frames[0];
    for warning in frames.iter().flat_map(|f| &f.diagnostics.warnings) {
        eprintln!("warning ({:?}): {}", warning.kind, warning.message);
    }

    let rgba = to_rgba8(&display.image)?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &rgba,
        width as u32,
        height as u32,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({} ranks, {} bytes sent, {:.3} ms on the display rank)",
        args.out.display(),
        ranks,
        bytes_sent,
        display.stats.timing.total * 1e3
    );
    Ok(())
}

/// Top-down RGBA8 rows for the PNG encoder; compositor images start at the
/// bottom row.
fn to_rgba8(image: &OwnedImage) -> anyhow::Result<Vec<u8>> {
    let pixels: Vec<u8> = match image.color_format() {
        ColorFormat::RgbaUbyte => image.color_rgba8()?.to_vec(),
        ColorFormat::RgbaFloat => image
            .color_rgba_f32()?
            .into_iter()
            .flat_map(color_to_rgba8)
            .collect(),
        ColorFormat::None => anyhow::bail!("composited image has no color channel"),
    };
    let row = image.width() * 4;
    if row == 0 {
        return Ok(pixels);
    }
    Ok(pixels.chunks_exact(row).rev().flatten().copied().collect())
}

#[derive(serde::Serialize)]
struct PartitionTable {
    group_size: usize,
    magic_k: usize,
    max_image_split: usize,
    total_partitions: usize,
    rounds: Vec<RoundInfo>,
    /// `final_partition[group_rank]`, null for ranks left without a piece.
    final_partition: Vec<Option<usize>>,
}

fn cmd_partitions(args: PartitionsArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.size > 0, "group size must be positive");
    anyhow::ensure!(args.magic_k >= 2, "magic k must be at least 2");
    anyhow::ensure!(args.max_split >= 1, "max split must be at least 1");
    let infos = (0..args.size)
        .map(|rank| RadixkInfo::new(args.size, rank, args.magic_k, args.max_split))
        .collect::<Result<Vec<_>, _>>()?;
    let table = PartitionTable {
        group_size: args.size,
        magic_k: args.magic_k,
        max_image_split: args.max_split,
        total_partitions: infos[0].total_partitions(),
        rounds: infos[0].rounds.clone(),
        final_partition: infos.iter().map(RadixkInfo::final_partition_index).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
