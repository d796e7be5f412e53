use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use image::{ImageReader, RgbaImage};
use serde::Deserialize;
use sheetsmith_core::batch::{
    BatchJob, BatchKind, BuiltSheet, build_many, group_by_prefix, sheet_file_name,
    tilemap_file_name,
};
use sheetsmith_core::export::placements_to_json;
use sheetsmith_core::prelude::*;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Output folders written by the batch commands; never read back as input.
const OUTPUT_DIRS: [&str; 2] = ["sprite_sheets", "tilemaps"];

#[derive(Parser, Debug)]
#[command(
    name = "sheetsmith",
    about = "Assemble sprite sheets and tilemaps, or split them back into frames",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a saved layout document to PNG (plus tilemap CSV)
    Assemble(AssembleArgs),
    /// Build one sprite sheet per name prefix in each folder
    Sheets(SheetsArgs),
    /// Build one tilemap (PNG + CSV) per folder
    Tilemaps(TilemapsArgs),
    /// Lay a folder of frames out on a grid and save the layout document
    Layout(LayoutArgs),
    /// Detect the cell grid of a sheet and print it as JSON
    Detect(DetectArgs),
    /// Split a sheet into one PNG per cell
    Split(SplitArgs),
}

#[derive(Parser, Debug, Clone)]
struct AssembleArgs {
    // Input/Output
    /// Layout document (JSON)
    #[arg(help_heading = "Input/Output")]
    layout: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Output base name (defaults to the document's output name, then the layout file stem)
    #[arg(short, long, help_heading = "Input/Output")]
    name: Option<String>,
    /// Folder the frames are loaded from (overrides the document's source folder)
    #[arg(long, help_heading = "Input/Output")]
    source: Option<PathBuf>,
    /// YAML config file path (overrides layout options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Layout
    /// Align the active layer to the reference layer before rendering
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    align: bool,
    /// Snap every frame to the grid before rendering
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    snap_all: bool,

    // Export
    /// Blend mode: over | replace
    #[arg(long, default_value = "over", value_parser = ["over", "replace"], help_heading = "Export")]
    blend: String,
    /// Draw red outlines (debug)
    #[arg(long, default_value_t = false, help_heading = "Export")]
    outlines: bool,
    /// Also write placements as JSON
    #[arg(long, default_value_t = false, help_heading = "Export")]
    json: bool,
    /// Print the merged configuration (after document/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: composite but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct InputArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// YAML config file path (overrides layout options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
struct SheetsArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Output directory (defaults to <input>/sprite_sheets)
    #[arg(short, long, help_heading = "Input/Output")]
    out_dir: Option<PathBuf>,
    /// Arrangement: grid | horizontal | vertical
    #[arg(long, default_value = "grid", help_heading = "Layout")]
    arrangement: String,
    /// Columns in grid arrangement
    #[arg(long, default_value_t = 4, help_heading = "Layout")]
    columns: u32,
    /// Padding mode: fixed | frame_width | frame_height
    #[arg(long, default_value = "fixed", help_heading = "Layout")]
    padding_mode: String,
    /// Padding between cells (fixed mode)
    #[arg(long, default_value_t = 1, help_heading = "Layout")]
    padding: u32,
    /// Dry run: build sheets but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct TilemapsArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Output directory (defaults to <input>/tilemaps)
    #[arg(short, long, help_heading = "Input/Output")]
    out_dir: Option<PathBuf>,
    /// Arrangement: grid | horizontal | vertical
    #[arg(long, default_value = "grid", help_heading = "Layout")]
    arrangement: String,
    /// Columns in grid arrangement
    #[arg(long, default_value_t = 8, help_heading = "Layout")]
    columns: u32,
    /// Minimum tile size (larger tiles grow the cell)
    #[arg(long, default_value_t = 32, help_heading = "Layout")]
    tile_size: u32,
    /// Skip the CSV metadata file
    #[arg(long, default_value_t = false, help_heading = "Export")]
    no_meta: bool,
    /// Dry run: build tilemaps but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct LayoutArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Layout document to write
    #[arg(short, long, default_value = "layout.json", help_heading = "Input/Output")]
    output: PathBuf,
    /// Output base name stored in the document (defaults to the folder name)
    #[arg(short, long, help_heading = "Input/Output")]
    name: Option<String>,
    /// Sheet kind: spritesheet | tilemap
    #[arg(long, default_value = "spritesheet", help_heading = "Layout")]
    kind: String,
    /// Columns
    #[arg(long, default_value_t = 4, help_heading = "Layout")]
    columns: u32,
    /// Rows (0 = derived from the frames)
    #[arg(long, default_value_t = 0, help_heading = "Layout")]
    rows: u32,
    /// Padding mode: fixed | frame_width | frame_height
    #[arg(long, default_value = "fixed", help_heading = "Layout")]
    padding_mode: String,
    /// Padding between cells (fixed mode)
    #[arg(long, default_value_t = 1, help_heading = "Layout")]
    padding: u32,
    /// Tile size mode: auto | force
    #[arg(long, default_value = "auto", help_heading = "Layout")]
    tile_size_mode: String,
    /// Tile size (force mode, and the empty-tilemap fallback)
    #[arg(long, default_value_t = 32, help_heading = "Layout")]
    tile_size: u32,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
}

#[derive(Parser, Debug, Clone)]
struct DetectArgs {
    /// Sheet image
    sheet: PathBuf,
}

#[derive(Parser, Debug, Clone)]
struct SplitArgs {
    // Input/Output
    /// Sheet image
    #[arg(help_heading = "Input/Output")]
    sheet: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Base name of the cell files (defaults to the sheet file stem)
    #[arg(short, long, help_heading = "Input/Output")]
    base: Option<String>,

    // Grid (detected from the alpha channel unless a cell size is given)
    /// Cell width
    #[arg(long, requires = "cell_h", help_heading = "Grid")]
    cell_w: Option<u32>,
    /// Cell height
    #[arg(long, requires = "cell_w", help_heading = "Grid")]
    cell_h: Option<u32>,
    /// Columns (0 = as many as fit)
    #[arg(long, default_value_t = 0, help_heading = "Grid")]
    columns: u32,
    /// Rows (0 = as many as fit)
    #[arg(long, default_value_t = 0, help_heading = "Grid")]
    rows: u32,
    /// Horizontal gap between cells
    #[arg(long, default_value_t = 0, help_heading = "Grid")]
    pad_x: u32,
    /// Vertical gap between cells
    #[arg(long, default_value_t = 0, help_heading = "Grid")]
    pad_y: u32,
    /// Pixels skipped at the left edge
    #[arg(long, default_value_t = 0, help_heading = "Grid")]
    offset_x: u32,
    /// Pixels skipped at the top edge
    #[arg(long, default_value_t = 0, help_heading = "Grid")]
    offset_y: u32,

    // Export
    /// Also export fully transparent cells
    #[arg(long, default_value_t = false, help_heading = "Export")]
    keep_blank: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let show_progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Assemble(args) => run_assemble(args),
        Commands::Sheets(args) => run_sheets(args, show_progress),
        Commands::Tilemaps(args) => run_tilemaps(args, show_progress),
        Commands::Layout(args) => run_layout(args, show_progress),
        Commands::Detect(args) => run_detect(args),
        Commands::Split(args) => run_split(args),
    }
}

fn run_assemble(cli: &AssembleArgs) -> anyhow::Result<()> {
    let doc = load_layout(&cli.layout)
        .with_context(|| format!("read layout {}", cli.layout.display()))?;
    let layout_dir = cli
        .layout
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let source_dir = match &cli.source {
        Some(dir) => dir.clone(),
        None if doc.source_folder.is_empty() => layout_dir.clone(),
        None => layout_dir.join(&doc.source_folder),
    };
    let source = FolderSource::new(&source_dir);
    let (mut canvas, report) = CanvasModel::from_document(&doc, &source)?;
    for w in &report.warnings {
        warn!("{w}");
    }
    for key in &report.missing {
        warn!(%key, "frame missing from source folder");
    }
    info!(
        loaded = report.loaded,
        missing = report.missing.len(),
        layer_fallbacks = report.layer_fallbacks,
        source = %source_dir.display(),
        "layout loaded"
    );

    if let Some(path) = &cli.config {
        let y = read_yaml_config(path)?;
        let cfg = y.into_layout_config(canvas.config().clone())?;
        cfg.validate()?;
        canvas.set_config(cfg);
    }

    if cli.print_config {
        print_config(canvas.config(), &cli.print_config_format)?;
        return Ok(());
    }

    if cli.align {
        let aligned = canvas.align_layer_to_reference()?;
        info!(
            aligned = aligned.aligned,
            no_anchor = aligned.no_anchor,
            no_counterpart = aligned.no_counterpart,
            oversized = aligned.oversized.len(),
            "aligned to reference layer"
        );
    }
    if cli.snap_all && !canvas.snap_all() {
        warn!("--snap-all ignored: snapping needs grid mode with snap enabled");
    }

    let opts = AssembleOptions {
        blend: parse_blend(&cli.blend)?,
        outlines: cli.outlines,
    };
    let sheet = rasterize(&canvas, opts)?;
    let (w, h) = sheet.rgba.dimensions();
    info!(width = w, height = h, frames = sheet.placements.len(), "sheet assembled");

    let name = cli
        .name
        .clone()
        .or_else(|| (!doc.output_name.is_empty()).then(|| doc.output_name.clone()))
        .unwrap_or_else(|| file_stem(&cli.layout));
    if cli.dry_run {
        println!("{}x{} frames={} skipped={}", w, h, sheet.placements.len(), sheet.skipped);
        return Ok(());
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    let png_name = format!("{}.png", name);
    let png_path = cli.out_dir.join(&png_name);
    sheet
        .rgba
        .save(&png_path)
        .with_context(|| format!("write {}", png_path.display()))?;
    info!(?png_path, "sheet written");

    let cfg = canvas.config();
    if cfg.kind == SheetKind::Tilemap && cfg.export_tile_meta {
        let csv_path = cli.out_dir.join(format!("{}.csv", name));
        let records = export_metadata(&sheet.placements, &png_name);
        fs::write(&csv_path, tile_records_to_csv(&records))
            .with_context(|| format!("write {}", csv_path.display()))?;
        info!(?csv_path, tiles = records.len(), "tile metadata written");
    }
    if cli.json {
        let json_path = cli.out_dir.join(format!("{}.json", name));
        let value = placements_to_json(&png_name, (w, h), &sheet.placements);
        fs::write(&json_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", json_path.display()))?;
        info!(?json_path, "placements written");
    }
    Ok(())
}

fn run_sheets(cli: &SheetsArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut opts = BatchSheetOptions {
        arrangement: parse_arrangement(&cli.arrangement)?,
        columns: cli.columns,
        padding_mode: parse_padding_mode(&cli.padding_mode)?,
        padding: cli.padding,
    };
    if let Some(path) = &cli.input.config {
        opts = read_yaml_config(path)?.into_sheet_options(opts)?;
    }
    let out_root = cli
        .out_dir
        .clone()
        .unwrap_or_else(|| cli.input.input.join(OUTPUT_DIRS[0]));

    let mut jobs = Vec::new();
    for (folder, paths) in folders(&cli.input)? {
        let names: Vec<String> = paths.iter().map(|p| file_name(p)).collect();
        let mut frames = load_frames_with_progress(&paths, show_progress)?;
        for (prefix, files) in group_by_prefix(names) {
            let group: Vec<InputFrame> = files
                .iter()
                .filter_map(|f| take_frame(&mut frames, f))
                .collect();
            jobs.push((
                out_dir_for(&out_root, &cli.input.input, &folder),
                BatchJob {
                    name: sheet_file_name(&prefix),
                    frames: group,
                    kind: BatchKind::Sheet(opts),
                },
            ));
        }
    }
    write_batch(jobs, cli.dry_run, false)
}

fn run_tilemaps(cli: &TilemapsArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut opts = BatchTileOptions {
        arrangement: parse_arrangement(&cli.arrangement)?,
        columns: cli.columns,
        tile_size: cli.tile_size,
    };
    if let Some(path) = &cli.input.config {
        opts = read_yaml_config(path)?.into_tile_options(opts)?;
    }
    let out_root = cli
        .out_dir
        .clone()
        .unwrap_or_else(|| cli.input.input.join(OUTPUT_DIRS[1]));

    let mut jobs = Vec::new();
    for (folder, paths) in folders(&cli.input)? {
        let frames = tile_frames(load_frames_with_progress(&paths, show_progress)?);
        let folder_name = folder
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("tiles")
            .to_string();
        jobs.push((
            out_dir_for(&out_root, &cli.input.input, &folder),
            BatchJob {
                name: tilemap_file_name(&folder_name),
                frames,
                kind: BatchKind::Tilemap(opts),
            },
        ));
    }
    write_batch(jobs, cli.dry_run, !cli.no_meta)
}

/// Keys tiles by bare file name and orders them case-insensitively, which is
/// what the tilemap CSV `tile` column carries.
fn tile_frames(mut frames: Vec<InputFrame>) -> Vec<InputFrame> {
    for f in &mut frames {
        f.key = file_name(Path::new(&f.key));
    }
    frames.sort_by_cached_key(|f| f.key.to_lowercase());
    frames
}

/// Builds every job and writes the PNGs (plus a CSV per PNG when `write_csv`).
fn write_batch(jobs: Vec<(PathBuf, BatchJob)>, dry_run: bool, write_csv: bool) -> anyhow::Result<()> {
    if jobs.is_empty() {
        anyhow::bail!("no input images found");
    }
    let (dirs, jobs): (Vec<PathBuf>, Vec<BatchJob>) = jobs.into_iter().unzip();
    let results = build_many(&jobs);
    let mut written = 0usize;
    for (dir, (name, result)) in dirs.iter().zip(results) {
        let built: BuiltSheet = match result {
            Ok(b) => b,
            Err(e) => {
                error!(%name, error = %e, "skip output");
                continue;
            }
        };
        let (w, h) = built.rgba.dimensions();
        if dry_run {
            println!("{} {}x{} frames={}", name, w, h, built.placements.len());
            continue;
        }
        fs::create_dir_all(dir).with_context(|| format!("create out_dir {}", dir.display()))?;
        let png_path = dir.join(&name);
        built
            .rgba
            .save(&png_path)
            .with_context(|| format!("write {}", png_path.display()))?;
        info!(?png_path, width = w, height = h, frames = built.placements.len(), "wrote sheet");
        if write_csv {
            let csv_path = png_path.with_extension("csv");
            let records = export_metadata(&built.placements, &name);
            fs::write(&csv_path, tile_records_to_csv(&records))
                .with_context(|| format!("write {}", csv_path.display()))?;
        }
        written += 1;
    }
    info!(written, "batch finished");
    Ok(())
}

fn run_layout(cli: &LayoutArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = GridLayoutConfig::builder()
        .kind(parse_kind(&cli.kind)?)
        .columns(cli.columns)
        .rows(cli.rows)
        .padding_mode(parse_padding_mode(&cli.padding_mode)?)
        .padding(cli.padding)
        .tile_size_mode(parse_tile_size_mode(&cli.tile_size_mode)?)
        .tile_size(cli.tile_size)
        .build();
    if let Some(path) = &cli.input.config {
        cfg = read_yaml_config(path)?.into_layout_config(cfg)?;
    }
    cfg.validate()?;
    if cli.print_config {
        print_config(&cfg, &cli.print_config_format)?;
        return Ok(());
    }

    let input = &cli.input.input;
    let root = if input.is_file() {
        input.parent().unwrap_or(Path::new("")).to_path_buf()
    } else {
        input.clone()
    };
    let root = root.as_path();
    let mut paths = gather_paths(input, &cli.input.include, &cli.input.exclude)?;
    paths.sort();
    let mut frames = load_frames_with_progress(&paths, show_progress)?;
    for frame in &mut frames {
        frame.key = relative_key(root, Path::new(&frame.key));
    }
    info!(count = frames.len(), "loaded input images");

    let mut canvas = CanvasModel::new(cfg);
    canvas.add_frames(frames);
    let name = cli.name.clone().unwrap_or_else(|| file_stem(root));
    let source_folder = source_folder_for(&cli.output, root)?;
    let doc = canvas.to_document().with_source(source_folder, name);
    save_layout(&cli.output, &doc).with_context(|| format!("write {}", cli.output.display()))?;
    info!(output = ?cli.output, frames = doc.items.len(), "layout written");
    Ok(())
}

fn run_detect(cli: &DetectArgs) -> anyhow::Result<()> {
    let sheet = load_rgba(&cli.sheet)?;
    let grid = detect(&sheet).with_context(|| format!("detect grid in {}", cli.sheet.display()))?;
    println!("{}", serde_json::to_string_pretty(&grid)?);
    Ok(())
}

fn run_split(cli: &SplitArgs) -> anyhow::Result<()> {
    let sheet = load_rgba(&cli.sheet)?;
    let splitter = match (cli.cell_w, cli.cell_h) {
        (Some(cell_w), Some(cell_h)) => SheetSplitter::new(
            sheet,
            SplitConfig {
                cell_w,
                cell_h,
                columns: cli.columns,
                rows: cli.rows,
                pad_x: cli.pad_x,
                pad_y: cli.pad_y,
                offset_x: cli.offset_x,
                offset_y: cli.offset_y,
            },
        )?,
        _ => {
            let s = SheetSplitter::from_detection(sheet)
                .with_context(|| format!("detect grid in {}", cli.sheet.display()))?;
            info!(config = ?s.config(), "grid detected");
            s
        }
    }
    .with_path(&cli.sheet);

    let Some(grid) = splitter.grid() else {
        anyhow::bail!("grid does not fit the sheet");
    };
    let base = cli.base.clone().unwrap_or_else(|| file_stem(&cli.sheet));
    let report = splitter
        .export(&cli.out_dir, &base, &grid.all_cells(), !cli.keep_blank)
        .with_context(|| format!("split {}", cli.sheet.display()))?;
    info!(
        exported = report.exported.len(),
        skipped = report.skipped.len(),
        manifest = ?report.manifest,
        "sheet split"
    );
    Ok(())
}

fn parse_blend(s: &str) -> anyhow::Result<BlendMode> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "over" => BlendMode::Over,
        "replace" => BlendMode::Replace,
        other => anyhow::bail!("unknown blend mode: {}", other),
    })
}

fn parse_arrangement(s: &str) -> anyhow::Result<Arrangement> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown arrangement: {}", s))
}

fn parse_layout_mode(s: &str) -> anyhow::Result<LayoutMode> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown layout mode: {}", s))
}

fn parse_padding_mode(s: &str) -> anyhow::Result<PaddingMode> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown padding mode: {}", s))
}

fn parse_tile_size_mode(s: &str) -> anyhow::Result<TileSizeMode> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown tile size mode: {}", s))
}

fn parse_kind(s: &str) -> anyhow::Result<SheetKind> {
    s.parse().map_err(|_| anyhow::anyhow!("unknown sheet kind: {}", s))
}

fn print_config(cfg: &GridLayoutConfig, format: &str) -> anyhow::Result<()> {
    match format {
        "yaml" => println!("{}", serde_yaml::to_string(cfg)?),
        _ => println!("{}", serde_json::to_string_pretty(cfg)?),
    }
    Ok(())
}

fn file_stem(p: &Path) -> String {
    p.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet")
        .to_string()
}

fn file_name(p: &Path) -> String {
    p.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// `p` relative to `root`, with forward slashes.
fn relative_key(root: &Path, p: &Path) -> String {
    p.strip_prefix(root)
        .unwrap_or(p)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Source folder to store in a layout written to `output`: relative to the
/// document's folder when the frames live under it, absolute otherwise.
fn source_folder_for(output: &Path, root: &Path) -> anyhow::Result<String> {
    let root = fs::canonicalize(root).with_context(|| format!("resolve {}", root.display()))?;
    let doc_dir = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::canonicalize(parent).ok(),
        None => std::env::current_dir().ok(),
    };
    Ok(match doc_dir.as_deref().and_then(|d| root.strip_prefix(d).ok()) {
        Some(rel) => rel.to_string_lossy().replace('\\', "/"),
        None => root.to_string_lossy().replace('\\', "/"),
    })
}

fn out_dir_for(out_root: &Path, input_root: &Path, folder: &Path) -> PathBuf {
    match folder.strip_prefix(input_root) {
        Ok(rel) => out_root.join(rel),
        Err(_) => out_root.to_path_buf(),
    }
}

/// Removes and returns the frame loaded from the file named `name`.
fn take_frame(frames: &mut Vec<InputFrame>, name: &str) -> Option<InputFrame> {
    let idx = frames
        .iter()
        .position(|f| Path::new(&f.key).file_name().and_then(|s| s.to_str()) == Some(name))?;
    Some(frames.swap_remove(idx))
}

/// Gathered image paths grouped by their parent folder.
fn folders(input: &InputArgs) -> anyhow::Result<BTreeMap<PathBuf, Vec<PathBuf>>> {
    let mut map: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for p in gather_paths(&input.input, &input.include, &input.exclude)? {
        let parent = p.parent().map(Path::to_path_buf).unwrap_or_default();
        map.entry(parent).or_default().push(p);
    }
    Ok(map)
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| !is_output_dir(e.path()))
            .filter_map(|e| e.ok());
        for entry in walker {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn is_output_dir(p: &Path) -> bool {
    p.is_dir()
        && p.file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|n| OUTPUT_DIRS.contains(&n))
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

fn load_frames_with_progress(paths: &[PathBuf], progress: bool) -> anyhow::Result<Vec<InputFrame>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match load_rgba(p) {
            Ok(img) => {
                let key = p.to_string_lossy().replace('\\', "/");
                list.push(InputFrame::new(key, img));
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_rgba(p: &Path) -> anyhow::Result<RgbaImage> {
    let img = ImageReader::open(p)
        .with_context(|| format!("open {}", p.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("decode {}", p.display()))?;
    Ok(img.to_rgba8())
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

fn read_yaml_config(path: &Path) -> anyhow::Result<YamlConfig> {
    let file = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let y: YamlConfig = serde_yaml::from_str(&file)
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(y)
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    kind: Option<String>,
    layout_mode: Option<String>,
    columns: Option<u32>,
    rows: Option<u32>,
    padding_mode: Option<String>,
    padding: Option<u32>,
    tile_size_mode: Option<String>,
    tile_size: Option<u32>,
    snap: Option<bool>,
    export_tile_meta: Option<bool>,
    arrangement: Option<String>,
}

impl YamlConfig {
    fn into_layout_config(self, mut cfg: GridLayoutConfig) -> anyhow::Result<GridLayoutConfig> {
        if let Some(v) = self.kind {
            cfg.kind = parse_kind(&v)?;
        }
        if let Some(v) = self.layout_mode {
            cfg.layout_mode = parse_layout_mode(&v)?;
        }
        if let Some(v) = self.columns {
            cfg.columns = v;
        }
        if let Some(v) = self.rows {
            cfg.rows = v;
        }
        if let Some(v) = self.padding_mode {
            cfg.padding_mode = parse_padding_mode(&v)?;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.tile_size_mode {
            cfg.tile_size_mode = parse_tile_size_mode(&v)?;
        }
        if let Some(v) = self.tile_size {
            cfg.tile_size = v;
        }
        if let Some(v) = self.snap {
            cfg.snap = v;
        }
        if let Some(v) = self.export_tile_meta {
            cfg.export_tile_meta = v;
        }
        Ok(cfg)
    }

    fn into_sheet_options(self, mut opts: BatchSheetOptions) -> anyhow::Result<BatchSheetOptions> {
        if let Some(v) = self.arrangement {
            opts.arrangement = parse_arrangement(&v)?;
        }
        if let Some(v) = self.columns {
            opts.columns = v;
        }
        if let Some(v) = self.padding_mode {
            opts.padding_mode = parse_padding_mode(&v)?;
        }
        if let Some(v) = self.padding {
            opts.padding = v;
        }
        Ok(opts)
    }

    fn into_tile_options(self, mut opts: BatchTileOptions) -> anyhow::Result<BatchTileOptions> {
        if let Some(v) = self.arrangement {
            opts.arrangement = parse_arrangement(&v)?;
        }
        if let Some(v) = self.columns {
            opts.columns = v;
        }
        if let Some(v) = self.tile_size {
            opts.tile_size = v;
        }
        Ok(opts)
    }
}
