use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use pakgfx::config::{ConfigError, GfxConfig};
use pakgfx::error::GfxError;
use pakgfx::geometry::Rect;
use pakgfx::renderer::GfxContext;
use pakgfx::renderer::backend::{MemoryBackend, TextureBackend};
use pakgfx::renderer::bitmap_font::BitmapFontSource;
use pakgfx::renderer::registry::ImageHandle;
use pakgfx::renderer::wgpu_backend::WgpuBackend;
use pakgfx::sprite::{RawSprite, ingest};

/// Pack sprite sheets and glyph sheets into texture atlases
#[derive(Parser)]
#[command(name = "pakgfx")]
#[command(version)]
struct Cli {
    /// JSON config overriding the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut every PNG under a directory into tiles and pack them into sheets
    Pack {
        /// Directory searched recursively for .png files
        input: PathBuf,

        /// Where sheets and the manifest are written
        #[arg(short, long, default_value = "atlas")]
        out: PathBuf,

        /// Tile cell size of the input sheets (defaults to base_raster_width)
        #[arg(long)]
        cell: Option<u32>,

        /// Zoom level used for the offsets in the manifest
        #[arg(long)]
        zoom: Option<usize>,

        /// Upload to the default GPU instead of writing PNGs
        #[arg(long)]
        gpu: bool,
    },
    /// Build a glyph atlas from a bitmap font sheet
    Font {
        /// Glyph sheet image
        png: PathBuf,

        /// Char-keyed JSON glyph map
        map: PathBuf,

        /// Output PNG of the glyph atlas
        #[arg(short, long, default_value = "glyphs.png")]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct ManifestEntry {
    file: String,
    cell: usize,
    handle: u32,
    texture: u32,
    sheet_x: u32,
    sheet_y: u32,
    offset: [i32; 2],
    size: [u32; 2],
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GfxConfig::load(path),
        None => Ok(GfxConfig::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Pack { input, out, cell, zoom, gpu } => run_pack(config, &input, &out, cell, zoom, gpu),
        Commands::Font { png, map, out } => run_font(config, &png, &map, &out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(exit_status(e.as_ref()))
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// 2 for configuration problems, 1 for everything else.
fn exit_status(e: &(dyn std::error::Error + 'static)) -> u8 {
    let config = e.is::<ConfigError>() || matches!(e.downcast_ref::<GfxError>(), Some(GfxError::Config(_)));
    if config { 2 } else { 1 }
}

/// Context over `backend` with the requested zoom level applied.
fn context<B: TextureBackend>(config: GfxConfig, backend: B, zoom: Option<usize>) -> Result<GfxContext<B>, GfxError> {
    let mut ctx = GfxContext::new(config, backend)?;
    if let Some(level) = zoom {
        ctx.zoom_mut().set_zoom_level(level);
        let active = ctx.zoom().level();
        if active != level {
            log::warn!("zoom level {level} rejected, staying at {active}");
        }
    }
    Ok(ctx)
}

/// Every tile of every PNG under `dir`, with its source file and cell index.
fn collect_sprites(dir: &Path, cell: u32) -> Vec<(String, usize, RawSprite)> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("png"))
        .collect();
    files.sort();

    let mut sprites = Vec::new();
    for path in files {
        let img = match image::open(&path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        let name = path.strip_prefix(dir).unwrap_or(&path).display().to_string();
        for (i, rect) in ingest::split_cells(&img, cell).into_iter().enumerate() {
            sprites.push((name.clone(), i, ingest::sprite_from_rgba(&img, rect)));
        }
    }
    sprites
}

fn register<B: TextureBackend>(
    ctx: &mut GfxContext<B>,
    sprites: &[(String, usize, RawSprite)],
) -> Result<Vec<ManifestEntry>, Box<dyn std::error::Error>> {
    let raws: Vec<RawSprite> = sprites.iter().map(|(_, _, raw)| raw.clone()).collect();
    let handles = ctx.register_all(&raws)?;

    let entries = sprites
        .iter()
        .zip(handles)
        .filter(|(_, h)| *h != ImageHandle::EMPTY)
        .filter_map(|((file, cell, _), handle)| {
            let info = ctx.sprite(handle)?;
            let Rect { x, y, w, h } = ctx.offset(handle)?;
            Some(ManifestEntry {
                file: file.clone(),
                cell: *cell,
                handle: handle.0,
                texture: info.texture.0,
                sheet_x: info.sheet_x,
                sheet_y: info.sheet_y,
                offset: [x, y],
                size: [w, h],
            })
        })
        .collect();
    Ok(entries)
}

fn run_pack(config: GfxConfig, input: &Path, out: &Path, cell: Option<u32>, zoom: Option<usize>, gpu: bool) -> CliResult {
    let cell = cell.unwrap_or(config.base_raster_width);
    let sprites = collect_sprites(input, cell);
    log::info!("{} tiles found under {}", sprites.len(), input.display());

    if gpu {
        let mut ctx = context(config, WgpuBackend::headless()?, zoom)?;
        let entries = register(&mut ctx, &sprites)?;
        log::info!("uploaded {} sprites into {} sheets", entries.len(), ctx.packer().sheets().len());
        return Ok(());
    }

    let backend = MemoryBackend::new(config.max_texture_size);
    let mut ctx = context(config, backend, zoom)?;
    let entries = register(&mut ctx, &sprites)?;

    fs::create_dir_all(out)?;
    for (i, id) in ctx.backend().texture_ids().into_iter().enumerate() {
        let label = ctx.backend().label(id).unwrap_or("texture");
        let path = out.join(format!("{i:03}_{label}.png"));
        ctx.backend().save_png(id, &path)?;
    }
    fs::write(out.join("manifest.json"), serde_json::to_string_pretty(&entries)?)?;
    log::info!(
        "packed {} sprites into {} sheets ({} textures) at {}",
        entries.len(),
        ctx.packer().sheets().len(),
        ctx.backend().live_textures(),
        out.display()
    );
    Ok(())
}

fn run_font(config: GfxConfig, png: &Path, map: &Path, out: &Path) -> CliResult {
    let mut source = BitmapFontSource::from_png(&fs::read(png)?, &fs::read_to_string(map)?)?;
    let backend = MemoryBackend::new(config.max_texture_size);
    let mut ctx = context(config, backend, None)?;
    let font = ctx.load_font(&mut source)?;
    ctx.backend().save_png(font.texture(), out)?;
    log::info!("glyph atlas written to {}", out.display());
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let invalid = GfxConfig { max_sheets: 0, ..GfxConfig::default() };
        let err: Box<dyn std::error::Error> = context(invalid, MemoryBackend::default(), None).err().unwrap().into();
        assert_eq!(exit_status(err.as_ref()), 2);

        let err: Box<dyn std::error::Error> = GfxConfig::from_json("{").unwrap_err().into();
        assert_eq!(exit_status(err.as_ref()), 2);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err: Box<dyn std::error::Error> = std::io::Error::other("disk full").into();
        assert_eq!(exit_status(err.as_ref()), 1);
    }

    #[test]
    fn context_applies_the_requested_zoom() {
        let ctx = context(GfxConfig::default(), MemoryBackend::default(), Some(6)).unwrap();
        assert_eq!(ctx.zoom().level(), 6);
        assert_eq!(ctx.zoom().raster_width(), 32);

        let ctx = context(GfxConfig::default(), MemoryBackend::default(), None).unwrap();
        assert_eq!(ctx.zoom().level(), GfxConfig::default().zoom_level);
    }
}
