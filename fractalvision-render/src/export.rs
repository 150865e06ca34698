//! Image export: PNG with embedded metadata (tEXt chunks) and JPEG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::{debug, info};

use fractalvision_core::{Complex, FractalKind};

use crate::buffer::RenderBuffer;
use crate::renderer::RenderResult;
use crate::RenderError;

/// Output encoding for [`export_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    /// `quality` is clamped to `10..=100` when encoding.
    Jpeg { quality: u8 },
}

impl ExportFormat {
    pub const DEFAULT_JPEG_QUALITY: u8 = 90;

    /// Pick the format from a file extension (`png`, `jpg`, `jpeg`).
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg {
                quality: Self::DEFAULT_JPEG_QUALITY,
            }),
            _ => Err(RenderError::UnsupportedFormat(ext)),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// Metadata to embed in an exported PNG as tEXt chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub kind: FractalKind,
    pub center: Complex,
    pub zoom: f64,
    pub max_iterations: u32,
    pub escape_radius: f64,
    pub julia_c: Option<Complex>,
    pub palette: String,
    pub width: u32,
    pub height: u32,
}

impl From<&RenderResult> for ExportMetadata {
    fn from(result: &RenderResult) -> Self {
        let engine = &result.engine;
        Self {
            kind: engine.kind(),
            center: result.viewport.center(),
            zoom: result.viewport.zoom(),
            max_iterations: result.max_iterations,
            escape_radius: engine.escape_radius(),
            julia_c: (engine.kind() == FractalKind::Julia).then(|| engine.julia_constant()),
            palette: result.scheme.label().to_string(),
            width: result.buffer.width,
            height: result.buffer.height,
        }
    }
}

/// Write a frame to `path`, optionally rescaled to `size` first.
pub fn export_result(
    result: &RenderResult,
    path: &Path,
    format: ExportFormat,
    size: Option<(u32, u32)>,
) -> crate::Result<()> {
    let resized;
    let buffer = match size {
        Some((w, h)) if (w, h) != (result.buffer.width, result.buffer.height) => {
            resized = resize_buffer(&result.buffer, w, h)?;
            &resized
        }
        _ => &result.buffer,
    };

    match format {
        ExportFormat::Png => {
            let mut metadata = ExportMetadata::from(result);
            metadata.width = buffer.width;
            metadata.height = buffer.height;
            export_png(buffer, path, &metadata)?;
        }
        ExportFormat::Jpeg { quality } => export_jpeg(buffer, path, quality)?,
    }
    info!(
        "Exported {}×{} {} to {}",
        buffer.width,
        buffer.height,
        format.extension(),
        path.display()
    );
    Ok(())
}

/// Write an RGBA buffer as a PNG file with embedded fractal metadata.
///
/// Uses the `png` crate directly (rather than `image`) to inject custom tEXt
/// chunks readable by exiftool and most image viewers.
pub fn export_png(
    buffer: &RenderBuffer,
    path: &Path,
    metadata: &ExportMetadata,
) -> crate::Result<()> {
    let writer = BufWriter::new(File::create(path)?);

    let mut encoder = png::Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), "FractalVision".to_string())?;
    encoder.add_text_chunk("Description".to_string(), build_description(metadata))?;
    for (key, value) in build_metadata_pairs(metadata) {
        encoder.add_text_chunk(key, value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.pixels)?;
    png_writer.finish()?;

    debug!("Wrote PNG {}x{} to {}", buffer.width, buffer.height, path.display());
    Ok(())
}

/// Write the buffer as a baseline JPEG. Alpha is dropped.
pub fn export_jpeg(buffer: &RenderBuffer, path: &Path, quality: u8) -> crate::Result<()> {
    let quality = clamp_jpeg_quality(quality);
    let writer = BufWriter::new(File::create(path)?);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality);
    encoder.write_image(
        &buffer.to_rgb(),
        buffer.width,
        buffer.height,
        ExtendedColorType::Rgb8,
    )?;
    debug!(quality, "Wrote JPEG {}x{} to {}", buffer.width, buffer.height, path.display());
    Ok(())
}

pub fn clamp_jpeg_quality(quality: u8) -> u8 {
    quality.clamp(10, 100)
}

/// Bicubic rescale to `width × height`.
pub fn resize_buffer(buffer: &RenderBuffer, width: u32, height: u32) -> crate::Result<RenderBuffer> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    let img = RgbaImage::from_raw(buffer.width, buffer.height, buffer.pixels.clone()).ok_or(
        RenderError::InvalidDimensions {
            width: buffer.width,
            height: buffer.height,
        },
    )?;
    let scaled = imageops::resize(&img, width, height, FilterType::CatmullRom);
    Ok(RenderBuffer {
        width,
        height,
        pixels: scaled.into_raw(),
    })
}

/// `fractal_<kind>_zoom<zoom>_<unix seconds>`, with the zoom printed to two
/// decimals and `.` replaced by `_`. No extension.
pub fn default_file_name(kind: FractalKind, zoom: f64) -> String {
    let zoom = format!("{zoom:.2}").replace('.', "_");
    format!(
        "fractal_{}_zoom{}_{}",
        kind.label().to_lowercase(),
        zoom,
        now_timestamp()
    )
}

fn now_timestamp() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", dur.as_secs())
}

fn build_description(meta: &ExportMetadata) -> String {
    let mut desc = format!(
        "{} - Center: {}, Zoom: {}, Iterations: {}",
        meta.kind, meta.center, meta.zoom, meta.max_iterations,
    );
    if let Some(c) = meta.julia_c {
        desc.push_str(&format!(", Julia C: {c}"));
    }
    desc
}

fn build_metadata_pairs(meta: &ExportMetadata) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("FractalVision.FractalType".into(), meta.kind.label().to_string()),
        ("FractalVision.CenterRe".into(), meta.center.re.to_string()),
        ("FractalVision.CenterIm".into(), meta.center.im.to_string()),
        ("FractalVision.Zoom".into(), meta.zoom.to_string()),
        ("FractalVision.MaxIterations".into(), meta.max_iterations.to_string()),
        ("FractalVision.EscapeRadius".into(), meta.escape_radius.to_string()),
        ("FractalVision.Palette".into(), meta.palette.clone()),
        ("FractalVision.Resolution".into(), format!("{}x{}", meta.width, meta.height)),
    ];
    if let Some(c) = meta.julia_c {
        pairs.push(("FractalVision.JuliaC_Re".into(), c.re.to_string()));
        pairs.push(("FractalVision.JuliaC_Im".into(), c.im.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::path::PathBuf;

    use fractalvision_core::{EscapeTimeEngine, FractalParams, Viewport};

    use crate::palette::{ColorScheme, Palette};
    use crate::renderer::{render, RenderQuality};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fractalvision_{name}_{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        dir
    }

    fn julia_frame() -> RenderResult {
        let viewport = Viewport::with_size(24, 16).unwrap();
        let engine = EscapeTimeEngine::julia(Complex::new(-0.7, 0.27015), FractalParams::default());
        render(
            &viewport,
            &engine,
            &Palette::from_scheme(ColorScheme::Fire),
            RenderQuality::Standard,
        )
    }

    #[test]
    fn export_creates_valid_png() {
        let dir = scratch_dir("png");
        let path = dir.join("frame.png");
        let frame = julia_frame();
        export_result(&frame, &path, ExportFormat::Png, None).expect("export should succeed");

        let mut header = [0u8; 8];
        File::open(&path).unwrap().read_exact(&mut header).unwrap();
        assert_eq!(&header, b"\x89PNG\r\n\x1a\n", "valid PNG signature");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_embeds_text_chunks() {
        let dir = scratch_dir("png_meta");
        let path = dir.join("meta.png");
        let frame = julia_frame();
        export_png(&frame.buffer, &path, &ExportMetadata::from(&frame)).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        let texts = &reader.info().uncompressed_latin1_text;
        let has = |key: &str, value: &str| texts.iter().any(|t| t.keyword == key && t.text == value);

        assert!(has("Software", "FractalVision"));
        assert!(has("FractalVision.FractalType", "Julia"));
        assert!(has("FractalVision.JuliaC_Re", "-0.7"));
        assert!(has("FractalVision.Palette", "Fire"));
        assert!(has("FractalVision.Resolution", "24x16"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mandelbrot_metadata_has_no_julia_constant() {
        let frame = render(
            &Viewport::with_size(8, 8).unwrap(),
            &EscapeTimeEngine::default(),
            &Palette::default(),
            RenderQuality::Standard,
        );
        let meta = ExportMetadata::from(&frame);
        assert_eq!(meta.kind, FractalKind::Mandelbrot);
        assert!(meta.julia_c.is_none());
        assert!(!build_metadata_pairs(&meta)
            .iter()
            .any(|(k, _)| k.starts_with("FractalVision.JuliaC")));
    }

    #[test]
    fn jpeg_export_with_resize() {
        let dir = scratch_dir("jpeg");
        let path = dir.join("frame.jpg");
        let frame = julia_frame();
        export_result(&frame, &path, ExportFormat::Jpeg { quality: 3 }, Some((48, 32))).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (48, 32));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn jpeg_quality_is_clamped() {
        assert_eq!(clamp_jpeg_quality(0), 10);
        assert_eq!(clamp_jpeg_quality(55), 55);
        assert_eq!(clamp_jpeg_quality(255), 100);
    }

    #[test]
    fn resize_rejects_zero_size() {
        let buf = RenderBuffer::new(4, 4);
        assert!(matches!(
            resize_buffer(&buf, 0, 4),
            Err(RenderError::InvalidDimensions { width: 0, height: 4 })
        ));
        let scaled = resize_buffer(&buf, 9, 3).unwrap();
        assert_eq!(scaled.pixels.len(), 9 * 3 * 4);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.PNG")).unwrap(), ExportFormat::Png);
        assert_eq!(
            ExportFormat::from_path(Path::new("b.jpeg")).unwrap(),
            ExportFormat::Jpeg { quality: 90 }
        );
        assert!(ExportFormat::from_path(Path::new("c.bmp")).is_err());
        assert!(ExportFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn default_name_encodes_kind_and_zoom() {
        let name = default_file_name(FractalKind::Julia, 12.5);
        assert!(name.starts_with("fractal_julia_zoom12_50_"), "{name}");
        let stamp = name.rsplit('_').next().unwrap();
        assert!(stamp.parse::<u64>().is_ok());
    }
}
