use std::fmt::Debug;

use crate::{
    buffer::Buffers,
    canon::LensOverrides,
    cr3, exif::Exif,
    exif::DEFAULT_MAX_IFD_ENTRIES,
    file::{sniff, ImageType},
    heif, jpeg, png,
    reader::ReadAt,
    tiff, webp,
};

// Keep align with 4K
pub(crate) const INIT_BUF_SIZE: usize = 4096;
// Set a reasonable upper limit for single buffer allocation.
pub(crate) const MAX_ALLOC_SIZE: usize = 100 * 1024 * 1024;

/// Options of one decode.
///
/// ```rust
/// use nom_imagemeta::*;
///
/// let opts = DecodeOptions::new()
///     .image_type(ImageType::CR3)
///     .decode_maker_notes(false)
///     .max_ifd_entries(512);
/// assert_eq!(opts.max_ifd_entries, 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// Skip sniffing and decode the source as this type.
    pub image_type: Option<ImageType>,
    pub decode_maker_notes: bool,
    /// Upper bound on the entries of one camera IFD. More entries are
    /// treated as corruption.
    pub max_ifd_entries: u16,
    /// Lens names preferred by the Canon lens resolver.
    pub lens_overrides: LensOverrides,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            image_type: None,
            decode_maker_notes: true,
            max_ifd_entries: DEFAULT_MAX_IFD_ENTRIES,
            lens_overrides: LensOverrides::default(),
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = Some(image_type);
        self
    }

    pub fn decode_maker_notes(mut self, decode: bool) -> Self {
        self.decode_maker_notes = decode;
        self
    }

    pub fn max_ifd_entries(mut self, max: u16) -> Self {
        self.max_ifd_entries = max;
        self
    }

    pub fn lens_overrides(mut self, overrides: LensOverrides) -> Self {
        self.lens_overrides = overrides;
        self
    }
}

/// A reusable decoder.
///
/// `MetaParser` comes with its own buffer management, so that buffers can
/// be reused across decodes to avoid frequent memory allocations. Try to
/// reuse one parser instead of creating a new one for every image.
///
/// ```rust
/// use nom_imagemeta::*;
///
/// fn main() -> Result<()> {
///     let mut parser = MetaParser::new();
///     let data = vec![0xFF, 0xD8, 0xFF, 0xD9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
///     assert!(matches!(parser.parse(&data), Err(Error::NoExif)));
///     Ok(())
/// }
/// ```
pub struct MetaParser {
    buffers: Buffers,
    opts: DecodeOptions,
}

impl Debug for MetaParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaParser")
            .field("buffers", &self.buffers)
            .field("opts", &self.opts)
            .finish()
    }
}

impl Default for MetaParser {
    fn default() -> Self {
        Self::with_options(DecodeOptions::default())
    }
}

impl MetaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(opts: DecodeOptions) -> Self {
        Self {
            buffers: Buffers::new(),
            opts,
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.opts
    }

    /// Decodes the metadata of `reader`.
    ///
    /// The image type is sniffed from the first 16 bytes unless
    /// [`DecodeOptions::image_type`] is set. Returns [`crate::Error::NoExif`]
    /// when the container holds no Exif at all.
    #[tracing::instrument(skip_all)]
    pub fn parse<R: ReadAt + ?Sized>(&mut self, reader: &R) -> crate::Result<Exif> {
        let image_type = match self.opts.image_type {
            Some(t) => t,
            None => sniff(reader)?,
        };
        tracing::debug!(%image_type, "decode");

        let opts = &self.opts;
        match image_type {
            ImageType::JPEG => jpeg::read_jpeg(reader, opts),
            ImageType::PNG => png::read_png(reader, opts),
            ImageType::WebP => webp::read_webp(reader, opts),
            ImageType::TIFF
            | ImageType::CR2
            | ImageType::NEF
            | ImageType::ARW
            | ImageType::DNG
            | ImageType::PanaRaw => tiff::read_tiff(reader, image_type, opts),
            ImageType::HEIF => {
                let mut buf = self.buffers.acquire();
                let res = heif::read_heif(reader, &mut buf, opts);
                self.buffers.release(buf);
                res
            }
            ImageType::CR3 => {
                let mut buf = self.buffers.acquire();
                let res = cr3::read_cr3(reader, &mut buf, opts);
                self.buffers.release(buf);
                res
            }
            ImageType::CRW | ImageType::BMP | ImageType::PSD | ImageType::XMP | ImageType::Unknown => {
                Err(crate::Error::UnsupportedImageType(image_type))
            }
        }
    }
}

/// Decodes `reader` with the default options, sniffing its type.
pub fn decode<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    MetaParser::new().parse(reader)
}

pub fn decode_with<R: ReadAt + ?Sized>(reader: &R, opts: DecodeOptions) -> crate::Result<Exif> {
    MetaParser::with_options(opts).parse(reader)
}

fn decode_as<R: ReadAt + ?Sized>(reader: &R, image_type: ImageType) -> crate::Result<Exif> {
    decode_with(reader, DecodeOptions::new().image_type(image_type))
}

pub fn decode_jpeg<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    decode_as(reader, ImageType::JPEG)
}

/// Decodes any TIFF-based file. The returned type is TIFF unless the
/// metadata shows a NEF, ARW or DNG.
pub fn decode_tiff<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    decode_as(reader, ImageType::TIFF)
}

pub fn decode_heif<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    decode_as(reader, ImageType::HEIF)
}

pub fn decode_cr3<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    decode_as(reader, ImageType::CR3)
}

pub fn decode_png<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    decode_as(reader, ImageType::PNG)
}

pub fn decode_webp<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Exif> {
    decode_as(reader, ImageType::WebP)
}
