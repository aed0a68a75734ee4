use crate::cli::RenderRequest;
use crate::error::QrgenError;
use crate::page::StructuredAppend;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use log::{debug, info};
use qrcodegen::{QrCode, QrCodeEcc, Version};
use std::io::Cursor;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Every symbol is encoded at the highest error correction level.
const EC_LEVEL: QrCodeEcc = QrCodeEcc::High;

/// Modules of light border drawn around the symbol on every side.
const QUIET_ZONE: u32 = 4;

const MODE_STRUCTURED_APPEND: u32 = 0b0011;
const MODE_BYTE: u32 = 0b0100;
const PAD_CODEWORDS: [u8; 2] = [0xEC, 0x11];

// Error correction layout at level H, indexed by version - 1.
const ECC_CODEWORDS_PER_BLOCK: [u16; 40] = [
    17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
    30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
];
const ECC_BLOCKS: [u16; 40] = [
    1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37,
    40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
];

/// An encoded QR symbol plus the colors it will be rasterized with.
pub struct Symbol {
    code: QrCode,
    pub foreground: Rgba<u8>,
    pub background: Rgba<u8>,
}

impl Symbol {
    pub fn new(request: &RenderRequest) -> Result<Self, QrgenError> {
        let code = match request.page {
            None => QrCode::encode_text(&request.content, EC_LEVEL)
                .map_err(|e| QrgenError::Encoding(e.to_string()))?,
            Some(page) => encode_with_page(request.content.as_bytes(), page)?,
        };

        let symbol = Self {
            code,
            foreground: BLACK,
            background: WHITE,
        };
        info!(
            "encoded {} byte(s) as {}x{} modules",
            request.content.len(),
            symbol.width(),
            symbol.width()
        );
        Ok(symbol)
    }

    /// Width of the symbol in modules, without the quiet zone.
    pub fn width(&self) -> usize {
        self.code.size() as usize
    }

    pub fn invert_colors(&mut self) {
        std::mem::swap(&mut self.foreground, &mut self.background);
    }

    /// Whether the module at `(x, y)` is dark. Coordinates may fall in the
    /// quiet zone, where every module is light.
    fn is_dark(&self, x: i32, y: i32) -> bool {
        self.code.get_module(x, y)
    }

    /// Renders the symbol as block characters, two per module, with every
    /// row (the last included) ending in a newline.
    ///
    /// Dark modules are blank unless `invert` is set, which reads
    /// correctly on a dark terminal background.
    pub fn to_text_art(&self, invert: bool) -> String {
        let quiet = QUIET_ZONE as i32;
        let size = self.code.size();
        let mut art = String::new();
        for y in -quiet..size + quiet {
            for x in -quiet..size + quiet {
                if self.is_dark(x, y) != invert {
                    art.push_str("  ");
                } else {
                    art.push_str("██");
                }
            }
            art.push('\n');
        }
        art
    }

    /// Rasterizes the symbol onto a `size` x `size` PNG.
    ///
    /// A negative `size` is read as pixels per module instead.
    pub fn to_png(&self, size: i32) -> Result<Vec<u8>, QrgenError> {
        let real = self.width() as u32 + 2 * QUIET_ZONE;
        let (size, module_px, offset) = canvas_geometry(size, real);
        debug!(
            "rasterizing {} modules at {}px per module onto {}x{} canvas",
            real, module_px, size, size
        );

        let canvas = RgbaImage::from_fn(size, size, |px, py| {
            if px < offset || py < offset {
                return self.background;
            }
            let x = ((px - offset) / module_px) as i32 - QUIET_ZONE as i32;
            let y = ((py - offset) / module_px) as i32 - QUIET_ZONE as i32;
            if self.is_dark(x, y) {
                self.foreground
            } else {
                self.background
            }
        });

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }
}

/// Returns `(canvas size, pixels per module, offset)` for a symbol
/// `real` modules wide, quiet zone included.
fn canvas_geometry(size: i32, real: u32) -> (u32, u32, u32) {
    let mut size = if size < 0 {
        size.unsigned_abs().saturating_mul(real)
    } else {
        size as u32
    };
    if size < real {
        size = real;
    }

    let module_px = size / real;
    let offset = (size - real * module_px) / 2;
    (size, module_px, offset)
}

/// Data codewords a level H symbol of `version` holds.
fn data_codewords(version: u8) -> usize {
    let v = version as usize;
    let mut raw_modules = (16 * v + 128) * v + 64;
    if v >= 2 {
        let align = v / 7 + 2;
        raw_modules -= (25 * align - 10) * align - 55;
        if v >= 7 {
            raw_modules -= 36;
        }
    }
    raw_modules / 8 - (ECC_CODEWORDS_PER_BLOCK[v - 1] * ECC_BLOCKS[v - 1]) as usize
}

#[derive(Default)]
struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    fn push(&mut self, value: u32, len: usize) {
        for i in (0..len).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    fn len(&self) -> usize {
        self.bits.len()
    }

    fn into_codewords(self) -> Vec<u8> {
        self.bits
            .chunks(8)
            .map(|byte| byte.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
            .collect()
    }
}

/// Encodes `data` behind a structured append header, in the smallest
/// version that holds both.
fn encode_with_page(data: &[u8], page: StructuredAppend) -> Result<QrCode, QrgenError> {
    for v in Version::MIN.value()..=Version::MAX.value() {
        if let Some(codewords) = structured_codewords(data, v, page) {
            debug!("structured append {:?} fits in version {}", page, v);
            return Ok(QrCode::encode_codewords(Version::new(v), EC_LEVEL, &codewords, None));
        }
    }
    Err(QrgenError::Encoding(format!(
        "{} byte(s) do not fit in any version with a structured append header",
        data.len()
    )))
}

/// Lays out the full data codeword sequence for `version`: structured
/// append header, one byte mode segment, terminator and padding.
/// Returns `None` when the data does not fit.
fn structured_codewords(data: &[u8], version: u8, page: StructuredAppend) -> Option<Vec<u8>> {
    let capacity = data_codewords(version);
    let count_bits = if version <= 9 { 8 } else { 16 };
    if data.len() >= 1 << count_bits {
        return None;
    }

    let mut bits = BitWriter::default();
    bits.push(MODE_STRUCTURED_APPEND, 4);
    bits.push(page.current as u32, 4);
    bits.push(page.last as u32, 4);
    bits.push(page.parity as u32, 8);
    bits.push(MODE_BYTE, 4);
    bits.push(data.len() as u32, count_bits);
    for &byte in data {
        bits.push(byte as u32, 8);
    }
    if bits.len() > capacity * 8 {
        return None;
    }

    let terminator = (capacity * 8 - bits.len()).min(4);
    bits.push(0, terminator);
    let fill = (8 - bits.len() % 8) % 8;
    bits.push(0, fill);

    let mut codewords = bits.into_codewords();
    let missing = capacity - codewords.len();
    codewords.extend(PAD_CODEWORDS.iter().cycle().take(missing));
    Some(codewords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str, page: Option<StructuredAppend>) -> RenderRequest {
        RenderRequest {
            content: content.to_string(),
            page,
        }
    }

    fn page(current: u8, last: u8, parity: u8) -> StructuredAppend {
        StructuredAppend {
            current,
            last,
            parity,
        }
    }

    fn decode_png(png: &[u8]) -> String {
        let img = image::load_from_memory(png).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1);
        let (_, content) = grids[0].decode().unwrap();
        content
    }

    #[test]
    fn png_decodes_back_to_content() {
        let symbol = Symbol::new(&request("hello world", None)).unwrap();
        let png = symbol.to_png(256).unwrap();
        assert_eq!(decode_png(&png), "hello world");
    }

    #[test]
    fn png_has_requested_size() {
        let symbol = Symbol::new(&request("hello", None)).unwrap();
        let img = image::load_from_memory(&symbol.to_png(300).unwrap()).unwrap();
        assert_eq!((img.width(), img.height()), (300, 300));
    }

    #[test]
    fn negative_size_is_pixels_per_module() {
        let symbol = Symbol::new(&request("hello", None)).unwrap();
        let real = symbol.width() as u32 + 2 * QUIET_ZONE;
        let img = image::load_from_memory(&symbol.to_png(-3).unwrap()).unwrap();
        assert_eq!(img.width(), real * 3);
    }

    #[test]
    fn tiny_size_grows_to_one_pixel_per_module() {
        let symbol = Symbol::new(&request("hello", None)).unwrap();
        let real = symbol.width() as u32 + 2 * QUIET_ZONE;
        let img = image::load_from_memory(&symbol.to_png(1).unwrap()).unwrap();
        assert_eq!(img.width(), real);
    }

    #[test]
    fn canvas_geometry_centers_symbol() {
        assert_eq!(canvas_geometry(256, 29), (256, 8, 12));
        assert_eq!(canvas_geometry(-2, 29), (58, 2, 0));
        assert_eq!(canvas_geometry(0, 29), (29, 1, 0));
    }

    #[test]
    fn inverting_swaps_quiet_zone_color() {
        let mut symbol = Symbol::new(&request("hello", None)).unwrap();
        let plain = image::load_from_memory(&symbol.to_png(128).unwrap()).unwrap().to_rgba8();
        symbol.invert_colors();
        let inverted = image::load_from_memory(&symbol.to_png(128).unwrap()).unwrap().to_rgba8();

        assert_eq!(*plain.get_pixel(0, 0), WHITE);
        assert_eq!(*inverted.get_pixel(0, 0), BLACK);
        for (a, b) in plain.pixels().zip(inverted.pixels()) {
            assert_ne!(a, b);
        }
    }

    #[test]
    fn text_art_uses_two_columns_per_module() {
        let symbol = Symbol::new(&request("hello", None)).unwrap();
        let art = symbol.to_text_art(false);
        let real = symbol.width() + 2 * QUIET_ZONE as usize;
        let lines: Vec<&str> = art.lines().collect();
        assert_eq!(lines.len(), real);
        assert_eq!(lines[0].chars().count(), real * 2);
        // quiet zone is light
        assert!(lines[0].chars().all(|c| c == '█'));
    }

    #[test]
    fn inverted_text_art_swaps_glyphs() {
        let symbol = Symbol::new(&request("hello", None)).unwrap();
        let plain = symbol.to_text_art(false);
        let inverted = symbol.to_text_art(true);
        let swapped: String = plain
            .chars()
            .map(|c| match c {
                '█' => ' ',
                ' ' => '█',
                other => other,
            })
            .collect();
        assert_eq!(inverted, swapped);
    }

    #[test]
    fn text_art_rows_end_with_newline() {
        let symbol = Symbol::new(&request("hello", None)).unwrap();
        let art = symbol.to_text_art(false);
        assert!(art.ends_with('\n'));
        assert!(!art.ends_with("\n\n"));
    }

    #[test]
    fn data_codewords_match_level_h_capacity() {
        assert_eq!(data_codewords(1), 9);
        assert_eq!(data_codewords(2), 16);
        assert_eq!(data_codewords(7), 66);
        assert_eq!(data_codewords(10), 122);
        assert_eq!(data_codewords(40), 1276);
    }

    #[test]
    fn structured_header_carries_indices_and_parity() {
        let codewords = structured_codewords(b"hello", 1, page(1, 2, 0x11)).unwrap();
        assert_eq!(
            codewords,
            vec![0x31, 0x21, 0x14, 0x05, b'h', b'e', b'l', b'l', b'o']
        );

        let codewords = structured_codewords(b"x", 1, page(15, 15, 0xFF)).unwrap();
        assert_eq!(&codewords[..3], &[0x3F, 0xFF, 0xF4]);
    }

    #[test]
    fn structured_codewords_are_terminated_and_padded() {
        let codewords = structured_codewords(b"a", 1, page(0, 1, 0)).unwrap();
        assert_eq!(
            codewords,
            vec![0x30, 0x10, 0x04, 0x01, 0x61, 0x00, 0xEC, 0x11, 0xEC]
        );
    }

    #[test]
    fn structured_codewords_use_wide_count_from_version_10() {
        let data = vec![b'z'; 3];
        let codewords = structured_codewords(&data, 10, page(0, 0, 0)).unwrap();
        assert_eq!(codewords.len(), data_codewords(10));
        // 16-bit count fills bytes 3 and 4
        assert_eq!(&codewords[..5], &[0x30, 0x00, 0x04, 0x00, 0x03]);
    }

    #[test]
    fn structured_append_uses_smallest_version() {
        let paged = Symbol::new(&request("hello", Some(page(1, 2, 0x11)))).unwrap();
        assert_eq!(paged.width(), 21);
        assert!(structured_codewords(b"hello!", 1, page(1, 2, 0x11)).is_none());
        let longer = Symbol::new(&request("hello!", Some(page(1, 2, 0x11)))).unwrap();
        assert_eq!(longer.width(), 25);
    }

    #[test]
    fn structured_append_fills_version_40() {
        let fits = "x".repeat(1271);
        assert!(Symbol::new(&request(&fits, Some(page(0, 1, 0)))).is_ok());
        let too_long = "x".repeat(1272);
        assert!(matches!(
            Symbol::new(&request(&too_long, Some(page(0, 1, 0)))),
            Err(QrgenError::Encoding(_))
        ));
    }

    #[test]
    fn content_too_long_is_an_encoding_error() {
        let content = "x".repeat(4000);
        assert!(matches!(
            Symbol::new(&request(&content, None)),
            Err(QrgenError::Encoding(_))
        ));
        assert!(matches!(
            Symbol::new(&request(&content, Some(page(0, 1, 0)))),
            Err(QrgenError::Encoding(_))
        ));
    }
}
