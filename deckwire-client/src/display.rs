//! Display surfaces and the framebuffer write protocol.
//!
//! Pixels travel as 16-bit 5-6-5 color. A framebuffer write carries a
//! 10-byte header (surface address, x, y, width, height, all big-endian
//! u16) followed by the pixel data; the panel repaints only when a refresh
//! command follows.

use crate::error::ClientError;
use bytes::{BufMut, BytesMut};
use std::collections::HashMap;

/// A 16-bit 5-6-5 packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Rgb565 = Rgb565(0x0000);
    pub const WHITE: Rgb565 = Rgb565(0xffff);

    /// Packs 8-bit RGB into 5-6-5.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Rgb565 {
        Rgb565(((r as u16 & 0xf8) << 8) | ((g as u16 & 0xfc) << 3) | (b as u16 >> 3))
    }

    /// Wire byte order for one pixel: (low, high) unless the surface wants
    /// its pixels big-endian.
    pub fn to_wire(self, big_endian: bool) -> [u8; 2] {
        if big_endian {
            self.0.to_be_bytes()
        } else {
            self.0.to_le_bytes()
        }
    }
}

/// A rectangular buffer of already-rendered pixels.
///
/// Rendering (text layout, icons) happens outside this crate; the engine
/// only moves finished pixels to the hardware.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    pixels: Vec<Rgb565>,
}

impl Framebuffer {
    /// An all-black buffer.
    pub fn new(width: u16, height: u16) -> Self {
        Self::filled(width, height, Rgb565::BLACK)
    }

    /// A buffer filled with one color.
    pub fn filled(width: u16, height: u16, color: Rgb565) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Sets one pixel.
    ///
    /// # Panics
    ///
    /// Panics when the coordinate is outside the buffer.
    pub fn set(&mut self, x: u16, y: u16, color: Rgb565) {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.pixels[y as usize * self.width as usize + x as usize] = color;
    }

    pub fn get(&self, x: u16, y: u16) -> Rgb565 {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    fn put_pixels(&self, buf: &mut BytesMut, big_endian: bool) {
        for pixel in &self.pixels {
            buf.put_slice(&pixel.to_wire(big_endian));
        }
    }
}

/// One addressable display region.
///
/// Surfaces are fixed per hardware model and never change after the model
/// table is built. On the unified panels several logical surfaces share one
/// address and differ only by their compositing offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub name: &'static str,
    /// Protocol address byte.
    pub id: u8,
    pub width: u16,
    pub height: u16,
    /// Compositing offset applied to every draw on this surface.
    pub offset_x: u16,
    pub offset_y: u16,
    /// Pixel byte order on the wire.
    pub big_endian: bool,
}

const fn surface(
    name: &'static str,
    id: u8,
    width: u16,
    height: u16,
    offset_x: u16,
    offset_y: u16,
    big_endian: bool,
) -> Surface {
    Surface {
        name,
        id,
        width,
        height,
        offset_x,
        offset_y,
        big_endian,
    }
}

// First-generation large console: separately addressed sub-panels plus the
// big-endian dial screen. The mosaic offsets apply here too.
const FIRST_GEN_CONSOLE: &[Surface] = &[
    surface("left", b'L', 60, 270, 0, 0, false),
    surface("main", b'A', 360, 270, 60, 0, false),
    surface("right", b'R', 60, 270, 420, 0, false),
    surface("dial", b'W', 240, 240, 0, 0, true),
];

// Second-generation large console: one unified panel addressed as a mosaic
// of the legacy sub-panels, plus the dial screen.
const SECOND_GEN_CONSOLE: &[Surface] = &[
    surface("left", b'M', 60, 270, 0, 0, false),
    surface("main", b'M', 360, 270, 60, 0, false),
    surface("right", b'M', 60, 270, 420, 0, false),
    surface("all", b'M', 480, 270, 0, 0, false),
    surface("dial", b'W', 240, 240, 0, 0, true),
];

const UNIFIED_PANEL: &[Surface] = &[
    surface("left", b'M', 60, 270, 0, 0, false),
    surface("main", b'M', 360, 270, 60, 0, false),
    surface("right", b'M', 60, 270, 420, 0, false),
    surface("all", b'M', 480, 270, 0, 0, false),
];

/// Builds the read-only surface table for a product code.
///
/// An unrecognized code fails construction of the whole device; there is no
/// sensible partial table to fall back to.
pub(crate) fn surface_table(
    product: &str,
) -> Result<HashMap<&'static str, Surface>, ClientError> {
    let surfaces = match product {
        "0003" => {
            tracing::info!("using first-generation large console surfaces");
            FIRST_GEN_CONSOLE
        }
        "0007" => {
            tracing::info!("using second-generation large console surfaces");
            SECOND_GEN_CONSOLE
        }
        "0004" => {
            tracing::info!("using standard console surfaces");
            UNIFIED_PANEL
        }
        "0006" | "0d06" => {
            tracing::info!("using compact console surfaces");
            UNIFIED_PANEL
        }
        other => return Err(ClientError::UnknownModel(other.to_string())),
    };

    Ok(surfaces.iter().map(|s| (s.name, *s)).collect())
}

/// Builds the framebuffer-write payload: address, composed coordinates,
/// dimensions, then the pixels in the surface's byte order.
pub(crate) fn framebuffer_payload(
    surface: &Surface,
    fb: &Framebuffer,
    x_off: u16,
    y_off: u16,
) -> BytesMut {
    let npixels = fb.width() as usize * fb.height() as usize;
    let mut data = BytesMut::with_capacity(10 + npixels * 2);
    data.put_u16(surface.id as u16);
    data.put_u16(x_off + surface.offset_x);
    data.put_u16(y_off + surface.offset_y);
    data.put_u16(fb.width());
    data.put_u16(fb.height());
    fb.put_pixels(&mut data, surface.big_endian);
    data
}

/// Builds the refresh payload: just the surface address.
pub(crate) fn refresh_payload(surface: &Surface) -> BytesMut {
    let mut data = BytesMut::with_capacity(2);
    data.put_u16(surface.id as u16);
    data
}
