//! EXIF orientation.
//!
//! Cameras store pixels in sensor order and record how to display them in
//! tag 0x0112 (values 1-8). Decoded pixels are rotated/flipped once, when the
//! image is loaded, so nothing downstream ever deals with orientation.

use std::io::Cursor;

use image::DynamicImage;

/// Rotation (clockwise quarter turns) followed by an optional horizontal flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub quarter_turns: u8,
    pub flip_horizontal: bool,
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        quarter_turns: 0,
        flip_horizontal: false,
    };

    /// Map an EXIF orientation value. Anything outside 1..=8 is `None`.
    pub fn from_exif(value: u32) -> Option<Orientation> {
        let (quarter_turns, flip_horizontal) = match value {
            1 => (0, false),
            2 => (0, true),
            3 => (2, false),
            4 => (2, true),
            5 => (1, true),
            6 => (1, false),
            7 => (3, true),
            8 => (3, false),
            _ => return None,
        };
        Some(Orientation {
            quarter_turns,
            flip_horizontal,
        })
    }

    /// Whether applying this orientation swaps width and height.
    pub fn swaps_dimensions(&self) -> bool {
        self.quarter_turns % 2 == 1
    }

    /// Rotate/flip decoded pixels so they display upright.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        let rotated = match self.quarter_turns % 4 {
            1 => image.rotate90(),
            2 => image.rotate180(),
            3 => image.rotate270(),
            _ => image,
        };
        if self.flip_horizontal {
            rotated.fliph()
        } else {
            rotated
        }
    }
}

/// Result of looking for the orientation tag in a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationTag {
    /// No EXIF block, or no orientation entry in it.
    Absent,
    /// A valid orientation value.
    Valid(Orientation),
    /// A tag with a value outside 1..=8.
    Invalid(u32),
}

impl OrientationTag {
    /// Read the orientation tag from the primary image of an encoded container.
    ///
    /// Containers without EXIF support (BMP, GIF, ...) and unreadable EXIF
    /// blocks count as absent.
    pub fn read(bytes: &[u8]) -> OrientationTag {
        let mut cursor = Cursor::new(bytes);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(e) => {
                log::trace!("No usable EXIF: {}", e);
                return OrientationTag::Absent;
            }
        };

        let Some(value) = exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
        else {
            return OrientationTag::Absent;
        };

        match Orientation::from_exif(value) {
            Some(orientation) => OrientationTag::Valid(orientation),
            None => OrientationTag::Invalid(value),
        }
    }
}
