//! An uncompressed BMP container for captures kept at the display's own bit depth.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use thiserror::Error;

use crate::extract::dib_row_stride;

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const BI_RGB: u32 = 0;

/// A bottom-up device independent bitmap at the bit depth of the display it was captured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDib {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Bits per pixel, one of 1, 4, 8, 16, 24, 32.
    pub bit_count: u16,

    /// Colour table as `[blue, green, red, reserved]`, only used for 8 bits per pixel or less.
    pub palette: Vec<[u8; 4]>,

    /// Scan lines from the bottom row up, each padded to a multiple of 4 bytes.
    pub bits: Vec<u8>,
}

impl NativeDib {
    /// Bytes per scan line.
    pub fn row_stride(&self) -> usize {
        dib_row_stride(self.width, self.bit_count)
    }

    /// Checks the bits and palette agree with the header fields.
    pub fn validate(&self) -> Result<(), BmpError> {
        if !matches!(self.bit_count, 1 | 4 | 8 | 16 | 24 | 32) {
            return Err(BmpError::BitCount(self.bit_count));
        }

        let expected = self
            .row_stride()
            .checked_mul(self.height as usize)
            .ok_or(BmpError::TooLarge)?;
        if self.bits.len() != expected {
            return Err(BmpError::ByteCount {
                expected,
                actual: self.bits.len(),
            });
        }

        let max_palette = if self.bit_count <= 8 {
            1usize << self.bit_count
        } else {
            0
        };
        if self.palette.len() > max_palette {
            return Err(BmpError::Palette {
                bit_count: self.bit_count,
                entries: self.palette.len(),
            });
        }

        Ok(())
    }

    /// Writes the bitmap as a `.bmp` file.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), BmpError> {
        self.validate()?;

        let width = i32::try_from(self.width).map_err(|_| BmpError::TooLarge)?;
        let height = i32::try_from(self.height).map_err(|_| BmpError::TooLarge)?;
        let palette_size = u32::try_from(self.palette.len() * 4).map_err(|_| BmpError::TooLarge)?;
        let image_size = u32::try_from(self.bits.len()).map_err(|_| BmpError::TooLarge)?;

        let bits_offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + palette_size;
        let file_size = bits_offset
            .checked_add(image_size)
            .ok_or(BmpError::TooLarge)?;

        // BITMAPFILEHEADER
        writer.write_all(b"BM")?;
        writer.write_all(&file_size.to_le_bytes())?;
        writer.write_all(&0u16.to_le_bytes())?;
        writer.write_all(&0u16.to_le_bytes())?;
        writer.write_all(&bits_offset.to_le_bytes())?;

        // BITMAPINFOHEADER, a positive height marks the rows as bottom-up
        writer.write_all(&INFO_HEADER_SIZE.to_le_bytes())?;
        writer.write_all(&width.to_le_bytes())?;
        writer.write_all(&height.to_le_bytes())?;
        writer.write_all(&1u16.to_le_bytes())?;
        writer.write_all(&self.bit_count.to_le_bytes())?;
        writer.write_all(&BI_RGB.to_le_bytes())?;
        writer.write_all(&image_size.to_le_bytes())?;
        writer.write_all(&0i32.to_le_bytes())?;
        writer.write_all(&0i32.to_le_bytes())?;
        writer.write_all(&(self.palette.len() as u32).to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?;

        for entry in &self.palette {
            writer.write_all(entry)?;
        }

        writer.write_all(&self.bits)?;
        writer.flush()?;

        Ok(())
    }

    /// Encodes the bitmap as the bytes of a `.bmp` file.
    pub fn encode(&self) -> Result<Vec<u8>, BmpError> {
        let mut bytes = Vec::with_capacity(
            (FILE_HEADER_SIZE + INFO_HEADER_SIZE) as usize + self.palette.len() * 4 + self.bits.len(),
        );
        self.write_to(&mut bytes)?;

        Ok(bytes)
    }

    /// Saves the bitmap to a `.bmp` file at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BmpError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

/// A bitmap could not be encoded or written.
#[derive(Debug, Error)]
pub enum BmpError {
    #[error("Failed to write bitmap:\n{0}")]
    Io(#[from] io::Error),

    #[error("Unsupported bit count {0}")]
    BitCount(u16),

    #[error("Expected {expected} bytes of bitmap bits, got {actual}")]
    ByteCount { expected: usize, actual: usize },

    #[error("A {bit_count} bit bitmap cannot have {entries} palette entries")]
    Palette { bit_count: u16, entries: usize },

    #[error("Bitmap is too large for the BMP container")]
    TooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn encode_24_bit() {
        let dib = NativeDib {
            width: 3,
            height: 2,
            bit_count: 24,
            palette: vec![],
            bits: (0..24).collect(),
        };

        let bytes = dib.encode().unwrap();

        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(u32_at(&bytes, 2) as usize, bytes.len());
        assert_eq!(u32_at(&bytes, 10), 54);
        assert_eq!(u32_at(&bytes, 14), 40);
        assert_eq!(u32_at(&bytes, 18), 3);
        assert_eq!(u32_at(&bytes, 22), 2);
        assert_eq!(u16_at(&bytes, 26), 1);
        assert_eq!(u16_at(&bytes, 28), 24);
        assert_eq!(u32_at(&bytes, 34), 24);
        assert_eq!(&bytes[54..], &dib.bits[..]);
    }

    #[test]
    fn encode_8_bit_with_palette() {
        let dib = NativeDib {
            width: 2,
            height: 1,
            bit_count: 8,
            palette: vec![[0, 0, 0, 0], [255, 255, 255, 0]],
            bits: vec![0, 1, 0, 0],
        };

        let bytes = dib.encode().unwrap();

        assert_eq!(u32_at(&bytes, 10), 54 + 8);
        assert_eq!(u32_at(&bytes, 46), 2);
        assert_eq!(&bytes[54..62], &[0, 0, 0, 0, 255, 255, 255, 0]);
        assert_eq!(&bytes[62..], &[0, 1, 0, 0]);
    }

    #[test]
    fn rejects_inconsistent_bits() {
        let mut dib = NativeDib {
            width: 3,
            height: 1,
            bit_count: 16,
            palette: vec![],
            bits: vec![0; 6],
        };
        assert!(matches!(
            dib.encode(),
            Err(BmpError::ByteCount {
                expected: 8,
                actual: 6
            })
        ));

        dib.bits = vec![0; 8];
        dib.palette = vec![[0; 4]];
        assert!(matches!(dib.encode(), Err(BmpError::Palette { .. })));

        dib.palette.clear();
        dib.bit_count = 12;
        assert!(matches!(dib.encode(), Err(BmpError::BitCount(12))));
    }
}
