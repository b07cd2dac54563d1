//! Flash array storage.
//!
//! One owned byte buffer with index-computing views for sectors and pages.
//! Programming can only clear bits; erasing sets a region back to `0xFF`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::ImageError;

/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

/// Array layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Number of erase sectors.
    pub sectors: usize,
    /// Bytes per sector.
    pub sector_size: usize,
    /// Bytes per program page.
    pub page_size: usize,
}

impl Geometry {
    /// M25P80: 16 sectors of 64 KiB, 256-byte pages.
    pub const M25P80: Self = Self {
        sectors: 16,
        sector_size: 64 * 1024,
        page_size: 256,
    };

    /// Total array size in bytes, saturating for layouts that fail [`Geometry::validate`].
    pub const fn size(&self) -> usize {
        self.sectors.saturating_mul(self.sector_size)
    }

    /// Sector containing `address`.
    pub const fn sector_of(&self, address: usize) -> usize {
        address / self.sector_size
    }

    /// Checks the layout, returning a reason when it cannot be used.
    pub const fn validate(&self) -> Result<(), &'static str> {
        if self.sectors == 0 || self.sector_size == 0 || self.page_size == 0 {
            Err("sizes must be non-zero")
        } else if !self.page_size.is_power_of_two() {
            Err("page size must be a power of two")
        } else if self.sector_size % self.page_size != 0 {
            Err("sector size must be a multiple of the page size")
        } else {
            match self.sectors.checked_mul(self.sector_size) {
                Some(size) if size <= 1 << 24 => Ok(()),
                _ => Err("array exceeds the 24-bit address space"),
            }
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::M25P80
    }
}

/// The flash array.
#[derive(Clone, Debug)]
pub struct FlashArray {
    data: Vec<u8>,
    geometry: Geometry,
}

impl FlashArray {
    /// Creates an erased array.
    ///
    /// A layout that fails [`Geometry::validate`] is replaced by [`Geometry::M25P80`].
    pub fn new(geometry: Geometry) -> Self {
        let geometry = if geometry.validate().is_ok() {
            geometry
        } else {
            Geometry::M25P80
        };
        Self {
            data: vec![ERASED; geometry.size()],
            geometry,
        }
    }

    /// Layout.
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Whole array.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// Whole array, mutable.
    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of sector `index`.
    pub fn sector(&self, index: usize) -> &[u8] {
        let size = self.geometry.sector_size;
        &self.data[index * size..(index + 1) * size]
    }

    /// Bytes of page `index`.
    pub fn page(&self, index: usize) -> &[u8] {
        let size = self.geometry.page_size;
        &self.data[index * size..(index + 1) * size]
    }

    /// Reads the byte at `address`, wrapping at the end of the array.
    #[inline]
    pub fn read(&self, address: u32) -> u8 {
        self.data[address as usize % self.data.len()]
    }

    /// Address following `address` for sequential reads.
    pub fn next_read_address(&self, address: u32) -> u32 {
        ((address as usize + 1) % self.data.len()) as u32
    }

    /// ANDs `byte` into the array at `address`.
    #[inline]
    pub fn program(&mut self, address: u32, byte: u8) {
        let len = self.data.len();
        self.data[address as usize % len] &= byte;
    }

    /// Address following `address` for page programming; wraps inside the page.
    pub fn next_program_address(&self, address: u32) -> u32 {
        let page = self.geometry.page_size as u32;
        (address & !(page - 1)) | ((address + 1) & (page - 1))
    }

    /// Erases the sector containing `address`.
    pub fn erase_sector(&mut self, address: u32) {
        let sector = self.geometry.sector_of(address as usize % self.data.len());
        let size = self.geometry.sector_size;
        self.data[sector * size..(sector + 1) * size].fill(ERASED);
    }

    /// Erases the whole array.
    pub fn erase_all(&mut self) {
        self.data.fill(ERASED);
    }

    /// Replaces the contents with an image file.
    ///
    /// The file must be exactly the array size. On any failure the array is left
    /// fully erased and the error is returned.
    pub fn load(&mut self, path: &Path) -> Result<(), ImageError> {
        self.erase_all();
        let bytes = fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.len() != self.data.len() {
            return Err(ImageError::SizeMismatch {
                path: path.to_path_buf(),
                expected: self.data.len(),
                actual: bytes.len(),
            });
        }
        self.data.copy_from_slice(&bytes);
        Ok(())
    }

    /// Writes the contents to an image file.
    pub fn dump(&self, path: &Path) -> Result<(), ImageError> {
        fs::write(path, &self.data).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
