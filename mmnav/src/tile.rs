//! Movement-map tile files.
//!
//! Every `.mmtile` file starts with a fixed 20-byte [`TileHeader`] followed by
//! exactly `header.size` bytes of navigation mesh tile data. The payload is
//! opaque here and handed to [`NavMesh::add_tile`](crate::navmesh::NavMesh::add_tile).

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use crate::error::{NavError, Result};
use crate::navmesh::DT_NAVMESH_VERSION;

/// Magic number of movement-map tile files ('MMAP').
pub const MMAP_MAGIC: u32 = 0x4D4D_4150;

/// Size of the on-disk tile header in bytes.
pub const TILE_HEADER_SIZE: usize = 20;

/// Header preceding every tile payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileHeader {
    /// Must equal [`MMAP_MAGIC`].
    pub magic: u32,
    /// Navigation mesh data version the payload was built with.
    pub dt_version: u32,
    /// Version of the movement-map generator.
    pub mmap_version: u32,
    /// Payload size in bytes.
    pub size: u32,
    /// Whether the tile was generated with liquid surfaces.
    pub uses_liquids: bool,
}

/// The header values a loader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFormat {
    pub magic: u32,
    pub dt_version: u32,
    /// `None` accepts any generator version.
    pub mmap_version: Option<u32>,
}

impl Default for TileFormat {
    fn default() -> Self {
        Self {
            magic: MMAP_MAGIC,
            dt_version: DT_NAVMESH_VERSION,
            mmap_version: None,
        }
    }
}

impl TileHeader {
    /// Create a header for a payload of `size` bytes with current versions.
    pub fn new(size: u32, mmap_version: u32, uses_liquids: bool) -> Self {
        Self {
            magic: MMAP_MAGIC,
            dt_version: DT_NAVMESH_VERSION,
            mmap_version,
            size,
            uses_liquids,
        }
    }

    /// Read a header from a reader. Padding bytes are consumed and ignored.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        let dt_version = reader.read_u32::<LittleEndian>()?;
        let mmap_version = reader.read_u32::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;
        let uses_liquids = reader.read_u8()? != 0;
        let mut padding = [0u8; 3];
        reader.read_exact(&mut padding)?;

        Ok(Self {
            magic,
            dt_version,
            mmap_version,
            size,
            uses_liquids,
        })
    }

    /// Write the header, including zeroed padding.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.dt_version)?;
        writer.write_u32::<LittleEndian>(self.mmap_version)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u8(self.uses_liquids as u8)?;
        writer.write_all(&[0u8; 3])?;
        Ok(())
    }

    /// Check magic and versions against `format`.
    pub fn validate(&self, format: &TileFormat) -> Result<()> {
        if self.magic != format.magic {
            return Err(NavError::WrongMagic {
                found: self.magic,
                expected: format.magic,
            });
        }
        if self.dt_version != format.dt_version {
            return Err(NavError::WrongVersion {
                what: "navmesh",
                found: self.dt_version,
                expected: format.dt_version,
            });
        }
        if let Some(expected) = format.mmap_version {
            if self.mmap_version != expected {
                return Err(NavError::WrongVersion {
                    what: "mmap",
                    found: self.mmap_version,
                    expected,
                });
            }
        }
        Ok(())
    }
}

/// A memory-mapped tile file with a validated header.
///
/// # Example
///
/// ```ignore
/// use mmnav::tile::{TileFile, TileFormat};
///
/// let tile = TileFile::open("mmaps/0003248.mmtile", &TileFormat::default())?;
/// println!("{} payload bytes", tile.payload().len());
/// ```
pub struct TileFile {
    /// Memory-mapped file data
    data: Mmap,
    header: TileHeader,
    path: PathBuf,
}

impl TileFile {
    /// Open and validate a tile file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or memory-mapped
    /// - The file is shorter than the header or than `header.size` payload bytes
    /// - The header magic or versions do not match `format`
    pub fn open<P: AsRef<Path>>(path: P, format: &TileFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and don't expose the mapping.
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < TILE_HEADER_SIZE {
            return Err(NavError::ShortRead {
                path,
                expected: TILE_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let header = TileHeader::read_from(&mut &data[..TILE_HEADER_SIZE])?;
        header.validate(format)?;

        let available = data.len() - TILE_HEADER_SIZE;
        if available < header.size as usize {
            return Err(NavError::ShortRead {
                path,
                expected: header.size as usize,
                actual: available,
            });
        }

        Ok(Self { data, header, path })
    }

    /// The decoded header.
    pub fn header(&self) -> &TileHeader {
        &self.header
    }

    /// Exactly `header.size` bytes of tile data.
    pub fn payload(&self) -> &[u8] {
        &self.data[TILE_HEADER_SIZE..TILE_HEADER_SIZE + self.header.size as usize]
    }

    /// Path the tile was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
