//! Map-level navigation mesh parameters (`.mmap` files).

use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{NavError, Result};

/// Size of the on-disk parameters record in bytes.
pub const NAVMESH_PARAMS_SIZE: usize = 28;

/// Parameters shared by every tile of a map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavMeshParams {
    /// World-space origin of tile (0, 0).
    pub origin: [f32; 3],
    /// Tile extent along x.
    pub tile_width: f32,
    /// Tile extent along z.
    pub tile_height: f32,
    /// Maximum number of tiles the mesh may hold.
    pub max_tiles: i32,
    /// Maximum number of polygons per tile.
    pub max_polys: i32,
}

impl NavMeshParams {
    /// Read a parameters record.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            origin: [
                reader.read_f32::<LittleEndian>()?,
                reader.read_f32::<LittleEndian>()?,
                reader.read_f32::<LittleEndian>()?,
            ],
            tile_width: reader.read_f32::<LittleEndian>()?,
            tile_height: reader.read_f32::<LittleEndian>()?,
            max_tiles: reader.read_i32::<LittleEndian>()?,
            max_polys: reader.read_i32::<LittleEndian>()?,
        })
    }

    /// Write a parameters record.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for &v in &self.origin {
            writer.write_f32::<LittleEndian>(v)?;
        }
        writer.write_f32::<LittleEndian>(self.tile_width)?;
        writer.write_f32::<LittleEndian>(self.tile_height)?;
        writer.write_i32::<LittleEndian>(self.max_tiles)?;
        writer.write_i32::<LittleEndian>(self.max_polys)?;
        Ok(())
    }

    /// Load parameters from a `.mmap` file.
    ///
    /// # Errors
    ///
    /// - [`NavError::ParamsNotFound`] if the file does not exist
    /// - [`NavError::ShortRead`] if it holds fewer than [`NAVMESH_PARAMS_SIZE`] bytes
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(NavError::ParamsNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < NAVMESH_PARAMS_SIZE {
            return Err(NavError::ShortRead {
                path: path.to_path_buf(),
                expected: NAVMESH_PARAMS_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self::read_from(&mut bytes.as_slice())?)
    }
}
