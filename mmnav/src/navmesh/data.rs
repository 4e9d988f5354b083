//! Detour tile data codec.
//!
//! Layout of the parts this crate reads (little-endian):
//!
//! | Section | Size |
//! |---------|------|
//! | mesh header | 100 bytes |
//! | vertices | `vert_count * 12` |
//! | polygons | `poly_count * 32` |
//!
//! Links, detail meshes, BV nodes and off-mesh connections follow and are
//! skipped when decoding; [`MeshData::to_bytes`] writes them as empty.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::MAX_VERTS_PER_POLY;
use crate::error::{NavError, Result};

/// Magic number of Detour tile data ('DNAV').
pub const DT_NAVMESH_MAGIC: u32 = 0x444E_4156;

/// Detour tile data version.
pub const DT_NAVMESH_VERSION: u32 = 7;

const MESH_HEADER_SIZE: usize = 100;
const VERT_SIZE: usize = 12;
const POLY_SIZE: usize = 32;
const NULL_LINK: u32 = 0xffff_ffff;

/// Kind of polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyType {
    /// Regular walkable polygon.
    Ground,
    /// Two-vertex off-mesh connection; not traversed by this crate.
    OffMeshConnection,
}

/// One polygon as stored in tile data.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyData {
    /// Indices into [`MeshData::verts`].
    pub verts: [u16; MAX_VERTS_PER_POLY],
    /// Per-edge neighbour: 0 = border, `n` = polygon `n - 1` of this tile,
    /// `EXT_LINK | side` = continues in the neighbouring tile on `side`.
    pub neis: [u16; MAX_VERTS_PER_POLY],
    pub vert_count: u8,
    /// Surface category flags tested by the query filter.
    pub flags: u16,
    /// Area id (0..64).
    pub area: u8,
    pub poly_type: PolyType,
}

impl PolyData {
    /// Build a ground polygon.
    ///
    /// # Panics
    ///
    /// Panics if `verts` and `neis` differ in length or hold more than
    /// [`MAX_VERTS_PER_POLY`] entries.
    pub fn ground(verts: &[u16], neis: &[u16], flags: u16, area: u8) -> Self {
        assert_eq!(verts.len(), neis.len());
        assert!(verts.len() <= MAX_VERTS_PER_POLY);

        let mut poly = Self {
            verts: [0; MAX_VERTS_PER_POLY],
            neis: [0; MAX_VERTS_PER_POLY],
            vert_count: verts.len() as u8,
            flags,
            area: area & 0x3f,
            poly_type: PolyType::Ground,
        };
        poly.verts[..verts.len()].copy_from_slice(verts);
        poly.neis[..neis.len()].copy_from_slice(neis);
        poly
    }

    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let _first_link = reader.read_u32::<LittleEndian>()?;

        let mut verts = [0u16; MAX_VERTS_PER_POLY];
        for v in &mut verts {
            *v = reader.read_u16::<LittleEndian>()?;
        }

        let mut neis = [0u16; MAX_VERTS_PER_POLY];
        for n in &mut neis {
            *n = reader.read_u16::<LittleEndian>()?;
        }

        let flags = reader.read_u16::<LittleEndian>()?;
        let vert_count = reader.read_u8()?;
        let area_and_type = reader.read_u8()?;

        let poly_type = if area_and_type >> 6 == 1 {
            PolyType::OffMeshConnection
        } else {
            PolyType::Ground
        };

        Ok(Self {
            verts,
            neis,
            vert_count,
            flags,
            area: area_and_type & 0x3f,
            poly_type,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(NULL_LINK)?;
        for &v in &self.verts {
            writer.write_u16::<LittleEndian>(v)?;
        }
        for &n in &self.neis {
            writer.write_u16::<LittleEndian>(n)?;
        }
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u8(self.vert_count)?;
        let kind = match self.poly_type {
            PolyType::Ground => 0,
            PolyType::OffMeshConnection => 1,
        };
        writer.write_u8((self.area & 0x3f) | (kind << 6))?;
        Ok(())
    }
}

/// Decoded tile data.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Tile coordinate along x.
    pub x: i32,
    /// Tile coordinate along z.
    pub y: i32,
    pub layer: i32,
    pub user_id: u32,
    pub walkable_height: f32,
    pub walkable_radius: f32,
    pub walkable_climb: f32,
    pub bmin: [f32; 3],
    pub bmax: [f32; 3],
    pub verts: Vec<[f32; 3]>,
    pub polys: Vec<PolyData>,
}

impl MeshData {
    /// Decode tile data.
    ///
    /// # Errors
    ///
    /// - [`NavError::WrongMagic`] / [`NavError::WrongVersion`] for foreign data
    /// - [`NavError::InvalidData`] for truncated data, negative counts, or
    ///   polygons referencing missing vertices
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MESH_HEADER_SIZE {
            return Err(NavError::InvalidData(format!(
                "tile data is {} bytes, smaller than the {}-byte header",
                data.len(),
                MESH_HEADER_SIZE
            )));
        }

        let mut cursor = Cursor::new(data);

        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != DT_NAVMESH_MAGIC {
            return Err(NavError::WrongMagic {
                found: magic,
                expected: DT_NAVMESH_MAGIC,
            });
        }
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != DT_NAVMESH_VERSION {
            return Err(NavError::WrongVersion {
                what: "navmesh",
                found: version,
                expected: DT_NAVMESH_VERSION,
            });
        }

        let x = cursor.read_i32::<LittleEndian>()?;
        let y = cursor.read_i32::<LittleEndian>()?;
        let layer = cursor.read_i32::<LittleEndian>()?;
        let user_id = cursor.read_u32::<LittleEndian>()?;
        let poly_count = read_count(&mut cursor, "poly")?;
        let vert_count = read_count(&mut cursor, "vert")?;
        // max link, detail mesh/vert/tri, bv node, off-mesh counts and base
        for _ in 0..7 {
            cursor.read_i32::<LittleEndian>()?;
        }
        let walkable_height = cursor.read_f32::<LittleEndian>()?;
        let walkable_radius = cursor.read_f32::<LittleEndian>()?;
        let walkable_climb = cursor.read_f32::<LittleEndian>()?;
        let bmin = read_vec3(&mut cursor)?;
        let bmax = read_vec3(&mut cursor)?;
        let _bv_quant_factor = cursor.read_f32::<LittleEndian>()?;

        let needed = MESH_HEADER_SIZE + vert_count * VERT_SIZE + poly_count * POLY_SIZE;
        if data.len() < needed {
            return Err(NavError::InvalidData(format!(
                "tile data is {} bytes, header describes at least {}",
                data.len(),
                needed
            )));
        }

        let mut verts = Vec::with_capacity(vert_count);
        for _ in 0..vert_count {
            verts.push(read_vec3(&mut cursor)?);
        }

        let mut polys = Vec::with_capacity(poly_count);
        for i in 0..poly_count {
            let poly = PolyData::read_from(&mut cursor)?;
            let nv = poly.vert_count as usize;
            let min_verts = match poly.poly_type {
                PolyType::Ground => 3,
                PolyType::OffMeshConnection => 2,
            };
            if nv < min_verts || nv > MAX_VERTS_PER_POLY {
                return Err(NavError::InvalidData(format!(
                    "polygon {} has {} vertices",
                    i, nv
                )));
            }
            if let Some(&v) = poly.verts[..nv].iter().find(|&&v| v as usize >= vert_count) {
                return Err(NavError::InvalidData(format!(
                    "polygon {} references vertex {} of {}",
                    i, v, vert_count
                )));
            }
            polys.push(poly);
        }

        Ok(Self {
            x,
            y,
            layer,
            user_id,
            walkable_height,
            walkable_radius,
            walkable_climb,
            bmin,
            bmax,
            verts,
            polys,
        })
    }

    /// Encode as tile data with empty link, detail, BV and off-mesh sections.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            MESH_HEADER_SIZE + self.verts.len() * VERT_SIZE + self.polys.len() * POLY_SIZE,
        );
        // Writes into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(DT_NAVMESH_MAGIC)?;
        w.write_u32::<LittleEndian>(DT_NAVMESH_VERSION)?;
        w.write_i32::<LittleEndian>(self.x)?;
        w.write_i32::<LittleEndian>(self.y)?;
        w.write_i32::<LittleEndian>(self.layer)?;
        w.write_u32::<LittleEndian>(self.user_id)?;
        w.write_i32::<LittleEndian>(self.polys.len() as i32)?;
        w.write_i32::<LittleEndian>(self.verts.len() as i32)?;
        for _ in 0..6 {
            w.write_i32::<LittleEndian>(0)?;
        }
        w.write_i32::<LittleEndian>(self.polys.len() as i32)?; // off-mesh base
        w.write_f32::<LittleEndian>(self.walkable_height)?;
        w.write_f32::<LittleEndian>(self.walkable_radius)?;
        w.write_f32::<LittleEndian>(self.walkable_climb)?;
        for &v in self.bmin.iter().chain(self.bmax.iter()) {
            w.write_f32::<LittleEndian>(v)?;
        }
        w.write_f32::<LittleEndian>(0.0)?;

        for v in &self.verts {
            for &c in v {
                w.write_f32::<LittleEndian>(c)?;
            }
        }
        for p in &self.polys {
            p.write_to(w)?;
        }
        Ok(())
    }
}

fn read_count<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let n = reader.read_i32::<LittleEndian>()?;
    usize::try_from(n).map_err(|_| NavError::InvalidData(format!("negative {} count {}", what, n)))
}

fn read_vec3<R: Read>(reader: &mut R) -> std::io::Result<[f32; 3]> {
    Ok([
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ])
}
