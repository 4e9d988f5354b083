//! Small hand-built meshes for unit tests.

use super::{MeshData, NavMesh, NavMeshParams, PolyData, TileRef, EXT_LINK};

pub(crate) fn test_params() -> NavMeshParams {
    NavMeshParams {
        origin: [0.0, 0.0, 0.0],
        tile_width: 10.0,
        tile_height: 10.0,
        max_tiles: 4096,
        max_polys: 256,
    }
}

/// Tile at grid `(tx, ty)` of `tile_size`, covered by square cells of
/// `cell` size. Each cell is one flat quad at y = 0 with flags 1 and area 0,
/// linked to adjacent cells; edges on the tile border are marked external.
pub(crate) fn cells_tile(
    tx: i32,
    ty: i32,
    tile_size: f32,
    cell: f32,
    cells: &[(u32, u32)],
) -> MeshData {
    let x0 = tx as f32 * tile_size;
    let z0 = ty as f32 * tile_size;
    let per_side = (tile_size / cell).round() as u32;
    let index_of = |cx: i64, cz: i64| {
        cells
            .iter()
            .position(|&(x, z)| x as i64 == cx && z as i64 == cz)
    };

    let mut verts = Vec::new();
    let mut polys = Vec::new();
    for &(cx, cz) in cells {
        let base = verts.len() as u16;
        let (ax, az) = (x0 + cx as f32 * cell, z0 + cz as f32 * cell);
        let (bx, bz) = (ax + cell, az + cell);
        verts.extend_from_slice(&[[ax, 0.0, az], [ax, 0.0, bz], [bx, 0.0, bz], [bx, 0.0, az]]);

        let (cx, cz) = (cx as i64, cz as i64);
        // edge order: -x, +z, +x, -z
        let sides = [
            (cx - 1, cz, cx == 0, 4u16),
            (cx, cz + 1, cz as u32 + 1 == per_side, 2),
            (cx + 1, cz, cx as u32 + 1 == per_side, 0),
            (cx, cz - 1, cz == 0, 6),
        ];
        let mut neis = [0u16; 4];
        for (nei, &(nx, nz, on_border, side)) in neis.iter_mut().zip(sides.iter()) {
            *nei = match index_of(nx, nz) {
                Some(i) => i as u16 + 1,
                None if on_border => EXT_LINK | side,
                None => 0,
            };
        }

        polys.push(PolyData::ground(
            &[base, base + 1, base + 2, base + 3],
            &neis,
            1,
            0,
        ));
    }

    MeshData {
        x: tx,
        y: ty,
        layer: 0,
        user_id: 0,
        walkable_height: 2.0,
        walkable_radius: 0.5,
        walkable_climb: 1.0,
        bmin: [x0, -1.0, z0],
        bmax: [x0 + tile_size, 1.0, z0 + tile_size],
        verts,
        polys,
    }
}

/// Single-quad tile covering the whole of grid cell `(tx, ty)`.
pub(crate) fn quad_tile(tx: i32, ty: i32, size: f32) -> MeshData {
    cells_tile(tx, ty, size, size, &[(0, 0)])
}

pub(crate) fn mesh_from_tiles(params: NavMeshParams, tiles: &[MeshData]) -> NavMesh {
    let mut mesh = NavMesh::new(params).unwrap();
    for tile in tiles {
        mesh.add_tile(&tile.to_bytes(), TileRef::NULL).unwrap();
    }
    mesh
}

/// Tiles (0, 0) and (1, 0), one quad each, sharing the border at x = 10.
pub(crate) fn two_tile_mesh() -> NavMesh {
    mesh_from_tiles(
        test_params(),
        &[quad_tile(0, 0, 10.0), quad_tile(1, 0, 10.0)],
    )
}

/// One 30-unit tile with an L of three 10-unit quads:
/// `(0..10, 0..10)`, `(10..20, 0..10)`, `(10..20, 10..20)` in (x, z).
pub(crate) fn l_mesh() -> NavMesh {
    let mut params = test_params();
    params.tile_width = 30.0;
    params.tile_height = 30.0;
    mesh_from_tiles(
        params,
        &[cells_tile(0, 0, 30.0, 10.0, &[(0, 0), (1, 0), (1, 1)])],
    )
}
