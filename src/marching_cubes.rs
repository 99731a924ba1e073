//! Iso-surface extraction with the classic marching cubes case table.
//!
//! Each grid edge crossed by the surface produces exactly one vertex, shared
//! by every triangle that touches it, so the output mesh is welded. Edge
//! vertices are cached in two alternating z-slabs to keep memory at two
//! slices regardless of volume depth.

#![allow(clippy::unreadable_literal, clippy::too_many_arguments)]

use glam::Vec3;
use ndarray::ArrayView3;
use web_time::Instant;

use crate::poly_data::PolyData;
use crate::volume::Volume;

/// Extracts the surface where `volume == iso_value`.
///
/// Vertices are placed by linear interpolation along grid edges and
/// returned in world coordinates. Normals are left empty. Volumes with
/// fewer than two samples along any axis produce an empty mesh.
pub fn marching_cubes(volume: &Volume, iso_value: f32) -> PolyData {
    let (nx, ny, nz) = volume.dimensions();
    if nx < 2 || ny < 2 || nz < 2 {
        return PolyData::default();
    }
    let started = Instant::now();

    let field = volume.view();
    let mut extractor = Extractor {
        field: &field,
        iso_value,
        size: [nx, ny, nz],
        slab: vec![[0; 3]; nx * ny * 2],
        points: Vec::new(),
        triangles: Vec::new(),
    };
    extractor.run();

    let origin = volume.origin_vec();
    let spacing = volume.spacing_vec();
    let points = extractor
        .points
        .into_iter()
        .map(|p| origin + p * spacing)
        .collect();

    let mesh = PolyData {
        points,
        normals: Vec::new(),
        triangles: extractor.triangles,
    };
    log::info!(
        "Marching cubes at {iso_value}: {} points, {} triangles in {:.2?}",
        mesh.num_points(),
        mesh.num_triangles(),
        started.elapsed()
    );
    mesh
}

struct Extractor<'a> {
    field: &'a ArrayView3<'a, f32>,
    iso_value: f32,
    size: [usize; 3],
    /// Vertex index per (x, y, z % 2) and edge axis.
    slab: Vec<[u32; 3]>,
    points: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl Extractor<'_> {
    #[inline]
    fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.field[[z, y, x]] - self.iso_value
    }

    #[inline]
    fn slab_index(&self, x: usize, y: usize, z: usize) -> usize {
        self.size[0] * self.size[1] * (z % 2) + y * self.size[0] + x
    }

    fn run(&mut self) {
        let [nx, ny, nz] = self.size;
        let mut vs = [0.0_f32; 8];

        for z in 0..nz - 1 {
            for y in 0..ny - 1 {
                for x in 0..nx - 1 {
                    vs[0] = self.value(x, y, z);
                    vs[1] = self.value(x + 1, y, z);
                    vs[2] = self.value(x, y + 1, z);
                    vs[3] = self.value(x + 1, y + 1, z);
                    vs[4] = self.value(x, y, z + 1);
                    vs[5] = self.value(x + 1, y, z + 1);
                    vs[6] = self.value(x, y + 1, z + 1);
                    vs[7] = self.value(x + 1, y + 1, z + 1);

                    let config = vs
                        .iter()
                        .enumerate()
                        .fold(0usize, |acc, (bit, v)| acc | (usize::from(*v < 0.0) << bit));
                    if config == 0 || config == 255 {
                        continue;
                    }

                    self.cell_edges(&vs, x, y, z);
                    self.emit_triangles(config, x, y, z);
                }
            }
        }
    }

    /// Creates the vertices of the edges this cell owns. Edges on the low
    /// x/y/z faces are only owned by cells on the volume boundary; interior
    /// ones were created by an earlier neighbour.
    fn cell_edges(&mut self, vs: &[f32; 8], x: usize, y: usize, z: usize) {
        // x-axis edges
        if y == 0 && z == 0 {
            self.edge(vs[0], vs[1], 0, x, y, z);
        }
        if z == 0 {
            self.edge(vs[2], vs[3], 0, x, y + 1, z);
        }
        if y == 0 {
            self.edge(vs[4], vs[5], 0, x, y, z + 1);
        }
        self.edge(vs[6], vs[7], 0, x, y + 1, z + 1);

        // y-axis edges
        if x == 0 && z == 0 {
            self.edge(vs[0], vs[2], 1, x, y, z);
        }
        if z == 0 {
            self.edge(vs[1], vs[3], 1, x + 1, y, z);
        }
        if x == 0 {
            self.edge(vs[4], vs[6], 1, x, y, z + 1);
        }
        self.edge(vs[5], vs[7], 1, x + 1, y, z + 1);

        // z-axis edges
        if x == 0 && y == 0 {
            self.edge(vs[0], vs[4], 2, x, y, z);
        }
        if y == 0 {
            self.edge(vs[1], vs[5], 2, x + 1, y, z);
        }
        if x == 0 {
            self.edge(vs[2], vs[6], 2, x, y + 1, z);
        }
        self.edge(vs[3], vs[7], 2, x + 1, y + 1, z);
    }

    #[inline]
    fn edge(&mut self, va: f32, vb: f32, axis: usize, x: usize, y: usize, z: usize) {
        if (va < 0.0) == (vb < 0.0) {
            return;
        }
        let mut p = Vec3::new(x as f32, y as f32, z as f32);
        p[axis] += va / (va - vb);
        let index = self.points.len() as u32;
        let slot = self.slab_index(x, y, z);
        self.slab[slot][axis] = index;
        self.points.push(p);
    }

    fn emit_triangles(&mut self, config: usize, x: usize, y: usize, z: usize) {
        let edges = [
            self.slab[self.slab_index(x, y, z)][0],
            self.slab[self.slab_index(x, y + 1, z)][0],
            self.slab[self.slab_index(x, y, z + 1)][0],
            self.slab[self.slab_index(x, y + 1, z + 1)][0],
            self.slab[self.slab_index(x, y, z)][1],
            self.slab[self.slab_index(x + 1, y, z)][1],
            self.slab[self.slab_index(x, y, z + 1)][1],
            self.slab[self.slab_index(x + 1, y, z + 1)][1],
            self.slab[self.slab_index(x, y, z)][2],
            self.slab[self.slab_index(x + 1, y, z)][2],
            self.slab[self.slab_index(x, y + 1, z)][2],
            self.slab[self.slab_index(x + 1, y + 1, z)][2],
        ];

        // low nibble: triangle count, then one nibble per edge index
        let entry = MC_TRIS[config];
        let count = (entry & 0xF) as usize;
        for t in 0..count {
            let mut triangle = [0u32; 3];
            for (corner, slot) in triangle.iter_mut().enumerate() {
                let shift = 4 + 4 * (t * 3 + corner);
                *slot = edges[((entry >> shift) & 0xF) as usize];
            }
            self.triangles.push(triangle);
        }
    }
}

#[rustfmt::skip]
static MC_TRIS: [u64; 256] = [
    0, 33793, 36945, 159668546,
    18961, 144771090, 5851666, 595283255635,
    20913, 67640146, 193993474, 655980856339,
    88782242, 736732689667, 797430812739, 194554754,
    26657, 104867330, 136709522, 298069416227,
    109224258, 8877909667, 318136408323, 1567994331701604,
    189884450, 350847647843, 559958167731, 3256298596865604,
    447393122899, 651646838401572, 2538311371089956, 737032694307,
    29329, 43484162, 91358498, 374810899075,
    158485010, 178117478419, 88675058979, 433581536604804,
    158486962, 649105605635, 4866906995, 3220959471609924,
    649165714851, 3184943915608436, 570691368417972, 595804498035,
    124295042, 431498018963, 508238522371, 91518530,
    318240155763, 291789778348404, 1830001131721892, 375363605923,
    777781811075, 1136111028516116, 3097834205243396, 508001629971,
    2663607373704004, 680242583802939237, 333380770766129845, 179746658,
    42545, 138437538, 93365810, 713842853011,
    73602098, 69575510115, 23964357683, 868078761575828,
    28681778, 713778574611, 250912709379, 2323825233181284,
    302080811955, 3184439127991172, 1694042660682596, 796909779811,
    176306722, 150327278147, 619854856867, 1005252473234484,
    211025400963, 36712706, 360743481544788, 150627258963,
    117482600995, 1024968212107700, 2535169275963444, 4734473194086550421,
    628107696687956, 9399128243, 5198438490361643573, 194220594,
    104474994, 566996932387, 427920028243, 2014821863433780,
    492093858627, 147361150235284, 2005882975110676, 9671606099636618005,
    777701008947, 3185463219618820, 482784926917540, 2900953068249785909,
    1754182023747364, 4274848857537943333, 13198752741767688709, 2015093490989156,
    591272318771, 2659758091419812, 1531044293118596, 298306479155,
    408509245114388, 210504348563, 9248164405801223541, 91321106,
    2660352816454484, 680170263324308757, 8333659837799955077, 482966828984116,
    4274926723105633605, 3184439197724820, 192104450, 15217,
    45937, 129205250, 129208402, 529245952323,
    169097138, 770695537027, 382310500883, 2838550742137652,
    122763026, 277045793139, 81608128403, 1991870397907988,
    362778151475, 2059003085103236, 2132572377842852, 655681091891,
    58419234, 239280858627, 529092143139, 1568257451898804,
    447235128115, 679678845236084, 2167161349491220, 1554184567314086709,
    165479003923, 1428768988226596, 977710670185060, 10550024711307499077,
    1305410032576132, 11779770265620358997, 333446212255967269, 978168444447012,
    162736434, 35596216627, 138295313843, 891861543990356,
    692616541075, 3151866750863876, 100103641866564, 6572336607016932133,
    215036012883, 726936420696196, 52433666, 82160664963,
    2588613720361524, 5802089162353039525, 214799000387, 144876322,
    668013605731, 110616894681956, 1601657732871812, 430945547955,
    3156382366321172, 7644494644932993285, 3928124806469601813, 3155990846772900,
    339991010498708, 10743689387941597493, 5103845475, 105070898,
    3928064910068824213, 156265010, 1305138421793636, 27185,
    195459938, 567044449971, 382447549283, 2175279159592324,
    443529919251, 195059004769796, 2165424908404116, 1554158691063110021,
    504228368803, 1436350466655236, 27584723588724, 1900945754488837749,
    122971970, 443829749251, 302601798803, 108558722,
    724700725875, 43570095105972, 2295263717447940, 2860446751369014181,
    2165106202149444, 69275726195, 2860543885641537797, 2165106320445780,
    2280890014640004, 11820349930268368933, 8721082628082003989, 127050770,
    503707084675, 122834978, 2538193642857604, 10129,
    801441490467, 2923200302876740, 1443359556281892, 2901063790822564949,
    2728339631923524, 7103874718248233397, 12775311047932294245, 95520290,
    2623783208098404, 1900908618382410757, 137742672547, 2323440239468964,
    362478212387, 727199575803140, 73425410, 34337,
    163101314, 668566030659, 801204361987, 73030562,
    591509145619, 162574594, 100608342969108, 5553,
    724147968595, 1436604830452292, 176259090, 42001,
    143955266, 2385, 18433, 0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::collections::HashMap;

    fn sphere(n: usize) -> Volume {
        let c = (n as f32 - 1.0) / 2.0;
        let data = Array3::from_shape_fn((n, n, n), |(k, j, i)| {
            Vec3::new(i as f32 - c, j as f32 - c, k as f32 - c).length()
        });
        Volume::new(data, (1.0, 1.0, 1.0), (0.0, 0.0, 0.0))
    }

    #[test]
    fn constant_field_has_no_surface() {
        let volume = Volume::new(Array3::from_elem((3, 3, 3), 5.0), (1.0, 1.0, 1.0), (0.0, 0.0, 0.0));
        assert!(marching_cubes(&volume, 0.0).is_empty());
        assert!(marching_cubes(&volume, 10.0).is_empty());
    }

    #[test]
    fn flat_volume_has_no_surface() {
        let volume = Volume::new(Array3::from_elem((1, 4, 4), 5.0), (1.0, 1.0, 1.0), (0.0, 0.0, 0.0));
        assert!(marching_cubes(&volume, 1.0).is_empty());
    }

    #[test]
    fn single_corner_gives_one_triangle() {
        let mut data = Array3::from_elem((2, 2, 2), 1.0);
        data[[0, 0, 0]] = -1.0;
        let mesh = marching_cubes(&Volume::new(data, (1.0, 1.0, 1.0), (0.0, 0.0, 0.0)), 0.0);
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.num_points(), 3);
        for p in &mesh.points {
            assert!((p.length() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn vertices_lie_in_world_space() {
        let mut data = Array3::from_elem((2, 2, 2), 0.0);
        data[[1, 1, 1]] = 4.0;
        let volume = Volume::new(data, (2.0, 3.0, 4.0), (10.0, 20.0, 30.0));
        let mesh = marching_cubes(&volume, 1.0);
        assert_eq!(mesh.num_triangles(), 1);
        let (lo, hi) = mesh.bounds().unwrap();
        assert!(lo.cmpge(Vec3::new(10.0, 20.0, 30.0)).all());
        assert!(hi.cmple(Vec3::new(12.0, 23.0, 34.0)).all());
        assert!(mesh.points.contains(&Vec3::new(10.5, 23.0, 34.0)));
    }

    #[test]
    fn sphere_is_welded_and_near_radius() {
        let radius = 6.3;
        let mesh = marching_cubes(&sphere(20), radius);
        assert!(mesh.num_triangles() > 100);
        let center = Vec3::splat(9.5);
        for p in &mesh.points {
            assert!(((*p - center).length() - radius).abs() < 0.5);
        }
        for t in &mesh.triangles {
            assert!(t.iter().all(|&i| (i as usize) < mesh.num_points()));
        }

        // on a welded closed surface no edge is used by a single triangle
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for t in &mesh.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *edges.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        assert!(edges.values().all(|&count| count >= 2));
    }
}
