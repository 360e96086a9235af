// src/lattice/mod.rs
//
// Lattice topology: site coordinates, nth-nearest-neighbor shells, and the
// derived cell structures the multi-spin energy terms and the topological
// charge observable consume.
//
// Conventions:
// - Distances are in lattice units (nearest-neighbor spacing = 1 for the
//   built-in shapes).
// - Shell k is the k-th smallest distinct center-to-site distance.
// - Neighbor tables are rectangular per shell (width = max neighbor count
//   observed at that shell), padded with the -1 sentinel. The packed
//   sentinel layout is kept for cache friendliness; the iterator accessors
//   below are the only supported access path.
// - Under periodic/helical wrap, all displacements use the minimum-image
//   metric over the wrap vectors.

pub mod shapes;

pub use shapes::{BoundaryKind, LatticeShape, LatticeSpec};

use crate::error::SimError;
use crate::vec3::{self, PRECISION};

/// Maximum number of neighbor shells resolved per lattice.
pub const MAX_SHELLS: usize = 8;

/// Direction vectors are recorded for the first this-many shells only
/// (DM couplings reach at most order 5).
pub const VECTOR_SHELLS: usize = 5;

/// Absolute tolerance for "site j sits on shell k of site i".
pub const NEIGHBOR_TOL: f64 = 0.01;

/// Cells whose members are farther apart than this (any pairwise distance,
/// lattice units) are invalidated: they would couple across a cut boundary.
pub const CELL_CUTOFF: f64 = 3.1;

const NO_NEIGHBOR: i32 = -1;

/// One distance shell: rectangular index table plus (for the low shells)
/// the matching displacement vectors.
#[derive(Debug, Clone)]
pub struct NeighborShell {
    pub distance: f64,
    pub width: usize,
    table: Vec<i32>,
    vectors: Option<Vec<[f64; 3]>>,
}

impl NeighborShell {
    /// Neighbor indices of `site` on this shell, skipping sentinel slots.
    pub fn neighbors(&self, site: usize) -> impl Iterator<Item = usize> + '_ {
        let row = &self.table[site * self.width..(site + 1) * self.width];
        row.iter()
            .take_while(|&&j| j != NO_NEIGHBOR)
            .map(|&j| j as usize)
    }

    /// (neighbor index, displacement to neighbor) pairs. Only available on
    /// shells below [`VECTOR_SHELLS`].
    pub fn neighbors_with_vectors(
        &self,
        site: usize,
    ) -> impl Iterator<Item = (usize, [f64; 3])> + '_ {
        let row = &self.table[site * self.width..(site + 1) * self.width];
        let vecs = self
            .vectors
            .as_ref()
            .map(|v| &v[site * self.width..(site + 1) * self.width]);
        row.iter()
            .enumerate()
            .take_while(|(_, &j)| j != NO_NEIGHBOR)
            .map(move |(slot, &j)| {
                let v = vecs.map(|vs| vs[slot]).unwrap_or([0.0; 3]);
                (j as usize, v)
            })
    }
}

/// A derived cell: a fixed-arity tuple of site indices, or invalid (all -1)
/// when the construction crossed the distance cutoff. Consumers must skip
/// invalid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<const K: usize>(pub [i32; K]);

impl<const K: usize> Cell<K> {
    pub const INVALID: Cell<K> = Cell([NO_NEIGHBOR; K]);

    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|&i| i >= 0)
    }

    pub fn sites(&self) -> Option<[usize; K]> {
        if !self.is_valid() {
            return None;
        }
        let mut out = [0usize; K];
        for (o, &i) in out.iter_mut().zip(self.0.iter()) {
            *o = i as usize;
        }
        Some(out)
    }
}

pub type TriangleCell = Cell<3>;
pub type PlaquetteCell = Cell<4>;

#[derive(Debug, Clone)]
pub struct Lattice {
    coords: Vec<[f64; 3]>,
    /// Periodic/helical wrap vectors (empty for open boundaries).
    wrap: Vec<[f64; 3]>,
    /// Distinct center-to-site distances, ascending; index = shell order.
    shell_distances: Vec<f64>,
    shells: Vec<NeighborShell>,
    /// Triangles for the Berg-Luscher topological charge.
    triangle_cells: Vec<TriangleCell>,
    /// Four-spin plaquettes (rhombi on the triangular lattice).
    four_spin_cells: Vec<PlaquetteCell>,
    /// Three-site triples.
    three_site_cells: Vec<TriangleCell>,
}

impl Lattice {
    /// Build a lattice from explicit site coordinates and wrap vectors:
    /// resolves distance shells, fills neighbor tables, and (for planar
    /// lattices) derives the cell structures.
    pub fn from_sites(coords: Vec<[f64; 3]>, wrap: Vec<[f64; 3]>) -> Result<Self, SimError> {
        if coords.is_empty() {
            return Err(SimError::InvalidConfig(
                "lattice has no sites".to_string(),
            ));
        }
        let mut lat = Self {
            coords,
            wrap,
            shell_distances: Vec::new(),
            shells: Vec::new(),
            triangle_cells: Vec::new(),
            four_spin_cells: Vec::new(),
            three_site_cells: Vec::new(),
        };
        lat.neighbor_distances();
        lat.assign_neighbors();
        if lat.is_planar() {
            lat.build_cells();
        }
        Ok(lat)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[[f64; 3]] {
        &self.coords
    }

    pub fn coord(&self, site: usize) -> Result<[f64; 3], SimError> {
        self.coords
            .get(site)
            .copied()
            .ok_or(SimError::SiteOutOfRange {
                site,
                len: self.coords.len(),
            })
    }

    /// Distinct shell distances, ascending (index 0 = nearest neighbors).
    pub fn shell_distances(&self) -> &[f64] {
        &self.shell_distances
    }

    /// Number of resolved shells (at most [`MAX_SHELLS`]).
    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    /// Neighbor shell of order `k` (0-based), if resolved.
    pub fn shell(&self, k: usize) -> Option<&NeighborShell> {
        self.shells.get(k)
    }

    pub fn triangle_cells(&self) -> &[TriangleCell] {
        &self.triangle_cells
    }

    pub fn four_spin_cells(&self) -> &[PlaquetteCell] {
        &self.four_spin_cells
    }

    pub fn three_site_cells(&self) -> &[TriangleCell] {
        &self.three_site_cells
    }

    /// Minimum-image displacement from site `i` to site `j`.
    pub fn displacement(&self, i: usize, j: usize) -> [f64; 3] {
        self.displacement_between(self.coords[i], self.coords[j])
    }

    /// Minimum-image distance between sites.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        vec3::norm(self.displacement(i, j))
    }

    fn displacement_between(&self, from: [f64; 3], to: [f64; 3]) -> [f64; 3] {
        let raw = vec3::sub(to, from);
        if self.wrap.is_empty() {
            return raw;
        }
        // Enumerate the +-1 image shifts of each wrap vector; adequate as
        // long as the lattice extent exceeds twice the largest shell.
        let mut best = raw;
        let mut best2 = vec3::dot(raw, raw);
        let shifts: &[f64] = &[-1.0, 0.0, 1.0];
        let w = &self.wrap;
        let n = w.len();
        let combos = 3usize.pow(n as u32);
        for c in 0..combos {
            let mut d = raw;
            let mut rem = c;
            for wv in w.iter() {
                let s = shifts[rem % 3];
                rem /= 3;
                d = vec3::add(d, vec3::scale(*wv, s));
            }
            let d2 = vec3::dot(d, d);
            if d2 < best2 {
                best2 = d2;
                best = d;
            }
        }
        best
    }

    /// Site nearest the geometric centroid; the shell distances are
    /// measured from this representative site.
    fn center_site(&self) -> usize {
        let n = self.coords.len() as f64;
        let mut c = [0.0; 3];
        for p in &self.coords {
            c = vec3::add(c, *p);
        }
        c = vec3::scale(c, 1.0 / n);
        let mut best = 0;
        let mut best2 = f64::INFINITY;
        for (i, p) in self.coords.iter().enumerate() {
            let d2 = vec3::dist2(*p, c);
            if d2 < best2 {
                best2 = d2;
                best = i;
            }
        }
        best
    }

    /// Compute the distinct pairwise distances from the center site to all
    /// others, dedup within PRECISION, ascending. The resulting ordered
    /// list defines shell order k = 0, 1, 2, ...
    fn neighbor_distances(&mut self) {
        let center = self.center_site();
        let mut distances: Vec<f64> = (0..self.coords.len())
            .filter(|&j| j != center)
            .map(|j| self.distance(center, j))
            .collect();
        distances.sort_by(|a, b| a.partial_cmp(b).expect("finite distances"));
        let mut distinct: Vec<f64> = Vec::new();
        for d in distances {
            if distinct.last().map_or(true, |&last| d - last > PRECISION) {
                distinct.push(d);
            }
        }
        distinct.truncate(MAX_SHELLS);
        self.shell_distances = distinct;
    }

    /// Fill the per-shell neighbor tables. Symmetric by construction: the
    /// scan visits unordered pairs once and records both directions.
    fn assign_neighbors(&mut self) {
        let n = self.coords.len();
        self.shells.clear();
        for (k, &d) in self.shell_distances.iter().enumerate() {
            let mut lists: Vec<Vec<(usize, [f64; 3])>> = vec![Vec::new(); n];
            for i in 0..n {
                for j in (i + 1)..n {
                    let disp = self.displacement(i, j);
                    if (vec3::norm(disp) - d).abs() < NEIGHBOR_TOL {
                        lists[i].push((j, disp));
                        lists[j].push((i, vec3::scale(disp, -1.0)));
                    }
                }
            }
            let width = lists.iter().map(Vec::len).max().unwrap_or(0);
            let keep_vectors = k < VECTOR_SHELLS;
            let mut table = vec![NO_NEIGHBOR; n * width];
            let mut vectors = if keep_vectors {
                Some(vec![[0.0; 3]; n * width])
            } else {
                None
            };
            for (i, list) in lists.iter().enumerate() {
                for (slot, &(j, disp)) in list.iter().enumerate() {
                    table[i * width + slot] = j as i32;
                    if let Some(vs) = vectors.as_mut() {
                        vs[i * width + slot] = disp;
                    }
                }
            }
            self.shells.push(NeighborShell {
                distance: d,
                width,
                table,
                vectors,
            });
        }
    }

    /// True when all sites lie in one z = const plane (the cell structures
    /// are defined for the planar triangular shapes).
    fn is_planar(&self) -> bool {
        let z0 = self.coords[0][2];
        self.coords.iter().all(|p| (p[2] - z0).abs() < PRECISION)
    }

    /// Derive triangle, plaquette, and three-site cells from the first
    /// neighbor shell. Triangles are oriented counterclockwise in the
    /// plane so the solid-angle sum has a consistent sign.
    fn build_cells(&mut self) {
        self.triangle_cells.clear();
        self.four_spin_cells.clear();
        self.three_site_cells.clear();
        let Some(shell) = self.shells.first() else {
            return;
        };

        let mut triangles: Vec<[usize; 3]> = Vec::new();
        let mut plaquettes: Vec<[usize; 4]> = Vec::new();
        for i in 0..self.coords.len() {
            let nbrs: Vec<usize> = shell.neighbors(i).collect();
            for (a_pos, &j) in nbrs.iter().enumerate() {
                for &k in nbrs.iter().skip(a_pos + 1) {
                    if !shell.neighbors(j).any(|m| m == k) {
                        continue;
                    }
                    // Mutually neighboring triple; keep once (i smallest).
                    if i < j && i < k {
                        triangles.push(self.orient_ccw([i, j, k]));
                    }
                    // Rhombus: the second site adjacent to both j and k.
                    for l in shell.neighbors(j) {
                        if l != i && l > i && shell.neighbors(k).any(|m| m == l) {
                            plaquettes.push([i, j, l, k]);
                        }
                    }
                }
            }
        }
        plaquettes.sort_unstable();
        plaquettes.dedup();

        self.triangle_cells = triangles
            .iter()
            .map(|&t| self.checked_cell3(t))
            .collect();
        self.three_site_cells = self.triangle_cells.clone();
        self.four_spin_cells = plaquettes
            .iter()
            .map(|&p| self.checked_cell4(p))
            .collect();
    }

    fn orient_ccw(&self, t: [usize; 3]) -> [usize; 3] {
        let e1 = self.displacement(t[0], t[1]);
        let e2 = self.displacement(t[0], t[2]);
        if vec3::cross(e1, e2)[2] >= 0.0 {
            t
        } else {
            [t[0], t[2], t[1]]
        }
    }

    fn checked_cell3(&self, t: [usize; 3]) -> TriangleCell {
        let pairs = [(t[0], t[1]), (t[1], t[2]), (t[0], t[2])];
        if pairs.iter().any(|&(a, b)| self.distance(a, b) > CELL_CUTOFF) {
            TriangleCell::INVALID
        } else {
            Cell([t[0] as i32, t[1] as i32, t[2] as i32])
        }
    }

    fn checked_cell4(&self, p: [usize; 4]) -> PlaquetteCell {
        let mut too_far = false;
        for a in 0..4 {
            for b in (a + 1)..4 {
                if self.distance(p[a], p[b]) > CELL_CUTOFF {
                    too_far = true;
                }
            }
        }
        if too_far {
            PlaquetteCell::INVALID
        } else {
            Cell([p[0] as i32, p[1] as i32, p[2] as i32, p[3] as i32])
        }
    }

    /// Compact the lattice to the sites where `keep` is true: rebuilds the
    /// coordinate array, remaps the cell lists through a transcript table
    /// (cells touching an excluded site are dropped), and re-resolves
    /// shells and neighbor tables on the reduced set. Cut lattices are
    /// open: wrap vectors do not survive a cut.
    pub fn finish_cutting(&self, keep: &[bool]) -> Result<Lattice, SimError> {
        if keep.len() != self.coords.len() {
            return Err(SimError::InvalidConfig(format!(
                "cut predicate length {} does not match lattice size {}",
                keep.len(),
                self.coords.len()
            )));
        }
        let mut transcript = vec![NO_NEIGHBOR; self.coords.len()];
        let mut coords = Vec::new();
        for (old, (&k, &p)) in keep.iter().zip(self.coords.iter()).enumerate() {
            if k {
                transcript[old] = coords.len() as i32;
                coords.push(p);
            }
        }
        let mut cut = Lattice::from_sites(coords, Vec::new())?;

        // Carry the parent's cells through the transcript rather than
        // rebuilding: edge cells that lost a member are dropped, matching
        // the reference cut semantics.
        let remap3 = |c: &TriangleCell| -> Option<TriangleCell> {
            let s = c.sites()?;
            let mapped = [
                transcript[s[0]],
                transcript[s[1]],
                transcript[s[2]],
            ];
            if mapped.iter().any(|&m| m == NO_NEIGHBOR) {
                None
            } else {
                Some(Cell(mapped))
            }
        };
        let remap4 = |c: &PlaquetteCell| -> Option<PlaquetteCell> {
            let s = c.sites()?;
            let mapped = [
                transcript[s[0]],
                transcript[s[1]],
                transcript[s[2]],
                transcript[s[3]],
            ];
            if mapped.iter().any(|&m| m == NO_NEIGHBOR) {
                None
            } else {
                Some(Cell(mapped))
            }
        };
        cut.triangle_cells = self.triangle_cells.iter().filter_map(remap3).collect();
        cut.three_site_cells = self.three_site_cells.iter().filter_map(remap3).collect();
        cut.four_spin_cells = self.four_spin_cells.iter().filter_map(remap4).collect();
        Ok(cut)
    }

    /// Extent of the site cloud projected on `direction` (used by the
    /// temperature-gradient setter).
    pub fn projection_range(&self, direction: [f64; 3]) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for p in &self.coords {
            let s = vec3::dot(*p, direction);
            lo = lo.min(s);
            hi = hi.max(s);
        }
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::shapes;
    use super::*;

    fn simple_cubic(nx: usize, ny: usize, nz: usize) -> Lattice {
        shapes::build(&LatticeSpec {
            shape: LatticeShape::SimpleCubic,
            dims: vec![nx, ny, nz],
            boundary: BoundaryKind::Open,
            coordinate_file: None,
            image_file: None,
        })
        .unwrap()
    }

    #[test]
    fn sc_shell_distances_are_canonical() {
        let lat = simple_cubic(5, 5, 5);
        let d = lat.shell_distances();
        assert!((d[0] - 1.0).abs() < 1e-9);
        assert!((d[1] - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((d[2] - 3.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn neighbor_relation_is_symmetric() {
        let lat = simple_cubic(4, 4, 3);
        for k in 0..lat.shell_count() {
            let shell = lat.shell(k).unwrap();
            for i in 0..lat.len() {
                for j in shell.neighbors(i) {
                    assert!(
                        shell.neighbors(j).any(|b| b == i),
                        "shell {k}: {j} missing back-reference to {i}"
                    );
                    assert!(
                        (lat.distance(i, j) - shell.distance).abs() < NEIGHBOR_TOL,
                        "shell {k}: distance mismatch for ({i},{j})"
                    );
                }
            }
        }
    }

    #[test]
    fn interior_sc_site_has_six_nearest_neighbors() {
        let lat = simple_cubic(3, 3, 3);
        let shell = lat.shell(0).unwrap();
        // center of the 3x3x3 block
        let center = lat
            .coords()
            .iter()
            .position(|&p| p == [1.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(shell.neighbors(center).count(), 6);
    }

    #[test]
    fn periodic_sc_every_site_has_six_nearest_neighbors() {
        let lat = shapes::build(&LatticeSpec {
            shape: LatticeShape::SimpleCubic,
            dims: vec![4, 4, 4],
            boundary: BoundaryKind::Periodic,
            coordinate_file: None,
            image_file: None,
        })
        .unwrap();
        let shell = lat.shell(0).unwrap();
        for i in 0..lat.len() {
            assert_eq!(shell.neighbors(i).count(), 6, "site {i}");
        }
    }

    #[test]
    fn triangular_lattice_builds_oriented_triangles() {
        let lat = shapes::build(&LatticeSpec {
            shape: LatticeShape::TriangularHexagonal,
            dims: vec![3],
            boundary: BoundaryKind::Open,
            coordinate_file: None,
            image_file: None,
        })
        .unwrap();
        assert!(!lat.triangle_cells().is_empty());
        for cell in lat.triangle_cells() {
            let Some([a, b, c]) = cell.sites() else {
                continue;
            };
            let e1 = lat.displacement(a, b);
            let e2 = lat.displacement(a, c);
            assert!(vec3::cross(e1, e2)[2] > 0.0, "triangle not CCW");
        }
    }

    #[test]
    fn cutting_remaps_and_drops_cells() {
        let lat = shapes::build(&LatticeSpec {
            shape: LatticeShape::TriangularDisk,
            dims: vec![4],
            boundary: BoundaryKind::Open,
            coordinate_file: None,
            image_file: None,
        })
        .unwrap();
        // all remapped cells reference in-range sites
        for cell in lat.triangle_cells().iter().chain(lat.three_site_cells()) {
            if let Some(s) = cell.sites() {
                assert!(s.iter().all(|&i| i < lat.len()));
            }
        }
        for cell in lat.four_spin_cells() {
            if let Some(s) = cell.sites() {
                assert!(s.iter().all(|&i| i < lat.len()));
            }
        }
        // the disk actually cut something: fewer sites than its parent hexagon
        assert!(lat.len() > 0);
    }
}
