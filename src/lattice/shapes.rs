// src/lattice/shapes.rs
//
// Shape builders: cubic family (simple / body-centered / face-centered),
// the 2D triangular family (hexagonal patch plus the shapes cut out of a
// larger helical hexagonal parent), coordinate files, and raster-image
// masks.
//
// All built-in shapes use a nearest-neighbor spacing of 1 lattice unit.
// Triangular basis: a1 = (1, 0, 0), a2 = (1/2, sqrt(3)/2, 0).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::lattice::Lattice;
use crate::vec3::{self, PRECISION};

/// Brightness threshold on the green channel: a site survives an image
/// mask iff its nearest pixel samples brighter than this.
const MASK_THRESHOLD: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeShape {
    SimpleCubic,
    BodyCenteredCubic,
    FaceCenteredCubic,
    TriangularHexagonal,
    TriangularTriangular,
    TriangularHalfDisk,
    TriangularDisk,
    TriangularArrowHead,
    TriangularStripe,
    FromCoordinateFile,
    FromImageMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Open,
    Periodic,
    /// Wrapped boundary on the rhombic cover of the triangular lattice.
    Helical,
}

/// Requested lattice geometry; the `dims` layout depends on the shape
/// (see [`expected_dims`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeSpec {
    pub shape: LatticeShape,
    pub dims: Vec<usize>,
    pub boundary: BoundaryKind,
    #[serde(default)]
    pub coordinate_file: Option<PathBuf>,
    #[serde(default)]
    pub image_file: Option<PathBuf>,
}

/// Number of `dims` entries each shape expects.
pub fn expected_dims(shape: LatticeShape) -> usize {
    match shape {
        LatticeShape::SimpleCubic
        | LatticeShape::BodyCenteredCubic
        | LatticeShape::FaceCenteredCubic => 3,
        LatticeShape::TriangularHexagonal
        | LatticeShape::TriangularTriangular
        | LatticeShape::TriangularHalfDisk
        | LatticeShape::TriangularDisk => 1,
        LatticeShape::TriangularArrowHead
        | LatticeShape::TriangularStripe
        | LatticeShape::FromImageMask => 2,
        LatticeShape::FromCoordinateFile => 0,
    }
}

/// Mandatory pre-check: dimension count must match the shape, and shapes
/// that read external data must name their source. Runs before any array
/// is sized.
pub fn parameter_consistency(spec: &LatticeSpec) -> Result<(), SimError> {
    let expected = expected_dims(spec.shape);
    if spec.dims.len() != expected {
        return Err(SimError::InconsistentLatticeParameters {
            shape: format!("{:?}", spec.shape),
            expected,
            got: spec.dims.len(),
        });
    }
    if spec.shape == LatticeShape::FromCoordinateFile && spec.coordinate_file.is_none() {
        return Err(SimError::InvalidConfig(
            "from_coordinate_file shape requires `coordinate_file`".to_string(),
        ));
    }
    if spec.shape == LatticeShape::FromImageMask && spec.image_file.is_none() {
        return Err(SimError::InvalidConfig(
            "from_image_mask shape requires `image_file`".to_string(),
        ));
    }
    if spec.dims.iter().any(|&d| d == 0) && expected > 0 {
        return Err(SimError::InvalidConfig(
            "lattice dimensions must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Build a lattice for the requested shape/boundary combination.
pub fn build(spec: &LatticeSpec) -> Result<Lattice, SimError> {
    parameter_consistency(spec)?;
    match spec.shape {
        LatticeShape::SimpleCubic | LatticeShape::BodyCenteredCubic
        | LatticeShape::FaceCenteredCubic => cubic(spec),
        LatticeShape::TriangularHexagonal => hexagonal(spec.dims[0], spec.boundary),
        LatticeShape::TriangularTriangular => {
            cut_from_hexagon(spec.dims[0] + 4, |x, y| inside_triangle(x, y, spec.dims[0] as f64))
        }
        LatticeShape::TriangularDisk => {
            let r = spec.dims[0] as f64;
            cut_from_hexagon(spec.dims[0] + 3, move |x, y| x * x + y * y <= r * r + PRECISION)
        }
        LatticeShape::TriangularHalfDisk => {
            let r = spec.dims[0] as f64;
            cut_from_hexagon(spec.dims[0] + 3, move |x, y| {
                x * x + y * y <= r * r + PRECISION && y >= -PRECISION
            })
        }
        LatticeShape::TriangularArrowHead => {
            let length = spec.dims[0] as f64;
            let notch = spec.dims[1] as f64;
            cut_from_hexagon(spec.dims[0] + 4, move |x, y| {
                inside_arrow_head(x, y, length, notch)
            })
        }
        LatticeShape::TriangularStripe => {
            let hx = spec.dims[0] as f64 * 0.5;
            let hy = spec.dims[1] as f64 * 0.5;
            let half = spec.dims[0].max(spec.dims[1]) / 2 + 3;
            cut_from_hexagon(half * 2, move |x, y| {
                x.abs() <= hx + PRECISION && y.abs() <= hy + PRECISION
            })
        }
        LatticeShape::FromCoordinateFile => {
            from_coordinate_file(spec.coordinate_file.as_deref().expect("checked above"))
        }
        LatticeShape::FromImageMask => from_image_mask(
            spec.dims[0],
            spec.dims[1],
            spec.image_file.as_deref().expect("checked above"),
        ),
    }
}

// ---------------------------------------------------------------
// Cubic family
// ---------------------------------------------------------------

fn cubic(spec: &LatticeSpec) -> Result<Lattice, SimError> {
    let (nx, ny, nz) = (spec.dims[0], spec.dims[1], spec.dims[2]);
    if spec.boundary == BoundaryKind::Helical {
        return Err(SimError::InvalidConfig(
            "helical boundaries are defined for the triangular family only".to_string(),
        ));
    }

    let offsets: &[[f64; 3]] = match spec.shape {
        LatticeShape::SimpleCubic => &[[0.0, 0.0, 0.0]],
        LatticeShape::BodyCenteredCubic => &[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
        LatticeShape::FaceCenteredCubic => &[
            [0.0, 0.0, 0.0],
            [0.5, 0.5, 0.0],
            [0.5, 0.0, 0.5],
            [0.0, 0.5, 0.5],
        ],
        _ => unreachable!("cubic() called for a non-cubic shape"),
    };

    let mut coords = Vec::with_capacity(nx * ny * nz * offsets.len());
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let base = [i as f64, j as f64, k as f64];
                for off in offsets {
                    // Open boundaries drop basis sites that would poke out
                    // of the block; periodic keeps the full unit cells.
                    let p = vec3::add(base, *off);
                    if spec.boundary == BoundaryKind::Open
                        && (p[0] > (nx - 1) as f64 + PRECISION
                            || p[1] > (ny - 1) as f64 + PRECISION
                            || p[2] > (nz - 1) as f64 + PRECISION)
                    {
                        continue;
                    }
                    coords.push(p);
                }
            }
        }
    }

    let wrap = match spec.boundary {
        BoundaryKind::Periodic => vec![
            [nx as f64, 0.0, 0.0],
            [0.0, ny as f64, 0.0],
            [0.0, 0.0, nz as f64],
        ],
        _ => Vec::new(),
    };
    Lattice::from_sites(coords, wrap)
}

// ---------------------------------------------------------------
// Triangular family
// ---------------------------------------------------------------

const A1: [f64; 3] = [1.0, 0.0, 0.0];
const A2: [f64; 3] = [0.5, 0.866_025_403_784_438_6, 0.0];

/// Hexagonal patch of the triangular lattice with `rings` shells around a
/// center site (open), or the wrapped rhombic cover (periodic/helical).
fn hexagonal(rings: usize, boundary: BoundaryKind) -> Result<Lattice, SimError> {
    match boundary {
        BoundaryKind::Open => {
            let r = rings as isize;
            let mut coords = Vec::new();
            for q in -r..=r {
                for s in -r..=r {
                    if (q + s).abs() > r {
                        continue;
                    }
                    coords.push(vec3::add(
                        vec3::scale(A1, q as f64),
                        vec3::scale(A2, s as f64),
                    ));
                }
            }
            Lattice::from_sites(coords, Vec::new())
        }
        BoundaryKind::Periodic | BoundaryKind::Helical => {
            let n = 2 * rings + 1;
            rhombus(n, n, true)
        }
    }
}

/// Rhombic cover of the triangular lattice, optionally wrapped along both
/// lattice vectors.
fn rhombus(nx: usize, ny: usize, wrapped: bool) -> Result<Lattice, SimError> {
    let mut coords = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            coords.push(vec3::add(
                vec3::scale(A1, i as f64),
                vec3::scale(A2, j as f64),
            ));
        }
    }
    let wrap = if wrapped {
        vec![vec3::scale(A1, nx as f64), vec3::scale(A2, ny as f64)]
    } else {
        Vec::new()
    };
    Lattice::from_sites(coords, wrap)
}

/// Build a helical hexagonal parent large enough to cover the target
/// shape, mark membership with `inside` (evaluated in centered
/// coordinates), and finish the cut.
fn cut_from_hexagon<F>(parent_rings: usize, inside: F) -> Result<Lattice, SimError>
where
    F: Fn(f64, f64) -> bool,
{
    let parent = hexagonal(parent_rings, BoundaryKind::Helical)?;
    let n = parent.len() as f64;
    let mut centroid = [0.0; 3];
    for p in parent.coords() {
        centroid = vec3::add(centroid, *p);
    }
    centroid = vec3::scale(centroid, 1.0 / n);

    let keep: Vec<bool> = parent
        .coords()
        .iter()
        .map(|p| inside(p[0] - centroid[0], p[1] - centroid[1]))
        .collect();
    if !keep.iter().any(|&k| k) {
        return Err(SimError::InvalidConfig(
            "cut predicate excluded every site".to_string(),
        ));
    }
    parent.finish_cutting(&keep)
}

/// Equilateral triangle with side `s`, apex up, centered at the centroid.
fn inside_triangle(x: f64, y: f64, s: f64) -> bool {
    let h = s * 0.866_025_403_784_438_6;
    let lo = -h / 3.0;
    y >= lo - PRECISION && y <= 2.0 * h / 3.0 - 3.0_f64.sqrt() * x.abs() + PRECISION
}

/// Arrow head pointing +x: main triangle with apex at (L/2, 0) minus a
/// rear notch triangle with apex at (-L/2 + notch, 0).
fn inside_arrow_head(x: f64, y: f64, length: f64, notch: f64) -> bool {
    let half = length * 0.5;
    let in_main = x <= half + PRECISION && y.abs() <= (half - x) / 3.0_f64.sqrt() + PRECISION;
    let in_notch = x < -half + notch - 3.0_f64.sqrt() * y.abs() - PRECISION;
    in_main && !in_notch
}

// ---------------------------------------------------------------
// External sources
// ---------------------------------------------------------------

fn from_coordinate_file(path: &Path) -> Result<Lattice, SimError> {
    let coords = crate::io::read_coordinates(path)?;
    Lattice::from_sites(coords, Vec::new())
}

/// Rhombic nx x ny triangular grid filtered through a raster mask: a site
/// is kept iff the pixel nearest its (rescaled) position samples brighter
/// than [`MASK_THRESHOLD`] on the green channel.
fn from_image_mask(nx: usize, ny: usize, path: &Path) -> Result<Lattice, SimError> {
    if !path.exists() {
        return Err(SimError::MissingFile(path.to_path_buf()));
    }
    let img = image::open(path)
        .map_err(|e| SimError::BadImageMask {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .to_rgb8();
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(SimError::BadImageMask {
            path: path.to_path_buf(),
            reason: "zero-sized image".to_string(),
        });
    }

    let mut grid = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            grid.push(vec3::add(
                vec3::scale(A1, i as f64),
                vec3::scale(A2, j as f64),
            ));
        }
    }
    let (xmin, xmax) = extent(&grid, 0);
    let (ymin, ymax) = extent(&grid, 1);
    let sx = if xmax > xmin { xmax - xmin } else { 1.0 };
    let sy = if ymax > ymin { ymax - ymin } else { 1.0 };

    let coords: Vec<[f64; 3]> = grid
        .into_iter()
        .filter(|p| {
            let u = (p[0] - xmin) / sx;
            // image rows run top-down; lattice rows bottom-up
            let v = 1.0 - (p[1] - ymin) / sy;
            let px = (u * (w - 1) as f64).round() as u32;
            let py = (v * (h - 1) as f64).round() as u32;
            img.get_pixel(px.min(w - 1), py.min(h - 1))[1] > MASK_THRESHOLD
        })
        .collect();
    if coords.is_empty() {
        return Err(SimError::BadImageMask {
            path: path.to_path_buf(),
            reason: "mask kept no sites".to_string(),
        });
    }
    Lattice::from_sites(coords, Vec::new())
}

fn extent(coords: &[[f64; 3]], axis: usize) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for p in coords {
        lo = lo.min(p[axis]);
        hi = hi.max(p[axis]);
    }
    (lo, hi)
}
