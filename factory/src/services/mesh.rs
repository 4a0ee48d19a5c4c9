//! Binary STL volume measurement
//!
//! Real implementation of the geometry collaborator: parses a binary STL
//! payload (80-byte header, u32 triangle count, 50-byte triangle records)
//! and integrates the signed tetrahedron volume over the surface. Input
//! units are millimetres, output is cm³.

use crate::error::{FactoryError, FactoryResult};
use crate::traits::VolumeAnalyzer;

const HEADER_LEN: usize = 84;
const TRIANGLE_LEN: usize = 50;

/// Real volume analyzer implementation
#[derive(Clone, Default)]
pub struct StlVolumeAnalyzer;

impl StlVolumeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeAnalyzer for StlVolumeAnalyzer {
    fn measure(&self, payload: &[u8]) -> FactoryResult<f64> {
        if payload.len() < HEADER_LEN {
            return Err(FactoryError::invalid_mesh("payload shorter than an STL header"));
        }

        let count = u32::from_le_bytes([payload[80], payload[81], payload[82], payload[83]]) as usize;
        let expected = HEADER_LEN + count * TRIANGLE_LEN;
        if payload.len() != expected {
            // A well-formed binary file always matches the declared count;
            // a "solid" prefix on a mismatched body means an ASCII export
            if payload.starts_with(b"solid") {
                return Err(FactoryError::invalid_mesh("ASCII STL is not supported"));
            }
            return Err(FactoryError::invalid_mesh(format!(
                "expected {} bytes for {} triangles, got {}",
                expected,
                count,
                payload.len()
            )));
        }

        let mut volume_mm3 = 0.0_f64;
        for i in 0..count {
            // 12-byte normal vector first, then the three vertices
            let base = HEADER_LEN + i * TRIANGLE_LEN + 12;
            let v0 = read_vertex(payload, base);
            let v1 = read_vertex(payload, base + 12);
            let v2 = read_vertex(payload, base + 24);
            volume_mm3 += signed_tetrahedron_volume(v0, v1, v2);
        }

        Ok(volume_mm3.abs() / 1000.0)
    }
}

fn read_vertex(bytes: &[u8], offset: usize) -> [f64; 3] {
    [
        read_f32(bytes, offset),
        read_f32(bytes, offset + 4),
        read_f32(bytes, offset + 8),
    ]
}

fn read_f32(bytes: &[u8], offset: usize) -> f64 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]) as f64
}

/// Signed volume of the tetrahedron spanned by the origin and one triangle.
/// Summed over a closed, consistently oriented surface this yields the
/// enclosed volume.
fn signed_tetrahedron_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let cross = [
        b[1] * c[2] - b[2] * c[1],
        b[2] * c[0] - b[0] * c[2],
        b[0] * c[1] - b[1] * c[0],
    ];
    (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]) / 6.0
}
