//! Procedural geometry for the demo scene.
//!
//! Lit meshes are laid out as `position.xyz` followed by `normal.xyz`.
//! Flat meshes (light markers, grid) carry `position.xyz` and a straight
//! `rgba` color and are drawn without lighting.

use glam::{Vec3, Vec4};

use crate::scene::MeshShape;

pub const LIT_STRIDE: usize = 6;
pub const FLAT_STRIDE: usize = 7;

/// Interleaved position/normal triangle mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / LIT_STRIDE
    }

    pub fn from_shape(shape: &MeshShape) -> Self {
        match *shape {
            MeshShape::Plane {
                width,
                length,
                res_x,
                res_z,
            } => plane(width, length, res_x, res_z),
            MeshShape::Cuboid {
                width,
                height,
                length,
            } => cuboid(width, height, length),
        }
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) {
        self.vertices.extend_from_slice(&[
            position.x, position.y, position.z, normal.x, normal.y, normal.z,
        ]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Unlit colored geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatMesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl FlatMesh {
    fn new(topology: Topology) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLAT_STRIDE
    }

    fn push_vertex(&mut self, position: Vec3, color: Vec4) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&[
            position.x, position.y, position.z, color.x, color.y, color.z, color.w,
        ]);
        index
    }
}

/// XZ plane centered on the origin facing +Y, split into `res_x * res_z` quads.
pub fn plane(width: f32, length: f32, res_x: u32, res_z: u32) -> MeshData {
    let res_x = res_x.max(1);
    let res_z = res_z.max(1);
    let mut mesh = MeshData::default();

    for z in 0..=res_z {
        let pz = (z as f32 / res_z as f32 - 0.5) * length;
        for x in 0..=res_x {
            let px = (x as f32 / res_x as f32 - 0.5) * width;
            mesh.push_vertex(Vec3::new(px, 0.0, pz), Vec3::Y);
        }
    }

    let row = res_x + 1;
    for z in 0..res_z {
        for x in 0..res_x {
            let i0 = z * row + x;
            let i1 = i0 + 1;
            let i2 = i0 + row;
            let i3 = i2 + 1;
            // counter-clockwise seen from +Y
            mesh.indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    mesh
}

/// Axis-aligned box centered on the origin with one normal per face.
pub fn cuboid(width: f32, height: f32, length: f32) -> MeshData {
    let half = Vec3::new(width, height, length) * 0.5;
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    ];

    let mut mesh = MeshData::default();
    for (normal, right, up) in faces {
        let base = mesh.vertex_count() as u32;
        for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let corner = normal + right * sx + up * sy;
            mesh.push_vertex(corner * half, normal);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

fn sphere_point(center: Vec3, radius: f32, stack: u32, stacks: u32, slice: u32, slices: u32) -> Vec3 {
    let theta = std::f32::consts::PI * stack as f32 / stacks as f32;
    let phi = std::f32::consts::TAU * slice as f32 / slices as f32;
    center
        + radius * Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

/// Solid UV sphere; `rings` counts the latitude lines between the poles.
pub fn sphere(center: Vec3, radius: f32, rings: u32, slices: u32, color: Vec4) -> FlatMesh {
    let stacks = rings + 1;
    let slices = slices.max(3);
    let mut mesh = FlatMesh::new(Topology::Triangles);

    for stack in 0..=stacks {
        for slice in 0..=slices {
            mesh.push_vertex(
                sphere_point(center, radius, stack, stacks, slice, slices),
                color,
            );
        }
    }

    let row = slices + 1;
    for stack in 0..stacks {
        for slice in 0..slices {
            let i0 = stack * row + slice;
            let i1 = i0 + 1;
            let i2 = i0 + row;
            let i3 = i2 + 1;
            mesh.indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
        }
    }
    mesh
}

/// Wireframe counterpart of [`sphere`]: latitude rings plus meridians.
pub fn sphere_wires(center: Vec3, radius: f32, rings: u32, slices: u32, color: Vec4) -> FlatMesh {
    let stacks = rings + 1;
    let slices = slices.max(3);
    let mut mesh = FlatMesh::new(Topology::Lines);

    let row = slices + 1;
    for stack in 0..=stacks {
        for slice in 0..=slices {
            mesh.push_vertex(
                sphere_point(center, radius, stack, stacks, slice, slices),
                color,
            );
        }
    }

    for stack in 1..stacks {
        for slice in 0..slices {
            let i0 = stack * row + slice;
            mesh.indices.extend_from_slice(&[i0, i0 + 1]);
        }
    }
    for slice in 0..slices {
        for stack in 0..stacks {
            let i0 = stack * row + slice;
            mesh.indices.extend_from_slice(&[i0, i0 + row]);
        }
    }
    mesh
}

/// Reference grid on the XZ plane; the two center lines are darker.
pub fn grid(slices: u32, spacing: f32) -> FlatMesh {
    let half = (slices / 2) as f32 * spacing;
    let mut mesh = FlatMesh::new(Topology::Lines);

    for i in 0..=slices {
        let color = if i == slices / 2 {
            Vec4::new(0.5, 0.5, 0.5, 1.0)
        } else {
            Vec4::new(0.75, 0.75, 0.75, 1.0)
        };
        let offset = -half + i as f32 * spacing;
        let a = mesh.push_vertex(Vec3::new(offset, 0.0, -half), color);
        let b = mesh.push_vertex(Vec3::new(offset, 0.0, half), color);
        let c = mesh.push_vertex(Vec3::new(-half, 0.0, offset), color);
        let d = mesh.push_vertex(Vec3::new(half, 0.0, offset), color);
        mesh.indices.extend_from_slice(&[a, b, c, d]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_positions(mesh: &MeshData) -> impl Iterator<Item = Vec3> + '_ {
        mesh.vertices
            .chunks_exact(LIT_STRIDE)
            .map(|chunk| Vec3::from_slice(&chunk[..3]))
    }

    fn face_normal(mesh: &MeshData, triangle: &[u32]) -> Vec3 {
        let p: Vec<Vec3> = triangle
            .iter()
            .map(|&i| Vec3::from_slice(&mesh.vertices[i as usize * LIT_STRIDE..][..3]))
            .collect();
        (p[1] - p[0]).cross(p[2] - p[0]).normalize()
    }

    #[test]
    fn plane_has_expected_layout() {
        let mesh = plane(10.0, 10.0, 3, 3);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.indices.len(), 3 * 3 * 6);
        for position in lit_positions(&mesh) {
            assert!(position.x.abs() <= 5.0 && position.z.abs() <= 5.0);
            assert_eq!(position.y, 0.0);
        }
        for triangle in mesh.indices.chunks_exact(3) {
            assert!(face_normal(&mesh, triangle).dot(Vec3::Y) > 0.99);
        }
    }

    #[test]
    fn cuboid_winding_matches_normals() {
        let mesh = cuboid(2.0, 4.0, 2.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for triangle in mesh.indices.chunks_exact(3) {
            let stored = Vec3::from_slice(
                &mesh.vertices[triangle[0] as usize * LIT_STRIDE + 3..][..3],
            );
            assert!(face_normal(&mesh, triangle).dot(stored) > 0.99);
        }
        let max_y = lit_positions(&mesh).map(|p| p.y).fold(f32::MIN, f32::max);
        assert_eq!(max_y, 2.0);
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let center = Vec3::new(-2.0, 1.0, -2.0);
        let mesh = sphere(center, 0.2, 8, 8, Vec4::ONE);
        assert_eq!(mesh.topology, Topology::Triangles);
        assert_eq!(mesh.vertex_count(), 10 * 9);
        assert_eq!(mesh.indices.len(), 9 * 8 * 6);
        for chunk in mesh.vertices.chunks_exact(FLAT_STRIDE) {
            let p = Vec3::from_slice(&chunk[..3]);
            assert!((p.distance(center) - 0.2).abs() < 1e-5);
        }
    }

    #[test]
    fn wire_sphere_indices_are_line_pairs() {
        let mesh = sphere_wires(Vec3::ZERO, 0.2, 8, 8, Vec4::new(1.0, 0.0, 0.0, 0.3));
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.indices.len(), (8 * 8 + 8 * 9) * 2);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count));
        assert_eq!(mesh.vertices[6], 0.3);
    }

    #[test]
    fn grid_spans_slices_times_spacing() {
        let mesh = grid(10, 1.0);
        assert_eq!(mesh.vertex_count(), 44);
        assert_eq!(mesh.indices.len(), 44);
        let xs: Vec<f32> = mesh
            .vertices
            .chunks_exact(FLAT_STRIDE)
            .map(|chunk| chunk[0])
            .collect();
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 5.0);
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -5.0);
    }
}
