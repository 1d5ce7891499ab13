use glam::{Vec2, Vec3};
use strum::{Display, EnumString};
use tracing::trace;

use crate::sdf::Value;

/// Winding order of the mesh faces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Orientation {
    #[default]
    #[strum(serialize = "rightHanded")]
    RightHanded,
    #[strum(serialize = "leftHanded")]
    LeftHanded,
}

/// Accumulated normals shorter than this are left as is.
const MIN_NORMAL_LENGTH: f32 = 1e-4;

/// Polygon mesh as authored on a `Mesh` prim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    /// Indices into `tex_coords` of an indexed (usually face-varying) `primvars:st`.
    pub tex_coord_indices: Vec<i32>,
    /// Per face-vertex indices into `vertices`, faces are laid out back to back.
    pub face_vertex_indices: Vec<i32>,
    /// Number of vertices of each face.
    pub face_vertex_counts: Vec<i32>,
    /// Target of the `material:binding` relationship.
    pub material_path: Option<String>,
    pub subdivision_scheme: Option<String>,
    pub orientation: Orientation,
    pub double_sided: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Mesh {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Store a mesh attribute. Returns `false` if the attribute isn't a mesh one.
    pub fn apply(&mut self, name: &str, value: &Value) -> bool {
        match (name, value) {
            ("points", Value::Vec3fArray(points)) => self.vertices = points.clone(),
            ("normals", Value::Vec3fArray(normals)) => self.normals = normals.clone(),
            ("primvars:st" | "st", Value::Vec2fArray(st)) => self.tex_coords = st.clone(),
            ("primvars:st:indices" | "st:indices", Value::IntArray(indices)) => {
                self.tex_coord_indices = indices.clone()
            }
            ("faceVertexIndices", Value::IntArray(indices)) => self.face_vertex_indices = indices.clone(),
            ("faceVertexCounts", Value::IntArray(counts)) => self.face_vertex_counts = counts.clone(),
            ("orientation", value) => match value.as_str().and_then(|str| str.parse().ok()) {
                Some(orientation) => self.orientation = orientation,
                None => return false,
            },
            ("doubleSided", Value::Bool(double_sided)) => self.double_sided = *double_sided,
            ("subdivisionScheme", value) => match value.as_str() {
                Some(scheme) => self.subdivision_scheme = Some(scheme.to_string()),
                None => return false,
            },
            _ => return false,
        }

        true
    }

    /// Faces with their index ranges into `face_vertex_indices`.
    ///
    /// Stops at the first face that runs past the index buffer.
    fn faces(&self) -> impl Iterator<Item = &[i32]> + '_ {
        let mut offset = 0_usize;

        self.face_vertex_counts.iter().map_while(move |count| {
            let count = usize::try_from(*count).unwrap_or(0);
            let face = self.face_vertex_indices.get(offset..offset.checked_add(count)?)?;

            offset += count;
            Some(face)
        })
    }

    /// Fan triangulation of every face with 3 or more vertices.
    ///
    /// Faces with negative indices are skipped.
    pub fn triangulated_indices(&self) -> Vec<[u32; 3]> {
        let mut triangles = Vec::new();

        for face in self.faces() {
            if face.len() < 3 {
                continue;
            }

            let Ok(face) = face.iter().map(|index| u32::try_from(*index)).collect::<Result<Vec<_>, _>>() else {
                trace!("Skipping face with negative indices");
                continue;
            };

            triangles.extend((1..face.len() - 1).map(|i| [face[0], face[i], face[i + 1]]));
        }

        triangles
    }

    /// Recompute per-vertex normals from the faces.
    ///
    /// Each face's cross product (from its first three vertices) is accumulated
    /// onto every vertex of that face, then the sums are normalized.
    pub fn compute_normals(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        let count = self.vertices.len();
        let vertex = |index: i32| usize::try_from(index).ok().filter(|index| *index < count);

        let mut normals = vec![Vec3::ZERO; count];

        for face in self.faces() {
            if face.len() < 3 {
                continue;
            }

            let (Some(i0), Some(i1), Some(i2)) = (vertex(face[0]), vertex(face[1]), vertex(face[2])) else {
                continue;
            };

            let v0 = self.vertices[i0];
            let normal = (self.vertices[i1] - v0).cross(self.vertices[i2] - v0);

            for index in face.iter().filter_map(|index| vertex(*index)) {
                normals[index] += normal;
            }
        }

        for normal in &mut normals {
            let length = normal.length();
            if length > MIN_NORMAL_LENGTH {
                *normal /= length;
            }
        }

        self.normals = normals;
    }

    /// Compute normals when they're missing or don't match the vertex count.
    pub fn ensure_normals(&mut self) {
        if self.normals.len() != self.vertices.len() {
            self.compute_normals();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    fn quad() -> Mesh {
        Mesh {
            vertices: vec![
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            face_vertex_indices: vec![0, 1, 2, 3],
            face_vertex_counts: vec![4],
            ..Mesh::new("Quad")
        }
    }

    #[test]
    fn test_triangulate_quad() {
        assert_eq!(quad().triangulated_indices(), vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_triangulate_polygons() {
        for n in 3..10 {
            let mesh = Mesh {
                face_vertex_indices: (0..n).collect(),
                face_vertex_counts: vec![n],
                ..Default::default()
            };

            let triangles = mesh.triangulated_indices();
            assert_eq!(triangles.len(), n as usize - 2);
            assert!(triangles.iter().flatten().all(|index| (*index as i32) < n));

            for (i, triangle) in triangles.iter().enumerate() {
                assert_eq!(*triangle, [0, i as u32 + 1, i as u32 + 2]);
            }
        }
    }

    #[test]
    fn test_triangulate_mixed_faces() {
        let mesh = Mesh {
            // Triangle, degenerate line, quad.
            face_vertex_indices: vec![0, 1, 2, 7, 8, 3, 4, 5, 6],
            face_vertex_counts: vec![3, 2, 4],
            ..Default::default()
        };

        assert_eq!(mesh.triangulated_indices(), vec![[0, 1, 2], [3, 4, 5], [3, 5, 6]]);
    }

    #[test]
    fn test_triangulate_truncated_indices() {
        let mesh = Mesh {
            face_vertex_indices: vec![0, 1, 2, 3],
            face_vertex_counts: vec![3, 3],
            ..Default::default()
        };

        assert_eq!(mesh.triangulated_indices(), vec![[0, 1, 2]]);
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = quad();
        assert!(mesh.normals.is_empty());

        mesh.ensure_normals();

        assert_eq!(mesh.normals.len(), 4);
        assert!(mesh.normals.iter().all(|normal| *normal == Vec3::Z));
    }

    #[test]
    fn test_degenerate_normals_stay_zero() {
        let mut mesh = Mesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0, Vec3::Y],
            face_vertex_indices: vec![0, 1, 2],
            face_vertex_counts: vec![3],
            ..Default::default()
        };

        mesh.compute_normals();

        // Collinear face, untouched vertex.
        assert_eq!(mesh.normals, vec![Vec3::ZERO; 4]);
    }

    #[test]
    fn test_out_of_range_indices_are_ignored() {
        let mut mesh = Mesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            face_vertex_indices: vec![0, 1, 2, 0, 1, 9],
            face_vertex_counts: vec![3, 3],
            ..Default::default()
        };

        mesh.compute_normals();
        assert!(mesh.normals.iter().all(|normal| *normal == Vec3::Z));
    }

    #[test]
    fn test_apply_attributes() {
        let mut mesh = Mesh::new("Mesh");

        assert!(mesh.apply("faceVertexCounts", &Value::IntArray(vec![3])));
        assert!(mesh.apply("orientation", &Value::Token("leftHanded".into())));
        assert!(mesh.apply("doubleSided", &Value::Bool(true)));
        assert!(mesh.apply("subdivisionScheme", &Value::Token("none".into())));
        assert!(!mesh.apply("points", &Value::IntArray(vec![])));
        assert!(!mesh.apply("orientation", &Value::Token("sideways".into())));
        assert!(!mesh.apply("typeName", &Value::Token("Mesh".into())));

        assert_eq!(mesh.face_vertex_counts, vec![3]);
        assert_eq!(mesh.orientation, Orientation::LeftHanded);
        assert!(mesh.double_sided);
        assert_eq!(mesh.subdivision_scheme.as_deref(), Some("none"));
    }
}
