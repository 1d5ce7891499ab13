//! Scene graph reconstructed from a crate file.
//!
//! Nodes live in an arena owned by [Scene] and refer to each other by [NodeId].

use std::{collections::BTreeMap, collections::HashMap, fmt};

use glam::DMat4;
use strum::Display;

use crate::sdf::{self, Value};

mod build;
mod material;
mod mesh;
mod resolve;
mod transform;

pub use build::{build, build_with};
pub use material::{Material, Shader, TextureRole};
pub use mesh::{Mesh, Orientation};
pub use resolve::{MaterialResolver, PreviewSurfaceResolver};
pub use transform::{euler_to_quat, Transform};

/// Handle of a node in [Scene].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node classification, from the prim's `typeName`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeType {
    /// No `typeName` (or no spec at all).
    #[default]
    Null,
    GeomMesh,
    Xform,
    Material,
    Shader,
    /// `Scope` or `Group`.
    Group,
    /// Any other type name.
    Custom,
}

impl NodeType {
    pub fn from_type_name(type_name: &str) -> NodeType {
        match type_name {
            "" => NodeType::Null,
            "Mesh" => NodeType::GeomMesh,
            "Xform" => NodeType::Xform,
            "Material" => NodeType::Material,
            "Shader" => NodeType::Shader,
            "Scope" | "Group" => NodeType::Group,
            _ => NodeType::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Local name, empty for the root.
    pub name: String,
    pub path: sdf::Path,
    pub ty: NodeType,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub material: Option<Material>,
    pub shader: Option<Shader>,
    /// Spec fields and attribute values as read from the file.
    pub fields: BTreeMap<String, Value>,
}

impl SceneNode {
    pub fn new(path: sdf::Path, parent: Option<NodeId>) -> Self {
        SceneNode {
            name: path.name().to_string(),
            path,
            ty: NodeType::Null,
            parent,
            children: Vec::new(),
            transform: Transform::default(),
            mesh: None,
            material: None,
            shader: None,
            fields: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Decoded scene.
#[derive(Debug, Default, Clone)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    lookup: HashMap<sdf::Path, NodeId>,
    /// Nodes carrying a payload, in traversal order.
    meshes: Vec<NodeId>,
    materials: Vec<NodeId>,
    shaders: Vec<NodeId>,
}

impl Scene {
    /// Add a node and link it to its parent.
    pub(crate) fn push(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());

        if let Some(parent) = node.parent {
            self.nodes[parent.0].children.push(id);
        }

        self.lookup.insert(node.path.clone(), id);
        self.nodes.push(node);

        id
    }

    /// Record the payloads a node ended up with.
    pub(crate) fn register(&mut self, id: NodeId) {
        let node = &self.nodes[id.0];

        if node.mesh.is_some() {
            self.meshes.push(id);
        }
        if node.material.is_some() {
            self.materials.push(id);
        }
        if node.shader.is_some() {
            self.shaders.push(id);
        }
    }

    /// The absolute root `/`.
    #[inline]
    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.first()
    }

    /// All nodes, in depth-first order.
    #[inline]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    /// Node at `path`.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let path = sdf::path(path).ok()?;
        self.lookup.get(&path).copied()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &SceneNode> {
        self.nodes[id.0].children.iter().map(|child| self.node(*child))
    }

    pub fn mesh(&self, path: &str) -> Option<&Mesh> {
        self.find(path).and_then(|id| self.node(id).mesh.as_ref())
    }

    pub fn material(&self, path: &str) -> Option<&Material> {
        self.find(path).and_then(|id| self.node(id).material.as_ref())
    }

    pub fn shader(&self, path: &str) -> Option<&Shader> {
        self.find(path).and_then(|id| self.node(id).shader.as_ref())
    }

    /// Meshes in traversal order.
    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter().filter_map(|id| self.node(*id).mesh.as_ref())
    }

    /// Materials in traversal order.
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter().filter_map(|id| self.node(*id).material.as_ref())
    }

    /// Shaders in traversal order.
    pub fn shaders(&self) -> impl Iterator<Item = &Shader> {
        self.shaders.iter().filter_map(|id| self.node(*id).shader.as_ref())
    }

    /// Ids of the nodes holding a material, in traversal order.
    #[inline]
    pub fn material_ids(&self) -> &[NodeId] {
        &self.materials
    }

    /// Ids of the nodes holding a shader, in traversal order.
    #[inline]
    pub fn shader_ids(&self) -> &[NodeId] {
        &self.shaders
    }

    /// Nodes classified as `Mesh`.
    pub fn mesh_nodes(&self) -> Vec<&SceneNode> {
        self.nodes_of(NodeType::GeomMesh)
    }

    /// Nodes classified as `Material`.
    pub fn material_nodes(&self) -> Vec<&SceneNode> {
        self.nodes_of(NodeType::Material)
    }

    fn nodes_of(&self, ty: NodeType) -> Vec<&SceneNode> {
        self.nodes.iter().filter(|node| node.ty == ty).collect()
    }

    /// Local transform composed with every ancestor's.
    pub fn world_transform(&self, id: NodeId) -> DMat4 {
        let mut matrix = self.node(id).transform.to_matrix();
        let mut parent = self.node(id).parent;

        while let Some(current) = parent {
            let node = self.node(current);
            matrix = node.transform.to_matrix() * matrix;
            parent = node.parent;
        }

        matrix
    }
}
