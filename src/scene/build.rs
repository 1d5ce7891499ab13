//! Scene reconstruction.
//!
//! Walks the path tree depth-first, turning every prim path into a [SceneNode].
//! Property paths don't become nodes, their values are attached to the owning prim.

use std::collections::HashMap;

use anyhow::{ensure, Result};
use tracing::{debug, trace};

use crate::{
    sdf::{FieldKey, Value},
    usdc::{CrateData, Error},
};

use super::{Material, MaterialResolver, Mesh, NodeType, PreviewSurfaceResolver, Scene, SceneNode, Shader};

const MATERIAL_BINDING: &str = "material:binding";
const XFORM_OP_PREFIX: &str = "xformOp:";

/// Reconstruct the scene using [PreviewSurfaceResolver].
pub fn build(data: &CrateData) -> Result<Scene> {
    build_with(data, &PreviewSurfaceResolver)
}

/// Reconstruct the scene, linking materials with `resolver`.
///
/// Property paths don't get nodes of their own, their values fold into the node of their prim.
pub fn build_with(data: &CrateData, resolver: &dyn MaterialResolver) -> Result<Scene> {
    ensure!(
        data.paths.len() == data.nodes.len(),
        Error::format(format!(
            "Path count {} doesn't match node count {}",
            data.paths.len(),
            data.nodes.len()
        ))
    );

    let mut scene = Scene::default();

    let Some(root) = data.root() else {
        return Ok(scene);
    };

    let properties = properties_by_prim(data);

    let mut stack = vec![(root, None)];

    while let Some((index, parent)) = stack.pop() {
        let mut node = SceneNode::new(data.paths[index].clone(), parent);

        if let Some(spec) = data.spec_at(index) {
            apply_spec(&mut node, &spec.fields);
        }

        for property in properties.get(&index).into_iter().flatten() {
            apply_attribute(&mut node, data, *property);
        }

        trace!("{} ({})", node.path, node.ty);

        let id = scene.push(node);
        scene.register(id);

        // Reversed, so children come off the stack in file order.
        stack.extend(
            data.nodes[index]
                .children
                .iter()
                .rev()
                .filter(|child| !data.paths[**child].is_property_path())
                .map(|child| (*child, Some(id))),
        );
    }

    resolver.resolve(&mut scene);

    debug!(
        "Scene reconstruction complete: {} nodes, {} meshes, {} materials, {} shaders",
        scene.len(),
        scene.meshes().count(),
        scene.materials().count(),
        scene.shaders().count()
    );

    Ok(scene)
}

/// Property path indices grouped by the path index of their prim.
fn properties_by_prim(data: &CrateData) -> HashMap<usize, Vec<usize>> {
    let mut properties = HashMap::<usize, Vec<usize>>::new();

    for (index, path) in data.paths.iter().enumerate() {
        if !path.is_property_path() {
            continue;
        }

        if let Some(prim) = data.path_index(&path.prim_path()) {
            properties.entry(prim).or_default().push(index);
        }
    }

    properties
}

/// Classify the node from `typeName`, then store and route every spec field.
fn apply_spec(node: &mut SceneNode, fields: &[(String, Value)]) {
    let type_name = fields
        .iter()
        .find(|(name, _)| name == FieldKey::TypeName.as_str())
        .and_then(|(_, value)| value.as_str());

    if let Some(type_name) = type_name {
        node.ty = NodeType::from_type_name(type_name);
    }

    match node.ty {
        NodeType::GeomMesh => node.mesh = Some(Mesh::new(node.name.clone())),
        NodeType::Material => node.material = Some(Material::new(node.name.clone(), node.path.clone())),
        NodeType::Shader => node.shader = Some(Shader::new(node.name.clone(), node.path.clone())),
        _ => {}
    }

    for (name, value) in fields {
        node.fields.insert(name.clone(), value.clone());
        route(node, name, value);
    }
}

/// Attach the value of a property spec to its prim.
fn apply_attribute(node: &mut SceneNode, data: &CrateData, property: usize) {
    let Some(spec) = data.spec_at(property) else {
        return;
    };

    let attr = data.paths[property].name();

    for (field, value) in &spec.fields {
        if field == FieldKey::Default.as_str() || field == FieldKey::TimeSamples.as_str() {
            node.fields.insert(attr.to_string(), value.clone());
            route(node, attr, value);
        } else if attr == MATERIAL_BINDING && field == FieldKey::TargetPaths.as_str() {
            let target = value.to_string_list().into_iter().next();

            if let (Some(mesh), Some(target)) = (node.mesh.as_mut(), target) {
                debug!("Bound material {} to {}", target, node.path);
                mesh.material_path = Some(target);
            }
        }
    }
}

/// Hand a value to the transform and to whichever payload the node carries.
fn route(node: &mut SceneNode, name: &str, value: &Value) {
    if name.starts_with(XFORM_OP_PREFIX) {
        node.transform.apply(name, value);
    }

    if let Some(mesh) = node.mesh.as_mut() {
        mesh.apply(name, value);
    }

    if let Some(material) = node.material.as_mut() {
        material.shader_inputs.insert(name.to_string(), value.clone());
    }

    if let Some(shader) = node.shader.as_mut() {
        shader.apply(name, value);
    }
}
