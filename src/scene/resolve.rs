use tracing::{debug, warn};

use super::{Scene, Shader, TextureRole};

/// Links shader data to materials once the scene graph is built.
pub trait MaterialResolver {
    fn resolve(&self, scene: &mut Scene);
}

/// Name based `UsdPreviewSurface` / `UsdUVTexture` linkage.
///
/// Preview surface inputs go to the material the shader is parented to.
/// Texture files are assigned to the first material of the scene, their role
/// guessed from the file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreviewSurfaceResolver;

impl MaterialResolver for PreviewSurfaceResolver {
    fn resolve(&self, scene: &mut Scene) {
        for shader_id in scene.shader_ids().to_vec() {
            let Some(shader) = scene.node(shader_id).shader.clone() else {
                continue;
            };

            if shader.is(Shader::PREVIEW_SURFACE) {
                apply_preview_surface(scene, &shader);
            } else if shader.is(Shader::UV_TEXTURE) {
                apply_texture(scene, &shader);
            }
        }
    }
}

fn apply_preview_surface(scene: &mut Scene, shader: &Shader) {
    let material_path = shader.path.parent();

    let Some(id) = scene.find(material_path.as_str()) else {
        debug!("No material at {} for shader {}", material_path, shader.path);
        return;
    };

    let Some(material) = scene.node_mut(id).material.as_mut() else {
        debug!("{} is not a material", material_path);
        return;
    };

    if let Some(color) = shader.input("inputs:diffuseColor").and_then(|value| value.as_dvec3()) {
        material.diffuse_color = color.as_vec3();
        debug!("Applied diffuse color {} to material {}", material.diffuse_color, material.path);
    }

    if let Some(metallic) = shader.input("inputs:metallic").and_then(|value| value.as_f32()) {
        material.metallic = metallic;
    }

    if let Some(roughness) = shader.input("inputs:roughness").and_then(|value| value.as_f32()) {
        material.roughness = roughness;
    }
}

fn apply_texture(scene: &mut Scene, shader: &Shader) {
    let Some(file) = shader.input("inputs:file").and_then(|value| value.as_str()) else {
        debug!("Texture shader {} has no inputs:file", shader.path);
        return;
    };

    if file.is_empty() {
        return;
    }

    let Some(id) = scene.material_ids().first().copied() else {
        return;
    };

    let Some(material) = scene.node_mut(id).material.as_mut() else {
        return;
    };

    match TextureRole::classify(file) {
        Some(role) => {
            debug!("Applied {} texture {} to material {}", role, file, material.path);
            material.set_texture(role, file);
        }
        None => {
            warn!("Unable to guess the role of texture {}, using it as diffuse if unset", file);

            if material.texture(TextureRole::Diffuse).is_none() {
                material.set_texture(TextureRole::Diffuse, file);
            }
        }
    }
}
