use std::collections::BTreeMap;

use glam::Vec3;
use strum::{Display, EnumIter};

use crate::sdf::{self, Value};

/// What a texture is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum TextureRole {
    Diffuse,
    Normal,
    Metallic,
    Roughness,
    Occlusion,
    Emissive,
}

impl TextureRole {
    /// Guess the role from the texture file name (`_bc.`, `normal`, `_ao.`, ...).
    pub fn classify(path: &str) -> Option<TextureRole> {
        const PATTERNS: [(TextureRole, &[&str]); 6] = [
            (TextureRole::Diffuse, &["_bc.", "basecolor", "diffuse"]),
            (TextureRole::Normal, &["_n.", "normal"]),
            (TextureRole::Metallic, &["_m.", "metallic", "metalness"]),
            (TextureRole::Roughness, &["_r.", "roughness"]),
            (TextureRole::Occlusion, &["_ao.", "occlusion", "ambient"]),
            (TextureRole::Emissive, &["emissive"]),
        ];

        let path = path.to_lowercase();

        PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|pattern| path.contains(pattern)))
            .map(|(role, _)| *role)
    }
}

/// PBR material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub path: sdf::Path,

    pub diffuse_color: Vec3,
    pub emissive_color: Vec3,
    pub specular_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub opacity: f32,
    /// Index of refraction.
    pub ior: f32,

    /// Texture file per role.
    pub textures: BTreeMap<TextureRole, String>,
    /// Every field authored on the material prim.
    pub shader_inputs: BTreeMap<String, Value>,
}

impl Material {
    pub fn new(name: impl Into<String>, path: sdf::Path) -> Self {
        Material {
            name: name.into(),
            path,
            diffuse_color: Vec3::splat(0.8),
            emissive_color: Vec3::ZERO,
            specular_color: Vec3::ONE,
            metallic: 0.0,
            roughness: 0.5,
            opacity: 1.0,
            ior: 1.5,
            textures: BTreeMap::new(),
            shader_inputs: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn texture(&self, role: TextureRole) -> Option<&str> {
        self.textures.get(&role).map(String::as_str)
    }

    #[inline]
    pub fn set_texture(&mut self, role: TextureRole, path: impl Into<String>) {
        self.textures.insert(role, path.into());
    }
}

/// Shader prim of a material network.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub name: String,
    pub path: sdf::Path,
    /// `info:id`, e.g. `UsdPreviewSurface` or `UsdUVTexture`.
    pub id: Option<String>,
    pub inputs: BTreeMap<String, Value>,
}

impl Shader {
    pub const PREVIEW_SURFACE: &'static str = "UsdPreviewSurface";
    pub const UV_TEXTURE: &'static str = "UsdUVTexture";

    pub fn new(name: impl Into<String>, path: sdf::Path) -> Self {
        Shader {
            name: name.into(),
            path,
            id: None,
            inputs: BTreeMap::new(),
        }
    }

    /// Store a shader field, `info:id` also sets the shader id.
    pub fn apply(&mut self, name: &str, value: &Value) {
        if name == "info:id" {
            if let Some(id) = value.as_str() {
                self.id = Some(id.to_string());
            }
        }

        self.inputs.insert(name.to_string(), value.clone());
    }

    #[inline]
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    #[inline]
    pub fn is(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}
