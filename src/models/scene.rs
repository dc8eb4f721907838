//! Plain snapshots of host scene objects.
//!
//! The host application owns the real scene graph. These types are what the
//! [`SceneHost`](crate::host::SceneHost) hands to the services, and they are also what the
//! `meshport check` command reads from a YAML scene dump.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Identity of a host object.
///
/// Two objects with the same name but different ids are different objects, e.g. an
/// armature that an importer deleted and recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub head: [f32; 3],
    pub tail: [f32; 3],
}

impl Bone {
    pub fn new(name: impl Into<String>, head: [f32; 3], tail: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            head,
            tail,
        }
    }

    /// Number of axes on which head and tail share the exact same coordinate.
    pub fn equal_axis_count(&self) -> usize {
        self.head
            .iter()
            .zip(self.tail.iter())
            .filter(|(head, tail)| head == tail)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub bones: Vec<Bone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Reference count as reported by the host. Zero-user materials are orphans.
    #[serde(default = "default_users")]
    pub users: u32,
    /// Image file paths referenced by the material's textures.
    #[serde(default)]
    pub textures: Vec<Utf8PathBuf>,
}

fn default_users() -> u32 {
    1
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: default_users(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.textures.push(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeKey {
    pub name: String,
    /// Vertex coordinates of this key, in vertex order.
    #[serde(default)]
    pub coords: Vec<[f32; 3]>,
}

impl ShapeKey {
    pub fn new(name: impl Into<String>, coords: Vec<[f32; 3]>) -> Self {
        Self {
            name: name.into(),
            coords,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    #[serde(default)]
    pub polygon_count: usize,
    /// Material slots; an empty slot is `None`.
    #[serde(default)]
    pub material_slots: Vec<Option<Material>>,
    /// Shape keys, the first one being the base (reference) key.
    #[serde(default)]
    pub shape_keys: Vec<ShapeKey>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, polygon_count: usize) -> Self {
        Self {
            name: name.into(),
            polygon_count,
            material_slots: Vec::new(),
            shape_keys: Vec::new(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material_slots.push(Some(material));
        self
    }

    pub fn with_shape_key(mut self, key: ShapeKey) -> Self {
        self.shape_keys.push(key);
        self
    }

    /// All shape keys except the base key.
    pub fn morph_keys(&self) -> &[ShapeKey] {
        self.shape_keys.get(1..).unwrap_or(&[])
    }
}

/// A scene dump as read by the command-line checker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default)]
    pub document_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub armatures: Vec<Armature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_axis_count() {
        assert_eq!(Bone::new("a", [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]).equal_axis_count(), 2);
        assert_eq!(Bone::new("b", [0.0, 0.0, 0.0], [0.5, 1.0, 0.0]).equal_axis_count(), 1);
        assert_eq!(Bone::new("c", [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]).equal_axis_count(), 3);
    }

    #[test]
    fn test_morph_keys_skip_base() {
        let mesh = Mesh::new("Body", 10)
            .with_shape_key(ShapeKey::new("Basis", vec![]))
            .with_shape_key(ShapeKey::new("vrc.blink_left", vec![]));
        assert_eq!(mesh.morph_keys().len(), 1);
        assert_eq!(mesh.morph_keys()[0].name, "vrc.blink_left");
        assert!(Mesh::new("Empty", 0).morph_keys().is_empty());
    }

    #[test]
    fn test_snapshot_from_yaml() {
        let yaml = r#"
meshes:
  - name: Body
    polygon_count: 1200
    material_slots:
      - name: Skin
        textures: [skin.png]
      - null
    shape_keys:
      - name: Basis
        coords: [[0.0, 0.0, 0.0]]
"#;
        let snapshot: SceneSnapshot = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(snapshot.meshes.len(), 1);
        let mesh = &snapshot.meshes[0];
        assert_eq!(mesh.material_slots.len(), 2);
        assert_eq!(mesh.material_slots[0].as_ref().unwrap().users, 1);
        assert!(mesh.material_slots[1].is_none());
    }
}
