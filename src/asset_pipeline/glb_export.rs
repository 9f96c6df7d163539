use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::mem::{offset_of, size_of};
use std::path::Path;

use anyhow::Context;
use gltf::json;
use gltf::json::accessor::{ComponentType, Type};
use gltf::json::validation::Checked::Valid;
use gltf::json::validation::USize64;

use crate::armature::Armature;
use crate::asset_pipeline::materials::PbrMaterialData;
use crate::asset_pipeline::mesh_baker::{BakedMesh, SkinnedVertex};

const GLB_HEADER_LENGTH: usize = 12;
const GLB_CHUNK_HEADER_LENGTH: usize = 8;

pub struct ExportAsset<'a> {
    pub mesh: &'a BakedMesh,
    pub armature: &'a Armature,
    pub material: &'a PbrMaterialData,
    pub generator: &'a str,
}

fn align_to_four(length: usize) -> usize {
    (length + 3) & !3
}

/// Packs the BIN chunk, keeping every view 4-byte aligned.
#[derive(Default)]
struct BinaryBuffer {
    data: Vec<u8>,
}

impl BinaryBuffer {
    fn push(&mut self, bytes: &[u8]) -> (usize, usize) {
        self.data.resize(align_to_four(self.data.len()), 0);
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        (offset, bytes.len())
    }

    fn into_padded(mut self) -> Vec<u8> {
        self.data.resize(align_to_four(self.data.len()), 0);
        self.data
    }
}

fn buffer_view(
    root: &mut json::Root,
    buffer: json::Index<json::Buffer>,
    (offset, length): (usize, usize),
    stride: Option<usize>,
    target: Option<json::buffer::Target>,
    name: &str,
) -> json::Index<json::buffer::View> {
    root.push(json::buffer::View {
        buffer,
        byte_length: USize64::from(length),
        byte_offset: Some(USize64::from(offset)),
        byte_stride: stride.map(json::buffer::Stride),
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(name.to_string()),
        target: target.map(Valid),
    })
}

#[allow(clippy::too_many_arguments)]
fn accessor(
    root: &mut json::Root,
    view: json::Index<json::buffer::View>,
    byte_offset: usize,
    count: usize,
    component_type: ComponentType,
    type_: Type,
    bounds: Option<([f32; 3], [f32; 3])>,
    name: &str,
) -> json::Index<json::Accessor> {
    let (min, max) = match bounds {
        Some((min, max)) => (
            Some(json::Value::from(min.to_vec())),
            Some(json::Value::from(max.to_vec())),
        ),
        None => (None, None),
    };

    root.push(json::Accessor {
        buffer_view: Some(view),
        byte_offset: Some(USize64::from(byte_offset)),
        count: USize64::from(count),
        component_type: Valid(json::accessor::GenericComponentType(component_type)),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(type_),
        min,
        max,
        name: Some(name.to_string()),
        normalized: false,
        sparse: None,
    })
}

/// Builds the complete GLB: one skinned mesh under the armature node, the
/// bone node hierarchy, one skin and one material. No animations.
pub fn build_glb(asset: &ExportAsset) -> anyhow::Result<Vec<u8>> {
    let ExportAsset {
        mesh,
        armature,
        material,
        generator,
    } = *asset;

    let joints = armature.joint_order()?;
    let inverse_bind_matrices = joints
        .iter()
        .map(|&id| armature.inverse_bind_matrix(id).to_cols_array())
        .collect::<Vec<[f32; 16]>>();

    let mut binary = BinaryBuffer::default();
    let vertex_range = binary.push(bytemuck::cast_slice(&mesh.vertices));
    let index_range = binary.push(bytemuck::cast_slice(&mesh.indices));
    let matrix_range = binary.push(bytemuck::cast_slice(&inverse_bind_matrices));
    let bin = binary.into_padded();

    let mut root = json::Root {
        asset: json::Asset {
            generator: Some(generator.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    let buffer = root.push(json::Buffer {
        byte_length: USize64::from(bin.len()),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    });

    let vertex_view = buffer_view(
        &mut root,
        buffer,
        vertex_range,
        Some(size_of::<SkinnedVertex>()),
        Some(json::buffer::Target::ArrayBuffer),
        "Vertices",
    );
    let index_view = buffer_view(
        &mut root,
        buffer,
        index_range,
        None,
        Some(json::buffer::Target::ElementArrayBuffer),
        "Indices",
    );
    let matrix_view = buffer_view(&mut root, buffer, matrix_range, None, None, "InverseBindMatrices");

    let vertex_count = mesh.vertices.len();
    let positions = accessor(
        &mut root,
        vertex_view,
        offset_of!(SkinnedVertex, position),
        vertex_count,
        ComponentType::F32,
        Type::Vec3,
        Some((mesh.bounds.min.to_array(), mesh.bounds.max.to_array())),
        "POSITION",
    );
    let normals = accessor(
        &mut root,
        vertex_view,
        offset_of!(SkinnedVertex, normal),
        vertex_count,
        ComponentType::F32,
        Type::Vec3,
        None,
        "NORMAL",
    );
    let joint_indices = accessor(
        &mut root,
        vertex_view,
        offset_of!(SkinnedVertex, joints),
        vertex_count,
        ComponentType::U16,
        Type::Vec4,
        None,
        "JOINTS_0",
    );
    let weights = accessor(
        &mut root,
        vertex_view,
        offset_of!(SkinnedVertex, weights),
        vertex_count,
        ComponentType::F32,
        Type::Vec4,
        None,
        "WEIGHTS_0",
    );
    let indices = accessor(
        &mut root,
        index_view,
        0,
        mesh.indices.len(),
        ComponentType::U32,
        Type::Scalar,
        None,
        "Indices",
    );
    let matrices = accessor(
        &mut root,
        matrix_view,
        0,
        inverse_bind_matrices.len(),
        ComponentType::F32,
        Type::Mat4,
        None,
        "InverseBindMatrices",
    );

    let material = root.push(json::Material {
        name: Some(material.name.clone()),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor(material.base_color_factor),
            metallic_factor: json::material::StrengthFactor(material.metallic_factor),
            roughness_factor: json::material::StrengthFactor(material.roughness_factor),
            ..Default::default()
        },
        ..Default::default()
    });

    let primitive = json::mesh::Primitive {
        attributes: BTreeMap::from([
            (Valid(json::mesh::Semantic::Positions), positions),
            (Valid(json::mesh::Semantic::Normals), normals),
            (Valid(json::mesh::Semantic::Joints(0)), joint_indices),
            (Valid(json::mesh::Semantic::Weights(0)), weights),
        ]),
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(indices),
        material: Some(material),
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    };

    let gltf_mesh = root.push(json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(mesh.name.clone()),
        primitives: vec![primitive],
        weights: None,
    });

    // Joint nodes go first, in joint order, so joint k is node k
    let joint_slot = joints
        .iter()
        .enumerate()
        .map(|(slot, &id)| (id, slot))
        .collect::<HashMap<_, _>>();

    let joint_nodes = joints
        .iter()
        .map(|&id| {
            let children = armature
                .children(id)
                .map(|child| json::Index::new(joint_slot[&child] as u32))
                .collect::<Vec<_>>();

            root.push(json::Node {
                name: Some(armature.bone(id).name.clone()),
                translation: Some(armature.local_translation(id).to_array()),
                children: (!children.is_empty()).then_some(children),
                ..Default::default()
            })
        })
        .collect::<Vec<_>>();

    let skin = root.push(json::Skin {
        extensions: Default::default(),
        extras: Default::default(),
        inverse_bind_matrices: Some(matrices),
        joints: joint_nodes.clone(),
        name: Some(armature.name.clone()),
        skeleton: Some(joint_nodes[0]),
    });

    let mesh_node = root.push(json::Node {
        name: Some(mesh.name.clone()),
        mesh: Some(gltf_mesh),
        skin: Some(skin),
        ..Default::default()
    });

    let armature_node = root.push(json::Node {
        name: Some(armature.name.clone()),
        children: Some(vec![joint_nodes[0], mesh_node]),
        ..Default::default()
    });

    let scene = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some("Scene".to_string()),
        nodes: vec![armature_node],
    });
    root.scene = Some(scene);

    let mut json_bytes = json::serialize::to_vec(&root).context("Failed to serialize glTF JSON")?;
    json_bytes.resize(align_to_four(json_bytes.len()), b' ');

    let length = GLB_HEADER_LENGTH + 2 * GLB_CHUNK_HEADER_LENGTH + json_bytes.len() + bin.len();
    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: u32::try_from(length).context("GLB exceeds the 4 GiB format limit")?,
        },
        json: Cow::Owned(json_bytes),
        bin: Some(Cow::Owned(bin)),
    };

    let mut bytes = Vec::with_capacity(length);
    glb.to_writer(&mut bytes).context("Failed to encode GLB")?;

    Ok(bytes)
}

/// Writes the asset to `path`, creating missing parent directories.
/// Returns the number of bytes written.
pub fn export_glb(path: &Path, asset: &ExportAsset) -> anyhow::Result<usize> {
    let bytes = build_glb(asset)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::armature::Armature;
    use crate::asset_pipeline::mesh_baker::bake_skinned_mesh;
    use crate::geometry::tests::cube;
    use crate::skinning::VertexInfluence;

    use super::*;

    fn two_bone_armature() -> Armature {
        let mut armature = Armature::new("Rig");
        let root = armature
            .add_bone("root", Vec3::ZERO, Vec3::Y, None, false)
            .unwrap();
        armature
            .add_bone("tip", Vec3::Y, Vec3::new(0.0, 2.0, 0.0), Some(root), true)
            .unwrap();
        armature
    }

    fn cube_glb() -> Vec<u8> {
        let cube = cube();
        let influences = (0..cube.vertex_count())
            .map(|i| VertexInfluence {
                joints: [(i % 2) as u16, 0, 0, 0],
                weights: [1.0, 0.0, 0.0, 0.0],
            })
            .collect::<Vec<_>>();
        let baked = bake_skinned_mesh(&cube, &cube.vertex_normals(), &influences).unwrap();
        let armature = two_bone_armature();
        let material = PbrMaterialData::bean();

        build_glb(&ExportAsset {
            mesh: &baked,
            armature: &armature,
            material: &material,
            generator: "test",
        })
        .unwrap()
    }

    #[test]
    fn header_and_chunks_are_aligned() {
        let bytes = cube_glb();
        assert_eq!(&bytes[..4], b"glTF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize,
            bytes.len()
        );
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn document_contains_skinned_mesh() {
        let bytes = cube_glb();
        let gltf = gltf::Gltf::from_slice(&bytes).unwrap();

        assert_eq!(gltf.meshes().count(), 1);
        assert_eq!(gltf.skins().count(), 1);
        assert_eq!(gltf.materials().count(), 1);
        assert_eq!(gltf.animations().count(), 0);

        let skin = gltf.skins().next().unwrap();
        let joint_names = skin.joints().map(|j| j.name().unwrap().to_string()).collect::<Vec<_>>();
        assert_eq!(joint_names, ["root", "tip"]);

        let tip = skin.joints().nth(1).unwrap();
        assert_eq!(tip.transform().decomposed().0, [0.0, 1.0, 0.0]);

        let primitive = gltf.meshes().next().unwrap().primitives().next().unwrap();
        let blob = gltf.blob.as_deref();
        let reader = primitive.reader(|_| blob);
        assert_eq!(reader.read_positions().unwrap().count(), 8);
        assert_eq!(reader.read_indices().unwrap().into_u32().count(), 36);

        let joints = reader.read_joints(0).unwrap().into_u16().collect::<Vec<_>>();
        assert_eq!(joints[1], [1, 0, 0, 0]);

        let matrices = skin
            .reader(|_| blob)
            .read_inverse_bind_matrices()
            .unwrap()
            .collect::<Vec<_>>();
        assert_eq!(matrices[1][3], [0.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn export_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/models/cube.glb");

        let cube = cube();
        let influences = vec![VertexInfluence { joints: [0; 4], weights: [1.0, 0.0, 0.0, 0.0] }; 8];
        let baked = bake_skinned_mesh(&cube, &cube.vertex_normals(), &influences).unwrap();
        let armature = two_bone_armature();
        let material = PbrMaterialData::bean();

        let written = export_glb(
            &path,
            &ExportAsset {
                mesh: &baked,
                armature: &armature,
                material: &material,
                generator: "test",
            },
        )
        .unwrap();

        assert!(written > 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, written);
    }
}
