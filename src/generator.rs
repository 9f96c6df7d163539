use std::path::Path;

use glam::Vec3;

use crate::armature::Armature;
use crate::asset_pipeline::glb_export::{export_glb, ExportAsset};
use crate::asset_pipeline::materials::PbrMaterialData;
use crate::asset_pipeline::mesh_baker::bake_skinned_mesh;
use crate::bean::{create_armature, create_bean_mesh};
use crate::config::BeanConfig;
use crate::geometry::subdivide::subdivide;
use crate::geometry::Mesh;
use crate::scene_graph::scene::Scene;
use crate::skinning::{bind_automatic_weights, vertex_influences};

const STEPS: usize = 7;

pub struct GeneratedBean {
    pub mesh: Mesh,
    pub normals: Vec<Vec3>,
    pub armature: Armature,
    pub material: PbrMaterialData,
}

fn log_mesh_stats(mesh: &Mesh) {
    log::info!("Bean character mesh stats:");
    log::info!("  Vertices: {}", mesh.vertex_count());
    log::info!("  Faces:    {}", mesh.face_count());
    log::info!("  Edges:    {}", mesh.edge_count());
    if let Some(bounds) = mesh.bounds() {
        let size = bounds.size();
        log::info!("  Size:     {:.3} x {:.3} x {:.3}", size.x, size.y, size.z);
    }
    log::info!("  Volume:   {:.4}", mesh.signed_volume());
    log::info!("  Vertex groups: {}", mesh.vertex_groups.len());
    for name in mesh.vertex_groups.names() {
        log::info!(
            "    - {} ({} vertices)",
            name,
            mesh.vertex_groups.member_count(name)
        );
    }
}

/// Runs every step up to export: mesh, rig, weights, subdivision, shading
/// and material.
pub fn generate(config: &BeanConfig) -> anyhow::Result<GeneratedBean> {
    log::info!("[1/{STEPS}] Clearing scene...");
    let mut scene = Scene::new();

    log::info!("[2/{STEPS}] Creating bean mesh...");
    let body = create_bean_mesh(&mut scene, &config.proportions, &config.tessellation)?;
    let mut mesh = scene.take_mesh(body)?;

    log::info!("[3/{STEPS}] Mesh stats (pre-subdivision):");
    log_mesh_stats(&mesh);

    log::info!("[4/{STEPS}] Creating armature...");
    let armature = create_armature(&config.proportions)?;

    log::info!("[5/{STEPS}] Parenting mesh to armature (auto weights)...");
    bind_automatic_weights(&mut mesh, &armature, &config.skinning)?;

    log::info!("[6/{STEPS}] Adding subdivision and smooth shading...");
    let mesh = subdivide(&mesh, config.tessellation.subdivision_levels);
    let normals = mesh.vertex_normals();
    let material = PbrMaterialData::bean();

    Ok(GeneratedBean {
        mesh,
        normals,
        armature,
        material,
    })
}

/// Generates the character and writes it to `output`.
pub fn run(config: &BeanConfig, output: &Path) -> anyhow::Result<()> {
    let bean = generate(config)?;

    log::info!("[7/{STEPS}] Exporting GLB...");
    let influences = vertex_influences(&bean.mesh, &bean.armature)?;
    let baked = bake_skinned_mesh(&bean.mesh, &bean.normals, &influences)?;
    let written = export_glb(
        output,
        &ExportAsset {
            mesh: &baked,
            armature: &bean.armature,
            material: &bean.material,
            generator: &config.export.generator,
        },
    )?;

    log::info!("Exported bean character to: {}", output.display());
    log::info!(
        "  {} vertices, {} triangles, {} bytes",
        baked.vertices.len(),
        bean.mesh.triangle_count(),
        written
    );

    Ok(())
}
