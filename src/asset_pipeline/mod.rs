pub mod glb_export;
pub mod materials;
pub mod mesh_baker;
