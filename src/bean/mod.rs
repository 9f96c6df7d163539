//! The bean character: body mesh assembly and its ragdoll rig.

pub mod body;
pub mod rig;

pub use body::create_bean_mesh;
pub use rig::create_armature;
