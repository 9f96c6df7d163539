//! Bone hierarchies in rest pose.

use anyhow::{bail, Context};
use glam::{Mat4, Vec3};
use id_arena::{Arena, Id};

use crate::math::segment::Segment;

pub type BoneId = Id<Bone>;

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub head: Vec3,
    pub tail: Vec3,
    pub parent: Option<BoneId>,
    /// The head is attached to the parent's tail.
    pub connected: bool,
}

impl Bone {
    pub fn segment(&self) -> Segment {
        Segment::new(self.head, self.tail)
    }
}

pub struct Armature {
    pub name: String,
    bones: Arena<Bone>,
}

impl Armature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Arena::new(),
        }
    }

    /// Adds a bone. Connected bones start at their parent's tail, whatever
    /// `head` says.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        head: Vec3,
        tail: Vec3,
        parent: Option<BoneId>,
        connected: bool,
    ) -> anyhow::Result<BoneId> {
        let name = name.into();

        if self.bone_by_name(&name).is_some() {
            bail!("Duplicate bone name: {}", name);
        }

        let head = match (parent, connected) {
            (Some(parent), true) => {
                self.bones
                    .get(parent)
                    .with_context(|| format!("Unknown parent for bone {}", name))?
                    .tail
            }
            (None, true) => bail!("Bone {} is connected but has no parent", name),
            (Some(parent), false) => {
                self.bones
                    .get(parent)
                    .with_context(|| format!("Unknown parent for bone {}", name))?;
                head
            }
            (None, false) => head,
        };

        if head.distance_squared(tail) <= f32::EPSILON {
            bail!("Bone {} has zero length", name);
        }

        Ok(self.bones.alloc(Bone {
            name,
            head,
            tail,
            parent,
            connected,
        }))
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id]
    }

    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones.iter()
    }

    pub fn bone_by_name(&self, name: &str) -> Option<BoneId> {
        self.bones
            .iter()
            .find(|(_, bone)| bone.name == name)
            .map(|(id, _)| id)
    }

    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(id, _)| id)
    }

    pub fn children(&self, id: BoneId) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .filter(move |(_, bone)| bone.parent == Some(id))
            .map(|(id, _)| id)
    }

    pub fn descendants(&self, id: BoneId) -> Vec<BoneId> {
        let mut result = Vec::new();
        let mut stack = self.children(id).collect::<Vec<_>>();
        stack.reverse();

        while let Some(next) = stack.pop() {
            result.push(next);
            let mut children = self.children(next).collect::<Vec<_>>();
            children.reverse();
            stack.extend(children);
        }

        result
    }

    pub fn root(&self) -> anyhow::Result<BoneId> {
        let roots = self.roots().collect::<Vec<_>>();
        match roots.as_slice() {
            [root] => Ok(*root),
            [] => bail!("Armature {} has no root bone", self.name),
            _ => bail!(
                "Armature {} has {} root bones, expected one",
                self.name,
                roots.len()
            ),
        }
    }

    /// Bones in depth-first order from the root. This is the joint order of
    /// the exported skin.
    pub fn joint_order(&self) -> anyhow::Result<Vec<BoneId>> {
        let root = self.root()?;
        let mut order = vec![root];
        order.extend(self.descendants(root));
        Ok(order)
    }

    /// Checks for a single root, bones reachable from it and connected bones
    /// starting at their parent's tail.
    pub fn validate(&self) -> anyhow::Result<()> {
        let order = self.joint_order()?;
        if order.len() != self.len() {
            bail!(
                "Armature {}: only {} of {} bones are reachable from the root",
                self.name,
                order.len(),
                self.len()
            );
        }

        for (_, bone) in self.bones() {
            if let (Some(parent), true) = (bone.parent, bone.connected) {
                if self.bone(parent).tail.distance(bone.head) > 1e-5 {
                    bail!("Bone {} is connected but detached from its parent", bone.name);
                }
            }
        }

        Ok(())
    }

    /// Head position relative to the parent's head, i.e. the local
    /// translation of the bone's node.
    pub fn local_translation(&self, id: BoneId) -> Vec3 {
        let bone = self.bone(id);
        match bone.parent {
            Some(parent) => bone.head - self.bone(parent).head,
            None => bone.head,
        }
    }

    /// Rest-pose world transform of a bone's node.
    pub fn rest_world_matrix(&self, id: BoneId) -> Mat4 {
        Mat4::from_translation(self.bone(id).head)
    }

    pub fn inverse_bind_matrix(&self, id: BoneId) -> Mat4 {
        self.rest_world_matrix(id).inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Armature {
        let mut armature = Armature::new("Chain");
        let root = armature
            .add_bone("root", Vec3::ZERO, Vec3::Y, None, false)
            .unwrap();
        let mid = armature
            .add_bone("mid", Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), Some(root), true)
            .unwrap();
        armature
            .add_bone("side", Vec3::X, Vec3::new(2.0, 0.0, 0.0), Some(root), false)
            .unwrap();
        armature
            .add_bone("tip", Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0), Some(mid), true)
            .unwrap();
        armature
    }

    #[test]
    fn connected_bones_snap_to_parent_tail() {
        let armature = chain();
        let mid = armature.bone(armature.bone_by_name("mid").unwrap());
        assert_eq!(mid.head, Vec3::Y);
        assert!(armature.validate().is_ok());
    }

    #[test]
    fn joint_order_is_depth_first() {
        let armature = chain();
        let names = armature
            .joint_order()
            .unwrap()
            .into_iter()
            .map(|id| armature.bone(id).name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["root", "mid", "tip", "side"]);
    }

    #[test]
    fn local_translations_are_relative_to_parent_head() {
        let armature = chain();
        let tip = armature.bone_by_name("tip").unwrap();
        assert_eq!(armature.local_translation(tip), Vec3::Y);
        assert_eq!(
            armature.inverse_bind_matrix(tip).transform_point3(Vec3::new(0.0, 2.0, 0.0)),
            Vec3::ZERO
        );
    }

    #[test]
    fn rejects_malformed_bones() {
        let mut armature = chain();
        assert!(armature
            .add_bone("root", Vec3::ZERO, Vec3::X, None, false)
            .is_err());
        assert!(armature
            .add_bone("floating", Vec3::ZERO, Vec3::X, None, true)
            .is_err());
        assert!(armature
            .add_bone("flat", Vec3::X, Vec3::X, None, false)
            .is_err());
    }

    #[test]
    fn second_root_fails_validation() {
        let mut armature = chain();
        armature
            .add_bone("stray", Vec3::Z, Vec3::new(0.0, 0.0, 2.0), None, false)
            .unwrap();
        assert!(armature.root().is_err());
        assert!(armature.validate().is_err());
    }
}
