use crate::host::SceneHost;
use crate::models::{Armature, ObjectId};

/// Whether every bone of the armature points along a single axis.
///
/// A bone qualifies when at least two of its three axes have identical head and
/// tail coordinates. Armatures with diagonal bones were built deliberately and must
/// not be touched.
pub fn is_axis_aligned(armature: &Armature) -> bool {
    armature.bones.iter().all(|bone| bone.equal_axis_count() >= 2)
}

/// Normalize bone orientations of one armature, all or nothing.
///
/// Returns `true` when the host's geometry fix was applied.
pub fn normalize<S: SceneHost + ?Sized>(scene: &mut S, id: ObjectId) -> bool {
    let Some(armature) = scene.armature(id) else {
        tracing::warn!("Armature {:?} disappeared before bone normalization", id);
        return false;
    };

    if !is_axis_aligned(&armature) {
        tracing::info!(
            "Skipping bone normalization for {}: it has diagonal bones",
            armature.name
        );
        return false;
    }

    tracing::debug!("Normalizing bone orientations of {}", armature.name);
    scene.normalize_bone_orientation(id);
    true
}
