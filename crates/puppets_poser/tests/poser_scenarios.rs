// SPDX-License-Identifier: MIT OR Apache-2.0
//! The poser driving the relaxation world: apply, hold, drag and bake.

use puppets_poser::{
    FrameBaker, Poser, PoserSettings, RelaxationWorld, SpriteSheet,
    SpriteSheetSettings,
};
use puppets_rig::{names, DVec2, MemoryRigSource, Pose, Rig, Topology};
use puppets_sequencer::Action;

/// Rotate every key after `root` in its chain about `root` (pose space, y up)
fn rotate_chain(pose: &Pose, root: &str, angle: f64) -> Pose {
    let pivot = pose.point(root).unwrap();
    let mut out = pose.clone();
    for key in Topology::human().chain_from(root).into_iter().skip(1) {
        let p = pose.point(key).unwrap() - pivot;
        out = out.with_point(key, pivot + DVec2::from_angle(angle).rotate(p)).unwrap();
    }
    out
}

fn settings() -> PoserSettings {
    PoserSettings {
        settle_steps: 60,
        ..Default::default()
    }
}

#[test]
fn rest_pose_holds() {
    let mut rig = Rig::new(MemoryRigSource::mannequin());
    let rest = rig.rest_pose(1.0).unwrap();
    let mut poser = Poser::bind(&mut rig, RelaxationWorld::default(), settings());

    assert!(poser.set_pose(&rest));
    assert!(poser.get_pose().unwrap().approx_eq(&rest, 1e-6));
    assert_eq!(poser.world().constraint_count(), rig.topology().joint_names().len());
}

#[test]
fn raised_arm_settles_into_place() {
    let mut rig = Rig::new(MemoryRigSource::mannequin());
    let rest = rig.rest_pose(1.0).unwrap();
    let raised = rotate_chain(&rest, names::R_ARM_JOINT, -1.0);
    let mut poser = Poser::bind(&mut rig, RelaxationWorld::default(), settings());

    assert!(poser.set_pose(&raised));
    let sampled = poser.get_pose().unwrap();
    assert!(sampled.approx_eq(&raised, 1.0), "{}", sampled.to_pretty_string());

    // Released: nothing moves on later ticks
    for _ in 0..10 {
        poser.tick();
    }
    assert!(poser.get_pose().unwrap().approx_eq(&sampled, 0.05));
}

/// Drag the upper arm sideways and report how far the elbow and wrist moved
fn drag_upper_arm(freeze: bool) -> (f64, f64) {
    let mut rig = Rig::new(MemoryRigSource::mannequin());
    let mut poser = Poser::bind(&mut rig, RelaxationWorld::default(), settings());
    let elbow = poser.world_point(names::R_ARM_MID_JOINT).unwrap();
    let wrist = poser.world_point(names::R_HAND_JOINT).unwrap();

    poser.set_freeze_outer_joints(freeze);
    assert!(poser.begin_drag(names::R_ARM_TOP, DVec2::new(55.0, 82.5)));
    assert!(poser.drag_to(DVec2::new(35.0, 82.5)));
    for _ in 0..20 {
        poser.tick();
    }
    assert!(poser.end_drag());
    assert_eq!(poser.world().constraint_count(), rig.topology().joint_names().len());

    (
        poser.world_point(names::R_ARM_MID_JOINT).unwrap().distance(elbow),
        poser.world_point(names::R_HAND_JOINT).unwrap().distance(wrist),
    )
}

#[test]
fn drag_swings_free_limb() {
    let (elbow, _) = drag_upper_arm(false);
    assert!(elbow > 5.0, "elbow moved {elbow}");
}

#[test]
fn frozen_outer_joints_hold_during_drag() {
    let (elbow, wrist) = drag_upper_arm(true);
    assert!(elbow < 1.0, "elbow moved {elbow}");
    assert!(wrist < 1.0, "wrist moved {wrist}");
}

#[test]
fn bake_action_to_sheet() {
    let mut rig = Rig::new(MemoryRigSource::mannequin());
    let rest = rig.rest_pose(1.0).unwrap().renamed("Rest");
    let wave = rotate_chain(&rest, names::L_ARM_JOINT, 0.8).renamed("Wave");
    let mut action = Action::new("Wave");
    action.add_move(&rest, 100);
    action.add_move(&wave, 100);

    let mut poser = Poser::bind(&mut rig, RelaxationWorld::default(), settings());
    let frames = FrameBaker::default().bake(&action, &mut poser).unwrap();
    assert_eq!(frames.len(), 8);

    // Frames progress toward the raised arm
    let start = frames[0].pose.point(names::L_HAND_END_MARKER).unwrap();
    let later = frames[6].pose.point(names::L_HAND_END_MARKER).unwrap();
    assert!(later.distance(start) > 10.0);

    let sheet = SpriteSheet::bake(&rig, &frames, &SpriteSheetSettings::default()).unwrap();
    assert_eq!(sheet.frame_size.1, 200);
    assert_eq!(sheet.image.height(), 200);
    assert_eq!(sheet.image.width(), sheet.frame_size.0 * 8);
}
