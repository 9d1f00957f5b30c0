// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing, persisting and playing actions end to end.

use approx::assert_abs_diff_eq;
use puppets_rig::{names, DVec2, MemoryRigSource, Pose, Rig, Topology};
use puppets_sequencer::{Action, ActionLibrary, PlaybackController, LEGACY_MOVE_MS};

fn poses() -> (Pose, Pose) {
    let mut rig = Rig::new(MemoryRigSource::mannequin());
    let rest = rig.rest_pose(1.0).unwrap().renamed("Rest");
    let reach = rest
        .with_point(names::R_HAND_END_MARKER, DVec2::new(-15.0, -70.0))
        .unwrap()
        .renamed("Reach");
    (rest, reach)
}

#[test]
fn edit_save_and_play() {
    let (rest, reach) = poses();
    let mut action = Action::new("Reach");
    action.add_move(&rest, 200);
    action.add_move(&reach, 300);
    action.add_move(&rest, 100);

    // Copy the reach and paste it at the end
    let clip = action.copy_move(1).unwrap();
    action.paste_move(3, &clip);
    assert_eq!(action.move_count(), 4);
    assert_eq!(action.pose_count(), 2);
    assert_eq!(action.total_duration(), 900);

    let dir = std::env::temp_dir().join(format!("puppets-timeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("library.ron");

    let mut library = ActionLibrary::load(&path, LEGACY_MOVE_MS).unwrap();
    library.add_action(action.clone());
    library.save().unwrap();
    let reloaded = ActionLibrary::load(&path, LEGACY_MOVE_MS).unwrap();
    let loaded = reloaded.require("Reach").unwrap();
    assert_eq!(loaded.moves(), action.moves());

    // Step through at 25 ms like a frame clock
    let topology = Topology::human();
    let mut playback = PlaybackController::new();
    playback.play();
    let mut last_index = 0;
    while playback.is_playing() {
        playback.update(25.0, loaded);
        let index = playback.current_move(loaded).unwrap();
        assert!(index >= last_index);
        last_index = index;
    }
    assert_eq!(last_index, 3);
    let end = playback.current_pose(loaded, topology).unwrap();
    assert!(end.approx_eq(&reach, 0.006));

    // Halfway through the first move the hand is partway along its arc
    playback.seek(100.0);
    let mid = playback.current_pose(loaded, topology).unwrap();
    let hand = mid.point(names::R_HAND_END_MARKER).unwrap();
    let wrist = mid.point(names::R_HAND_JOINT).unwrap();
    assert_abs_diff_eq!(
        hand.distance(wrist),
        rest.distance(names::R_HAND_JOINT, names::R_HAND_END_MARKER).unwrap(),
        epsilon = 1e-6
    );
    assert!(hand.y > -100.0 && hand.y < -70.0);
    assert!(hand.x > -45.0 && hand.x < -15.0);

    std::fs::remove_dir_all(&dir).ok();
}
