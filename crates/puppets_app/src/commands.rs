// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations.

use crate::settings::PuppetSettings;
use anyhow::{Context, Result};
use puppets_poser::{ActionPlayer, Poser, RelaxationWorld, SpriteSheet};
use puppets_rig::{DocumentRigSource, LayerNode, Lookup, OraArchive, OraRigSource, Rig};
use puppets_sequencer::{Action, ActionLibrary};
use std::path::{Path, PathBuf};

/// Open a rig from a layered archive (`.ora`) or a rig document
pub fn open_rig(path: &Path) -> Result<Rig> {
    let is_ora = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ora"));

    if is_ora {
        let source = OraRigSource::open(path)
            .with_context(|| format!("Failed to open layered rig {}", path.display()))?;
        Ok(Rig::new(source))
    } else {
        let source = DocumentRigSource::open(path)
            .with_context(|| format!("Failed to open rig document {}", path.display()))?;
        Ok(Rig::new(source))
    }
}

/// Print the layer tree of an archive
pub fn layers(path: &Path) -> Result<()> {
    let archive = OraArchive::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let (width, height) = archive.size();
    println!("{} ({}x{})", path.display(), width, height);

    archive.root().visit(0, &mut |depth, node| {
        let indent = "  ".repeat(depth);
        let p = node.position();
        match node {
            LayerNode::Group(group) => {
                let children = group.children.len();
                println!("{}{}/ @ ({}, {}) [{} children]", indent, group.name, p.x, p.y, children);
            }
            LayerNode::Layer(layer) => {
                println!("{}{} @ ({}, {}) <- {}", indent, layer.name, p.x, p.y, layer.src);
            }
        }
    });
    Ok(())
}

/// Resolve every part and joint of a rig, print a summary and optionally
/// write the rig document
pub fn rig(path: &Path, out: Option<&Path>) -> Result<()> {
    let mut rig = open_rig(path)?;
    let topology = rig.topology();
    println!("Rig {}", rig.name());

    let (mut found, mut derived, mut missing) = (0, 0, 0);
    for name in topology.part_names() {
        let status = match rig.get_part(name) {
            Lookup::Found(part) => {
                found += 1;
                format!("{:?}", part.bounds())
            }
            Lookup::Derived(part) => {
                derived += 1;
                format!("{:?} (derived from {})", part.bounds(), part.mother().unwrap_or("?"))
            }
            Lookup::Missing => {
                missing += 1;
                "missing".to_string()
            }
        };
        println!("  part  {:<14} {}", name, status);
    }
    for name in topology.joint_names().iter().chain(topology.marker_names()) {
        match rig.get_joint(name).get() {
            Some(joint) => {
                let p = joint.position();
                println!("  joint {:<14} ({}, {})", name, p.x, p.y);
            }
            None => println!("  joint {:<14} missing", name),
        }
    }
    println!("{} found, {} derived, {} missing", found, derived, missing);
    if let Some(bounds) = rig.bounds() {
        println!("Bounds {:?}", bounds);
    }

    if let Some(out) = out {
        rig.save_document(out)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}

/// List the actions of a library file
pub fn actions(path: &Path, settings: &PuppetSettings) -> Result<()> {
    let library = ActionLibrary::load(path, settings.playback.legacy_move_ms)
        .with_context(|| format!("Failed to read actions {}", path.display()))?;
    println!("{} actions in {}", library.action_count(), path.display());

    for action in library.actions() {
        println!(
            "{}: {} moves, {} poses, {} ms",
            action.name(),
            action.move_count(),
            action.pose_count(),
            action.total_duration()
        );
        for (index, m) in action.moves().iter().enumerate() {
            println!(
                "  {:>3} {:>6} ms  {:<16} {} ms",
                index,
                action.move_start_time(index),
                m.pose_name,
                m.duration_ms
            );
        }
    }
    Ok(())
}

/// Play an action through the poser one frame delay at a time, report each
/// move as it starts and print the pose the rig ends in
pub fn play(rig: &Path, actions: &Path, name: &str, settings: &PuppetSettings) -> Result<()> {
    let mut rig = open_rig(rig)?;
    let library = ActionLibrary::load(actions, settings.playback.legacy_move_ms)
        .with_context(|| format!("Failed to read actions {}", actions.display()))?;
    let action = library.require(name)?;

    let world = RelaxationWorld::new(settings.relaxation());
    let mut poser = Poser::bind(&mut rig, world, settings.poser());
    let mut player = ActionPlayer::new(settings.playback_controller());
    let step = f64::from(settings.playback.frame_delay_ms.max(1));
    let end = action.total_duration() as f64;

    // One pass, even when the clock loops
    player.play();
    let mut elapsed = 0.0;
    let mut current = None;
    while player.is_playing() && elapsed < end {
        let index = player.update(step, action, &mut poser);
        elapsed += step;
        if index != current {
            if let Some(m) = index.and_then(|i| action.move_at(i)) {
                println!("{:>8.1} ms  {}", player.playback.time, m.pose_name);
            }
            current = index;
        }
    }
    player.stop(&mut poser);

    println!("{}", poser.get_pose_named(action.name())?.to_pretty_string());
    Ok(())
}

/// Copy of `action` with every pose moved from one rig's proportions to
/// another's
fn retarget_action(action: &Action, from: &mut Rig, to: &mut Rig) -> Result<Action> {
    let topology = to.topology();
    let from_rest = from.rest_pose(1.0)?;
    let to_rest = to.rest_pose(1.0)?;

    let mut retargeted = action.clone();
    for pose in action.poses() {
        retargeted.replace_pose(pose.retarget(&from_rest, &to_rest, topology));
    }
    Ok(retargeted)
}

/// Options for [`bake`]
#[derive(Debug, Clone)]
pub struct BakeOptions {
    /// Rig to pose
    pub rig: PathBuf,
    /// Action library
    pub actions: PathBuf,
    /// Action to bake
    pub name: String,
    /// Rig the action was authored on, if different
    pub reference: Option<PathBuf>,
    /// Output image
    pub out: Option<PathBuf>,
}

/// Bake an action into a sprite sheet
pub fn bake(options: &BakeOptions, settings: &PuppetSettings) -> Result<()> {
    let mut rig = open_rig(&options.rig)?;
    let library = ActionLibrary::load(&options.actions, settings.playback.legacy_move_ms)
        .with_context(|| format!("Failed to read actions {}", options.actions.display()))?;
    let mut action = library.require(&options.name)?.clone();

    if let Some(reference) = &options.reference {
        let mut reference = open_rig(reference)?;
        action = retarget_action(&action, &mut reference, &mut rig)?;
    }

    let world = RelaxationWorld::new(settings.relaxation());
    let mut poser = Poser::bind(&mut rig, world, settings.poser());
    let frames = settings.frame_baker().bake(&action, &mut poser)?;
    let sheet = SpriteSheet::bake(&rig, &frames, &settings.bake)?;

    let out = options
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.png", action.name())));
    sheet
        .save(&out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Baked {} frames of {} ({}x{} each) to {}",
        sheet.frame_count,
        action.name(),
        sheet.frame_size.0,
        sheet.frame_size.1,
        out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use puppets_rig::{names, MemoryRigSource, RigDocument};

    #[test]
    fn test_open_rig_document() {
        let dir = std::env::temp_dir().join(format!("puppets-app-rig-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mannequin.ron");
        let doc: RigDocument = Rig::new(MemoryRigSource::mannequin()).to_document();
        doc.save(&path).unwrap();

        let mut rig = open_rig(&path).unwrap();
        assert_eq!(rig.name(), "Mannequin");
        assert!(rig.get_joint(names::ANCHOR_MARKER).get().is_some());
        assert!(open_rig(&dir.join("absent.ora")).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_play_and_bake_from_files() {
        let dir = std::env::temp_dir().join(format!("puppets-app-bake-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let rig_path = dir.join("mannequin.json");
        let actions_path = dir.join("actions.ron");

        let mut rig = Rig::new(MemoryRigSource::mannequin());
        rig.save_document(&rig_path).unwrap();
        let rest = rig.rest_pose(1.0).unwrap().renamed("Rest");
        let mut action = Action::new("Stand");
        action.add_move(&rest, 100);
        action.add_move(&rest, 100);
        let mut library = ActionLibrary::load(&actions_path, 500).unwrap();
        library.add_action(action);
        library.save().unwrap();

        let settings = PuppetSettings::default();
        play(&rig_path, &actions_path, "Stand", &settings).unwrap();
        assert!(play(&rig_path, &actions_path, "Jump", &settings).is_err());

        let out = dir.join("stand.png");
        let options = BakeOptions {
            rig: rig_path.clone(),
            actions: actions_path.clone(),
            name: "Stand".to_string(),
            reference: Some(rig_path),
            out: Some(out.clone()),
        };
        bake(&options, &settings).unwrap();
        let sheet = image::open(&out).unwrap().to_rgba8();
        assert_eq!(sheet.height(), settings.bake.frame_height);
        assert_eq!(sheet.width() % 8, 0);
        let opaque = sheet.pixels().filter(|p| p.0[3] > 0).count();
        assert!(opaque > 0, "sheet baked from a rig document is blank");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_retarget_action_scales_poses() {
        let mut small = Rig::new(MemoryRigSource::mannequin());
        let mut large = Rig::new(MemoryRigSource::mannequin());
        let rest = small.rest_pose(1.0).unwrap().renamed("Rest");
        let mut action = Action::new("Stand");
        action.add_move(&rest, 100);

        let same = retarget_action(&action, &mut small, &mut large).unwrap();
        assert_eq!(same.moves(), action.moves());
        assert!(same.pose("Rest").unwrap().approx_eq(&rest, 1e-9));
    }
}
