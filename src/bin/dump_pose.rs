//! Pose dumper binary — samples a rig's animation and writes joint
//! positions per frame as JSON, for inspecting clips without a renderer.
//!
//! Usage: cargo run --release --bin dump_pose -- --model <FILE> [OPTIONS]
//!
//! Options:
//!   --model <FILE>        glTF/GLB rig to load (required)
//!   --clip <INDEX>        Play a single clip (default: 0)
//!   --blend <A,B,ALPHA>   Blend two clips instead of playing one
//!   --swing <JOINT,DEG>   Bake a swing clip for a joint instead of loading one
//!   --seconds <S>         Length of the dump (default: one clip cycle)
//!   --fps <N>             Samples per second (default: 30)
//!   --out <FILE>          Write JSON to a file instead of stdout

use std::process::ExitCode;

use glam::Vec3;
use log::error;
use serde::Serialize;

use foxrig::animation::{Playback, Skeleton, swing_clip};
use foxrig::assets::load_skeleton;

#[derive(Serialize)]
struct PoseDump {
    model: String,
    joint_names: Vec<String>,
    clip_names: Vec<String>,
    playback: String,
    fps: u32,
    frames: Vec<Frame>,
}

#[derive(Serialize)]
struct Frame {
    time: f32,
    /// Model-space joint origins, parallel to `joint_names`.
    positions: Vec<[f32; 3]>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(model) = parse_str_arg(&args, "--model") else {
        eprintln!("Usage: dump_pose --model <FILE> [--clip N | --blend A,B,ALPHA | --swing JOINT,DEG] [--seconds S] [--fps N] [--out FILE]");
        return ExitCode::FAILURE;
    };
    let fps = parse_u32_arg(&args, "--fps").unwrap_or(30).max(1);
    let out = parse_str_arg(&args, "--out");

    let mut skeleton = match load_skeleton(&model) {
        Ok(skeleton) => skeleton,
        Err(err) => {
            error!("failed to load {model}: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = configure_playback(&mut skeleton, &args) {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    let cycle = playback_cycle_seconds(&skeleton);
    let seconds = parse_f32_arg(&args, "--seconds").unwrap_or(cycle).max(0.0);
    let frame_count = (seconds * fps as f32).ceil() as usize + 1;
    let dt = 1.0 / fps as f32;

    let mut frames = Vec::with_capacity(frame_count);
    skeleton.update(0.0);
    for frame_index in 0..frame_count {
        frames.push(Frame {
            time: frame_index as f32 * dt,
            positions: skeleton
                .joints()
                .iter()
                .map(|joint| joint.final_transform.transform_point3(Vec3::ZERO).to_array())
                .collect(),
        });
        skeleton.update(dt);
    }

    let dump = PoseDump {
        model,
        joint_names: skeleton.joints().iter().map(|j| j.name.clone()).collect(),
        clip_names: (0..skeleton.animation_count())
            .filter_map(|i| skeleton.animation(i).map(|c| c.name.clone()))
            .collect(),
        playback: format!("{:?}", skeleton.playback()),
        fps,
        frames,
    };

    let json = match serde_json::to_string_pretty(&dump) {
        Ok(json) => json,
        Err(err) => {
            error!("failed to serialize dump: {err}");
            return ExitCode::FAILURE;
        }
    };

    match out {
        Some(path) => {
            if let Err(err) = std::fs::write(&path, json) {
                error!("failed to write {path}: {err}");
                return ExitCode::FAILURE;
            }
            println!("Wrote {} frames to {}", dump.frames.len(), path);
        }
        None => println!("{json}"),
    }

    ExitCode::SUCCESS
}

fn configure_playback(skeleton: &mut Skeleton, args: &[String]) -> Result<(), String> {
    if let Some(spec) = parse_str_arg(args, "--swing") {
        let (joint, degrees) = parse_pair::<usize, f32>(&spec)
            .ok_or_else(|| format!("invalid --swing '{spec}', expected JOINT,DEG"))?;
        let clip = swing_clip(skeleton, joint, Vec3::Z, degrees.to_radians(), 2.0)
            .map_err(|err| format!("failed to bake swing clip: {err}"))?;
        let index = skeleton.add_animation(clip);
        return skeleton.play_animation(index).map_err(|err| err.to_string());
    }

    if let Some(spec) = parse_str_arg(args, "--blend") {
        let mut parts = spec.split(',');
        let parsed = (|| {
            let a = parts.next()?.trim().parse::<usize>().ok()?;
            let b = parts.next()?.trim().parse::<usize>().ok()?;
            let alpha = parts.next()?.trim().parse::<f32>().ok()?;
            Some((a, b, alpha))
        })();
        let (a, b, alpha) =
            parsed.ok_or_else(|| format!("invalid --blend '{spec}', expected A,B,ALPHA"))?;
        return skeleton.set_blend(a, b, alpha).map_err(|err| err.to_string());
    }

    if skeleton.animation_count() == 0 {
        // No clips and no swing requested: dump the bind pose.
        return Ok(());
    }
    let clip = parse_usize_arg(args, "--clip").unwrap_or(0);
    skeleton.play_animation(clip).map_err(|err| err.to_string())
}

fn playback_cycle_seconds(skeleton: &Skeleton) -> f32 {
    match skeleton.playback() {
        Playback::Bind => 1.0,
        Playback::Clip { index, .. } => skeleton
            .animation(index)
            .map(|clip| clip.duration())
            .filter(|d| *d > 0.0)
            .unwrap_or(1.0),
        Playback::Blend { a, b, alpha, .. } => {
            let da = skeleton.animation(a).map(|c| c.duration()).unwrap_or(0.0);
            let db = skeleton.animation(b).map(|c| c.duration()).unwrap_or(0.0);
            let blended = da + (db - da) * alpha;
            if blended > 0.0 { blended } else { 1.0 }
        }
    }
}

fn parse_pair<A: std::str::FromStr, B: std::str::FromStr>(spec: &str) -> Option<(A, B)> {
    let (a, b) = spec.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.clone())
}
