//! Cuts the branch ends of a vessel surface.
//!
//! usage: cap_branch <case.json> <out_prefix> [surface.off] [-v]
//!
//! Without a surface file a tube is swept around the case centerlines using
//! the radius field. Writes `<out_prefix>_branch<id>.off` per branch, the
//! clip boxes as `<out_prefix>_branch<id>_box<k>.off` and the drawn scene as
//! `<out_prefix>_scene.json`.

use std::io::Write;

use log::{LevelFilter, Metadata, Record};
use vesselcap::{visual, CaseFile, Capper, SceneRecorder, TriMesh};

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    }
}

const RING_VERTICES: usize = 24;

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with('-')).collect();
    if positional.len() < 2 {
        return Err("usage: cap_branch <case.json> <out_prefix> [surface.off] [-v]".into());
    }
    let case = CaseFile::load(positional[0])?;
    let prefix = positional[1];
    let surface = match positional.get(2) {
        Some(path) => TriMesh::load_off_cleaned(path, case.config.relative_tolerance)?,
        None => vesselcap::tube::tube_around(&case.centerlines, &case.radius, RING_VERTICES, true)?,
    };
    log::info!(
        "surface: {} vertices, {} triangles, area {}",
        surface.num_vtx(),
        surface.num_tri(),
        surface.area()
    );

    let marker_radius = case.radius.iter().copied().fold(0.0, f64::max) * 0.25;
    let mut capper = Capper::new(&case.centerlines, &case.radius, case.config)
        .with_sink(SceneRecorder::default(), marker_radius);
    let mut num_failed = 0;
    for branch in &case.branches {
        branch.show(capper.sink_mut(), [0.0, 0.8, 0.0], 2.0, marker_radius);
        for k in 0..branch.num_ends() {
            if let Ok(frame) = capper.frame(branch, k) {
                let path = format!("{}_branch{}_box{}.off", prefix, branch.id, k);
                visual::box_mesh(&frame.clip_box).save_off(&path)?;
            }
        }
        match capper.cap(branch.clone(), surface.clone()) {
            Ok(open) => {
                let path = format!("{}_branch{}.off", prefix, branch.id);
                open.save_off(&path)?;
                log::info!("wrote {}", path);
            }
            Err(e) => {
                log::error!("{}", e);
                num_failed += 1;
            }
        }
    }

    let scene = capper.into_sink();
    let mut file = std::fs::File::create(format!("{}_scene.json", prefix))?;
    file.write_all(scene.to_json()?.as_bytes())?;

    if num_failed > 0 {
        return Err(format!("{} of {} branches failed", num_failed, case.branches.len()).into());
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    init_logger(args.iter().any(|a| a == "-v"));
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
