//! rtbvh - build, validate and export a BVH for the GPU ray tracer.
//!
//! Run with:
//!   cargo run --release --bin rtbvh -- model.obj --out bvh_out
//!   cargo run --release --bin rtbvh -- --grid 32 --options opts.json

mod input;
mod output;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use rtbvh::{validate, BuildOptions, Bvh, TriangleSoup};
use rtbvh_math::{Ray, Vec3};

/// Rays cast per axis when sampling traversal cost
const SAMPLE_RAYS: usize = 16;

enum Source {
    Obj(PathBuf),
    Grid(usize),
}

struct Args {
    source: Source,
    options: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn usage() -> &'static str {
    "Usage: rtbvh <input.obj | --grid N> [--options opts.json] [--out DIR]"
}

fn parse_args() -> Result<Args> {
    let mut source = None;
    let mut options = None;
    let mut out = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--grid" => {
                let n = args.next().context("--grid needs a size")?;
                let n: usize = n.parse().with_context(|| format!("Invalid grid size '{n}'"))?;
                source = Some(Source::Grid(n));
            }
            "--options" => {
                options = Some(PathBuf::from(args.next().context("--options needs a path")?));
            }
            "--out" => {
                out = Some(PathBuf::from(args.next().context("--out needs a directory")?));
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("Unknown flag '{other}'\n{}", usage()),
            path => source = Some(Source::Obj(PathBuf::from(path))),
        }
    }

    let Some(source) = source else {
        bail!("No input given\n{}", usage());
    };

    Ok(Args {
        source,
        options,
        out,
    })
}

fn load_options(path: Option<&PathBuf>) -> Result<BuildOptions> {
    let Some(path) = path else {
        return Ok(BuildOptions::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file {}", path.display()))?;
    let options: BuildOptions = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse options file {}", path.display()))?;
    options.validate()?;
    Ok(options)
}

/// Cast a grid of rays along each axis through the root box and log how many
/// boxes and candidate triangles the traversal touches on average.
fn sample_traversal(bvh: &Bvh<'_>) {
    let root = bvh.boxes()[0];
    let extent = root.extent();
    let mut box_tests = 0;
    let mut candidates = 0;
    let mut rays = 0;

    for axis in 0..3 {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;

        for i in 0..SAMPLE_RAYS {
            for j in 0..SAMPLE_RAYS {
                let mut origin = root.min;
                origin[axis] -= 1.0;
                origin[u] += extent[u] * (i as f32 + 0.5) / SAMPLE_RAYS as f32;
                origin[v] += extent[v] * (j as f32 + 0.5) / SAMPLE_RAYS as f32;

                let mut direction = Vec3::ZERO;
                direction[axis] = 1.0;

                let ray = Ray::new(origin, direction);
                box_tests += bvh.traverse(&ray, f32::INFINITY, |_| candidates += 1);
                rays += 1;
            }
        }
    }

    log::info!(
        "Traversal sample: {} rays, {:.1} box tests and {:.1} candidate triangles per ray",
        rays,
        box_tests as f32 / rays as f32,
        candidates as f32 / rays as f32
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = parse_args()?;
    let options = load_options(args.options.as_ref())?;

    let start = Instant::now();
    let vertices = match &args.source {
        Source::Obj(path) => input::load_obj_soup(path)?,
        Source::Grid(n) => input::grid_soup(*n),
    };
    log::info!("Loaded {} triangles in {:?}", vertices.len() / 3, start.elapsed());

    let soup = TriangleSoup::new(&vertices)?;
    let bvh = Bvh::build(soup, &options)?;

    validate(&bvh).context("BVH failed structural validation")?;
    log::info!("Structure valid");

    let stats = bvh.stats();
    log::info!(
        "{} nodes, {} leaves, depth {}, mean leaf size {:.2}, {} oversized leaves, SAH cost {:.2}",
        stats.node_count,
        stats.leaf_count,
        stats.max_depth,
        stats.mean_leaf_size,
        stats.oversized_leaves,
        stats.sah_cost
    );

    sample_traversal(&bvh);

    if let Some(dir) = &args.out {
        output::write_arrays(&bvh, &stats, dir)?;
    }

    Ok(())
}
