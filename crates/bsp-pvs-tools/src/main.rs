//! `bsppvs`: runs one stage of the level compiler over text files.
//!
//! ```bash
//! bsppvs bsp --mode render --input level.polys --output level.tree --polygons-out level.bsppolys
//! bsppvs portals --input level.tree --output level.portals
//! bsppvs vis --input level.portals --output level.vis
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) for progress output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use bsp_pvs::bsp::BspCompiler;
use bsp_pvs::config::{DEFAULT_PORTAL_EXTENT, DEFAULT_SPLIT_WEIGHT};
use bsp_pvs::format::{self, TextRecord};
use bsp_pvs::portal::PortalGenerator;
use bsp_pvs::vis::VisCalculator;
use bsp_pvs::{CompileConfig, Polygon, PortalConfig, Real, TexturedVertex, Vertex, VisConfig};
use nalgebra::Point3;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    #[command(subcommand)]
    stage: Stage,
}

#[derive(Subcommand, Debug)]
enum Stage {
    /// Compile polygons into a BSP tree and the split polygon list.
    Bsp {
        /// Which vertex and payload layout the input uses.
        #[arg(long, value_enum)]
        mode: Mode,

        /// `Polygons` block to compile
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Where to write the `Tree` block
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Where to write the polygons the tree's leaves index
        #[arg(long, value_name = "FILE")]
        polygons_out: PathBuf,

        /// Optional `Polygons` block of hint polygons (`( x y z )`, `[ ]`)
        #[arg(long, value_name = "FILE")]
        hints: Option<PathBuf>,

        /// Cost of one split against one unit of front/back imbalance
        #[arg(long, default_value_t = DEFAULT_SPLIT_WEIGHT)]
        weight: Real,
    },

    /// Generate the portals between the empty leaves of a tree.
    Portals {
        /// `Tree` block
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Where to write the `Portals` block
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Half-size of the initial portal square; must exceed the level bounds
        #[arg(long, default_value_t = DEFAULT_PORTAL_EXTENT)]
        extent: Real,
    },

    /// Compute leaf-to-leaf visibility from a portal list.
    Vis {
        /// `Portals` block
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Where to write the `Vis` block
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Compute one portal row at a time instead of on the thread pool
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// `( x y z u v )` vertices with a `[ material ]` payload
    Render,
    /// `( x y z )` vertices with a `[ flags ]` payload
    Collision,
}

fn main() {
    env_logger::init();
    let opts = Opts::parse();

    if let Err(err) = run(opts.stage) {
        println!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(stage: Stage) -> anyhow::Result<()> {
    match stage {
        Stage::Bsp {
            mode,
            input,
            output,
            polygons_out,
            hints,
            weight,
        } => {
            let text = read(&input)?;
            let hints: Vec<Polygon> = match hints {
                Some(path) => format::read_polygons(&read(&path)?)
                    .with_context(|| format!("reading hints from {}", path.display()))?,
                None => Vec::new(),
            };
            let config = CompileConfig::default().with_split_weight(weight);
            let files = Outputs {
                tree: &output,
                polygons: &polygons_out,
            };
            match mode {
                Mode::Render => compile::<TexturedVertex, u32>(&text, &input, hints, &config, files),
                Mode::Collision => compile::<Point3<Real>, u32>(&text, &input, hints, &config, files),
            }
        }

        Stage::Portals {
            input,
            output,
            extent,
        } => {
            let tree = format::read_tree(&read(&input)?)
                .with_context(|| format!("loading tree {}", input.display()))?;
            let portals = PortalGenerator::new(PortalConfig::default().with_extent(extent)).generate(&tree);
            write(&output, |out| {
                format::write_portals(out, tree.empty_leaf_count(), &portals)
            })
        }

        Stage::Vis {
            input,
            output,
            sequential,
        } => {
            let (leaf_count, portals) = format::read_portals(&read(&input)?)
                .with_context(|| format!("loading portals {}", input.display()))?;
            let config = if sequential {
                VisConfig::sequential()
            } else {
                VisConfig::default()
            };
            let table = VisCalculator::new(config)
                .calculate(leaf_count, &portals)
                .context("calculating visibility")?;
            write(&output, |out| format::write_vis(out, &table))
        }
    }
}

struct Outputs<'a> {
    tree: &'a Path,
    polygons: &'a Path,
}

fn compile<V, A>(
    text: &str,
    input: &Path,
    hints: Vec<Polygon>,
    config: &CompileConfig,
    files: Outputs<'_>,
) -> anyhow::Result<()>
where
    V: TextRecord + Vertex,
    A: TextRecord + Clone,
{
    let polygons: Vec<Polygon<V, A>> = format::read_polygons(text)
        .with_context(|| format!("reading polygons from {}", input.display()))?;
    let compiled = BspCompiler::new(config)
        .compile(polygons, hints)
        .context("compiling BSP tree")?;

    write(files.tree, |out| format::write_tree(out, &compiled.tree))?;
    write(files.polygons, |out| format::write_polygons(out, &compiled.polygons))?;
    info!(
        "wrote {} and {}",
        files.tree.display(),
        files.polygons.display()
    );
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<File>) -> bsp_pvs::Result<()>,
) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    body(&mut out).with_context(|| format!("writing {}", path.display()))?;
    out.flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
