//! Command-line shell around the `ntf_toolkit` library: `import` turns an
//! `.ntf` file into a text interchange pair (plus an optional skeleton
//! sidecar), `export` does the reverse. All the real logic lives in the
//! library; this binary is just argument plumbing and file I/O, in the
//! teacher's style of keeping `main`/CLI bins thin wrappers around the
//! library crate.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ntf_toolkit::formats::ntf::{SkeletonRecord, SkeletonStore, Tree, TreeCodec};
use ntf_toolkit::formats::ntf::{extract_mesh_groups, inject_mesh_groups};
use ntf_toolkit::formats::objbridge;

#[derive(Parser)]
#[command(name = "ntftool", about = "Inspect and convert NTF model files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decompose an .ntf file into a text mesh, material file, and
    /// (optionally) a skeleton sidecar that preserves everything the
    /// text format can't carry.
    Import {
        #[arg(long)]
        ntf: PathBuf,
        #[arg(long)]
        obj: PathBuf,
        #[arg(long)]
        mtl: PathBuf,
        #[arg(long)]
        skeleton: Option<PathBuf>,
    },
    /// Recombine a text mesh, material file, and skeleton sidecar back
    /// into an .ntf file.
    Export {
        #[arg(long)]
        obj: PathBuf,
        #[arg(long)]
        mtl: PathBuf,
        #[arg(long)]
        skeleton: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Import { ntf, obj, mtl, skeleton } => cmd_import(&ntf, &obj, &mtl, skeleton.as_deref()),
        Command::Export { obj, mtl, skeleton, out } => cmd_export(&obj, &mtl, &skeleton, &out),
    }
}

fn cmd_import(ntf_path: &std::path::Path, obj_path: &std::path::Path, mtl_path: &std::path::Path, skeleton_path: Option<&std::path::Path>) -> Result<()> {
    let bytes = fs::read(ntf_path).with_context(|| format!("reading {}", ntf_path.display()))?;
    let tree = TreeCodec::parse(&bytes).with_context(|| format!("parsing {}", ntf_path.display()))?;

    let groups = extract_mesh_groups(&tree).context("extracting mesh groups")?;
    eprintln!("extracted {} mesh group(s)", groups.len());

    let mtllib_name = mtl_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| mtl_path.display().to_string());
    fs::write(obj_path, objbridge::write_mesh(&groups, &mtllib_name))
        .with_context(|| format!("writing {}", obj_path.display()))?;
    fs::write(mtl_path, objbridge::write_material_library(&groups))
        .with_context(|| format!("writing {}", mtl_path.display()))?;

    if let Some(skeleton_path) = skeleton_path {
        let record = SkeletonStore::emit_record(&tree);
        let json = serde_json::to_string_pretty(&record).context("serializing skeleton record")?;
        fs::write(skeleton_path, json).with_context(|| format!("writing {}", skeleton_path.display()))?;
        eprintln!("wrote skeleton covering {} mesh group(s)", record.mesh_group_count);
    }

    Ok(())
}

fn cmd_export(obj_path: &std::path::Path, mtl_path: &std::path::Path, skeleton_path: &std::path::Path, out_path: &std::path::Path) -> Result<()> {
    let mtl_text = fs::read_to_string(mtl_path).with_context(|| format!("reading {}", mtl_path.display()))?;
    let materials = objbridge::parse_material_library(&mtl_text);

    let obj_text = fs::read_to_string(obj_path).with_context(|| format!("reading {}", obj_path.display()))?;
    let groups = objbridge::parse_mesh(&obj_text, &materials)
        .with_context(|| format!("parsing {}", obj_path.display()))?;

    let skeleton_json = fs::read_to_string(skeleton_path)
        .with_context(|| format!("reading {}", skeleton_path.display()))?;
    let record: SkeletonRecord =
        serde_json::from_str(&skeleton_json).context("parsing skeleton record")?;

    let mut tree: Tree = SkeletonStore::restore_record(&record).context("restoring skeleton")?;
    inject_mesh_groups(&mut tree, &groups).context("injecting mesh groups")?;

    let bytes = TreeCodec::write(&tree);
    fs::write(out_path, bytes).with_context(|| format!("writing {}", out_path.display()))?;
    eprintln!("wrote {}", out_path.display());

    Ok(())
}
