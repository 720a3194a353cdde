use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};
use log::info;

const HELPER_DIR: &str = "wasm_helper";
const ASSETS_DIR: &str = "assets";
const WASM_TARGET: &str = "wasm32-unknown-unknown";

#[derive(Error, Debug, Display)]
pub enum BundleError {
    #[display("cannot prepare output directory {}: {source}", path.display())]
    Prepare { path: PathBuf, source: io::Error },

    #[display("cannot copy {}: {source}", path.display())]
    Copy { path: PathBuf, source: io::Error },

    #[display("assets destination {} already exists", path.display())]
    AssetsCollision { path: PathBuf },
}

/// Creates the output directory if needed and deletes everything inside it,
/// so stale files from a previous bundle can never leak into this one.
pub fn prepare_output(dir: &Path) -> Result<(), BundleError> {
    create_and_clear(dir).map_err(|source| BundleError::Prepare {
        path: dir.to_path_buf(),
        source,
    })
}

fn create_and_clear(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Assembles the bundle relative to the current directory: helper files
/// merged into the output root, assets under `game/assets`, and the compiled
/// wasm as `game/game.wasm`.
pub fn assemble(out_dir: &Path, lib_name: &str, profile: &str) -> Result<(), BundleError> {
    assemble_from(Path::new("."), out_dir, lib_name, profile)
}

fn assemble_from(
    root: &Path,
    out_dir: &Path,
    lib_name: &str,
    profile: &str,
) -> Result<(), BundleError> {
    let helper = root.join(HELPER_DIR);
    copy_tree(&helper, out_dir).map_err(|source| BundleError::Copy {
        path: helper.clone(),
        source,
    })?;

    // The helper tree must not ship its own game/assets; a collision here
    // means two different asset sources would get merged silently.
    let assets = root.join(ASSETS_DIR);
    let assets_dest = out_dir.join("game/assets");
    if assets_dest.exists() {
        return Err(BundleError::AssetsCollision { path: assets_dest });
    }
    copy_tree(&assets, &assets_dest).map_err(|source| BundleError::Copy {
        path: assets.clone(),
        source,
    })?;

    let artifact = root.join(artifact_path(lib_name, profile));
    fs::copy(&artifact, out_dir.join("game/game.wasm")).map_err(|source| BundleError::Copy {
        path: artifact.clone(),
        source,
    })?;

    info!("Bundle assembled in {}", out_dir.display());
    Ok(())
}

/// Cargo writes the "dev" profile into target/debug; every other profile
/// gets a directory named after itself.
fn profile_dir(profile: &str) -> &str {
    if profile == "dev" {
        "debug"
    } else {
        profile
    }
}

fn artifact_path(lib_name: &str, profile: &str) -> PathBuf {
    Path::new("target")
        .join(WASM_TARGET)
        .join(profile_dir(profile))
        .join(format!("{lib_name}.wasm"))
}

// Recursive copy with merge semantics: directories are created as needed and
// same-named destination files are overwritten.
fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
