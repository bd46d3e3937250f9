//! From-source builds: download, unpack, configure, compile, install.
//!
//! Used for the pinned interpreter. The build happens in a scratch
//! directory under the system temp dir; the archive root is unpacked,
//! configured with the component's prefix, compiled with all available
//! parallelism, and installed with `make altinstall` so the system
//! `python3` symlink is left untouched. The scratch directory is removed
//! best-effort afterwards.

use crate::catalog::SourceBuild;
use crate::context::RunContext;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, warn};

/// Run the full build pipeline for one component.
///
/// Returns a human-readable error string on the first failing mandatory
/// step; the caller records it in the component's execution result.
pub fn build_and_install(
    name: &str,
    build: &SourceBuild,
    ctx: &RunContext<'_>,
) -> std::result::Result<(), String> {
    let build_dir = std::env::temp_dir().join(format!("toolpin-build-{}", name));
    let _ = fs::remove_dir_all(&build_dir);
    fs::create_dir_all(&build_dir)
        .map_err(|e| format!("could not create build directory: {}", e))?;

    let result = run_pipeline(build, ctx, &build_dir);

    // Cleanup is best-effort; stale build trees never fail the run.
    if let Err(e) = fs::remove_dir_all(&build_dir) {
        warn!(
            "could not clean up build directory {}: {}",
            build_dir.display(),
            e
        );
    }

    result
}

fn run_pipeline(
    build: &SourceBuild,
    ctx: &RunContext<'_>,
    build_dir: &Path,
) -> std::result::Result<(), String> {
    let archive = build_dir.join(archive_file_name(&build.archive_url));

    download(&build.archive_url, &archive, ctx.timeout)
        .map_err(|e| format!("download failed: {}", e))?;

    unpack(&archive, build_dir).map_err(|e| format!("unpack failed: {}", e))?;

    let source_root =
        source_root_dir(build_dir).ok_or_else(|| "archive contained no source directory".to_string())?;

    let configure = format!(
        "./configure --prefix={} {}",
        build.prefix.display(),
        build.configure_args.join(" ")
    );
    run_step(ctx, &source_root, configure.trim())?;

    let jobs = thread::available_parallelism().map(usize::from).unwrap_or(1);
    run_step(ctx, &source_root, &format!("make -j{}", jobs))?;

    run_step(ctx, &source_root, "make altinstall")?;

    Ok(())
}

/// Run one mandatory build step in the source tree.
fn run_step(ctx: &RunContext<'_>, cwd: &Path, command: &str) -> std::result::Result<(), String> {
    debug!("running build step: {}", command);
    let mut options = ctx.command_options();
    options.cwd = Some(cwd.to_path_buf());

    match ctx.runner.run(command, &options) {
        Ok(result) if result.success => Ok(()),
        Ok(result) => Err(format!("'{}' failed: {}", command, result.error_detail())),
        Err(e) => Err(format!("'{}' could not be started: {}", command, e)),
    }
}

/// Download a source archive to a local file.
fn download(url: &str, dest: &Path, timeout: Option<u64>) -> anyhow::Result<()> {
    let mut builder = reqwest::blocking::Client::builder().user_agent("toolpin");
    if let Some(secs) = timeout {
        builder = builder.timeout(std::time::Duration::from_secs(secs));
    } else {
        // The blocking client times out after 30s unless told not to;
        // a large source archive needs an unbounded download.
        builder = builder.timeout(None);
    }
    let client = builder.build()?;

    let response = client.get(url).send()?.error_for_status()?;
    let bytes = response.bytes()?;
    fs::write(dest, &bytes)?;
    Ok(())
}

/// Unpack a gzipped tarball into a directory.
pub fn unpack(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = File::open(archive)?;
    let decoder = GzDecoder::new(file);
    let mut tarball = tar::Archive::new(decoder);
    tarball.unpack(dest)?;
    Ok(())
}

/// The file-name component of an archive URL.
pub fn archive_file_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("source.tgz")
        .to_string()
}

/// Find the unpacked source root: the single directory the archive
/// created inside the build dir.
pub fn source_root_dir(build_dir: &Path) -> Option<PathBuf> {
    fs::read_dir(build_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.is_dir())
}
