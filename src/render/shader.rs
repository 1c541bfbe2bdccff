use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

/// Failure to load a resource the demo cannot run without.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("resource {path} not found (searched the working directory and {manifest})")]
    Missing { path: PathBuf, manifest: String },
    #[error("failed to read shader source {path}")]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read font {path}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font {path} was rejected: {reason}")]
    FontParse { path: PathBuf, reason: String },
}

/// The three programs of the pipeline, one per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Normal,
    Lighting,
    Sketch,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [ShaderKind::Normal, ShaderKind::Lighting, ShaderKind::Sketch];

    pub fn file_name(self) -> &'static str {
        match self {
            ShaderKind::Normal => "normal.wgsl",
            ShaderKind::Lighting => "lighting.wgsl",
            ShaderKind::Sketch => "sketch.wgsl",
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderKind::Normal => "normal",
            ShaderKind::Lighting => "lighting",
            ShaderKind::Sketch => "sketch",
        };
        f.write_str(name)
    }
}

/// WGSL sources for every pass, read once at setup.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub normal: String,
    pub lighting: String,
    pub sketch: String,
}

impl ShaderSources {
    /// Reads `normal.wgsl`, `lighting.wgsl` and `sketch.wgsl` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let read = |kind: ShaderKind| -> Result<String, LoadError> {
            let path = resolve_resource(&dir.join(kind.file_name()))?;
            info!("loading {kind} shader from {}", path.display());
            fs::read_to_string(&path).map_err(|source| LoadError::ShaderRead { path, source })
        };
        Ok(Self {
            normal: read(ShaderKind::Normal)?,
            lighting: read(ShaderKind::Lighting)?,
            sketch: read(ShaderKind::Sketch)?,
        })
    }

    pub fn get(&self, kind: ShaderKind) -> &str {
        match kind {
            ShaderKind::Normal => &self.normal,
            ShaderKind::Lighting => &self.lighting,
            ShaderKind::Sketch => &self.sketch,
        }
    }
}

/// Resolves a relative resource path against the working directory, then
/// against the crate directory the binary was built from.
pub fn resolve_resource(path: &Path) -> Result<PathBuf, LoadError> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if path.is_relative() {
        let fallback = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
        if fallback.exists() {
            return Ok(fallback);
        }
    }
    Err(missing(path))
}

fn missing(path: &Path) -> LoadError {
    LoadError::Missing {
        path: path.to_path_buf(),
        manifest: env!("CARGO_MANIFEST_DIR").to_string(),
    }
}
