//! Shader loading for vkboot.
//!
//! Turns a file path and a pipeline stage into a shader module. Precompiled
//! SPIR-V (`name.<stage>.spv`) is always supported; GLSL sources
//! (`name.vert`, `name.frag`, `name.comp`) need the `glsl` feature.

use std::fmt;
use std::path::{Path, PathBuf};

use ash::vk;
use thiserror::Error;
use vkboot_gpu::{DeviceApi, GpuError};

/// SPIR-V magic number, first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Failed to read shader {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot infer shader stage from {0}")]
    UnknownExtension(PathBuf),
    #[error("Shader {path} is a {found} shader, expected {expected}")]
    StageMismatch {
        path: PathBuf,
        expected: ShaderStage,
        found: ShaderStage,
    },
    #[error("SPIR-V byte length {0} is not a multiple of 4")]
    Misaligned(usize),
    #[error("Bad SPIR-V magic number {0:#010x}")]
    BadMagic(u32),
    #[error("No GLSL compiler available for {0}")]
    CompilerUnavailable(PathBuf),
    #[error("Failed to compile {path}: {message}")]
    Compilation { path: PathBuf, message: String },
    #[error("Shader module creation failed: {0}")]
    ModuleCreation(#[source] GpuError),
}

pub type Result<T> = std::result::Result<T, ShaderError>;

/// Pipeline stage of a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        };
        f.write_str(name)
    }
}

impl ShaderStage {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "vert" => Some(Self::Vertex),
            "frag" => Some(Self::Fragment),
            "comp" => Some(Self::Compute),
            _ => None,
        }
    }

    /// Infer the stage from `name.<stage>` or `name.<stage>.spv`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let unknown = || ShaderError::UnknownExtension(path.to_path_buf());
        let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(unknown)?;
        let stage_extension = if is_spirv(path) {
            Path::new(path.file_stem().ok_or_else(unknown)?)
                .extension()
                .and_then(|e| e.to_str())
                .ok_or_else(unknown)?
        } else {
            extension
        };
        Self::from_extension(stage_extension).ok_or_else(unknown)
    }

    /// Vulkan stage flag.
    pub fn to_vk(self) -> vk::ShaderStageFlags {
        match self {
            Self::Vertex => vk::ShaderStageFlags::VERTEX,
            Self::Fragment => vk::ShaderStageFlags::FRAGMENT,
            Self::Compute => vk::ShaderStageFlags::COMPUTE,
        }
    }
}

fn is_spirv(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "spv")
}

/// Convert SPIR-V bytes to words, validating length and magic number.
pub fn bytes_to_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(ShaderError::Misaligned(bytes.len()));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&other) => Err(ShaderError::BadMagic(other)),
        None => Err(ShaderError::Misaligned(0)),
    }
}

/// Check that the file at `path` holds a shader for `stage`.
pub fn check_stage(path: &Path, stage: ShaderStage) -> Result<()> {
    let found = ShaderStage::from_path(path)?;
    if found == stage {
        Ok(())
    } else {
        Err(ShaderError::StageMismatch {
            path: path.to_path_buf(),
            expected: stage,
            found,
        })
    }
}

/// Load SPIR-V words from a `.spv` file or, with the `glsl` feature, a GLSL source.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let stage = ShaderStage::from_path(path)?;
    let io_error = |source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    };

    if is_spirv(path) {
        let bytes = std::fs::read(path).map_err(io_error)?;
        let words = bytes_to_spirv(&bytes)?;
        tracing::debug!("Loaded {} ({} stage, {} words)", path.display(), stage, words.len());
        Ok(words)
    } else {
        let source = std::fs::read_to_string(path).map_err(io_error)?;
        compile_glsl(path, &source, stage)
    }
}

#[cfg(feature = "glsl")]
fn compile_glsl(path: &Path, source: &str, stage: ShaderStage) -> Result<Vec<u32>> {
    let compiler =
        shaderc::Compiler::new().ok_or_else(|| ShaderError::CompilerUnavailable(path.into()))?;
    let kind = match stage {
        ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
        ShaderStage::Compute => shaderc::ShaderKind::Compute,
    };
    let artifact = compiler
        .compile_into_spirv(source, kind, &path.display().to_string(), "main", None)
        .map_err(|e| ShaderError::Compilation {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    tracing::debug!("Compiled {} ({} stage)", path.display(), stage);
    Ok(artifact.as_binary().to_vec())
}

#[cfg(not(feature = "glsl"))]
fn compile_glsl(path: &Path, _source: &str, _stage: ShaderStage) -> Result<Vec<u32>> {
    Err(ShaderError::CompilerUnavailable(path.to_path_buf()))
}

/// Load the shader at `path` and create a module for `stage`.
pub fn load_shader_module<D: DeviceApi>(
    device: &D,
    path: &Path,
    stage: ShaderStage,
) -> Result<vk::ShaderModule> {
    check_stage(path, stage)?;
    let code = load_spirv(path)?;
    device
        .create_shader_module(&code)
        .map_err(ShaderError::ModuleCreation)
}
