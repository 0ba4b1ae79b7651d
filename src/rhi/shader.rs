use super::types::ShaderStage;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader source at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage:?} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("program failed to link: {log}")]
    Link { log: String },
}
