use flux_asm::AssemblerErrorKind;
use flux_asm::artifact::ArtifactError;
use thiserror_no_std::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// Rendered diagnostic, the error itself borrows the source text.
    #[error("{0}")]
    Assembly(String),
    #[error("cannot disassemble: {0}")]
    Disassembly(#[from] AssemblerErrorKind),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("cannot derive an output name from {0:?}")]
    NoOutputName(String),
}

impl CliError {
    pub fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> CliError + '_ {
        move |source| CliError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
