use thiserror::Error;

#[derive(Error, Debug)]
pub enum QrgenError {
    /// Bad command line, missing content, or an explicit `--help`.
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("invalid argument '-p' '{0}'")]
    InvalidPage(String),

    #[error("failed to encode qr code: {0}")]
    Encoding(String),

    #[error("failed to rasterize png: {0}")]
    Raster(#[from] image::ImageError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
