use thiserror::Error;

/// Errors returned by the quantization pipeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is out of its allowed range, or a pixel buffer
    /// does not match the declared dimensions
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The processing context cannot be created on this platform
    #[error("cannot create a processing context on this platform")]
    UnsupportedPlatform,
    /// No palette within the configured color budget reaches the minimum
    /// quality
    #[error("no palette satisfies the minimum quality under the color budget")]
    QualityTooLow,
    /// The slice provided to the function is too small
    #[error("supplied buffer is smaller than width * height")]
    BufferTooSmall,
    /// The entity was already released, or the image a result is bound to
    /// was released
    #[error("entity was released and can no longer be used")]
    UseAfterRelease,
    /// An internal buffer could not be allocated
    #[error("out of memory")]
    OutOfMemory,
    /// The operation gave up before converging. Reserved; the built-in
    /// selector has no time budget and never returns this
    #[error("operation aborted before convergence")]
    Aborted,
}
