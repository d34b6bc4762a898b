use crate::common::error::SvnScmError;

/// Result alias used across the crate.
///
/// # Examples
///
/// ```
/// use svnscm::common::result::SvnScmResult;
/// use svnscm::common::error::SvnScmError;
///
/// fn example_function() -> SvnScmResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> SvnScmResult<()> {
///     Err(SvnScmError::config_error("Something went wrong"))
/// }
/// ```
pub type SvnScmResult<T> = Result<T, SvnScmError>;

/// Conversions from foreign `Result`s into [`SvnScmResult`].
pub trait ResultExt<T, E> {
    /// Wrap an I/O failure with a message and the path it concerns.
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> SvnScmResult<T>
    where
        E: Into<std::io::Error>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> SvnScmResult<T>
    where
        E: Into<std::io::Error>,
    {
        self.map_err(|e| SvnScmError::filesystem_error_with_source(message, path, e.into()))
    }
}
