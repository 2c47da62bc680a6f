//! Platform-specific module file naming
//!
//! Plugin modules are named after their plugin id with the platform's shared
//! library prefix and extension:
//! - Linux: `lib{id}.so`
//! - macOS: `lib{id}.dylib`
//! - Windows: `{id}.dll`

/// Get the platform-specific shared library extension
///
/// # Examples
///
/// ```
/// use sdk::platform::library_extension;
///
/// let ext = library_extension();
///
/// #[cfg(target_os = "linux")]
/// assert_eq!(ext, "so");
///
/// #[cfg(target_os = "windows")]
/// assert_eq!(ext, "dll");
/// ```
pub fn library_extension() -> &'static str {
    #[cfg(target_os = "linux")]
    return "so";

    #[cfg(target_os = "macos")]
    return "dylib";

    #[cfg(target_os = "windows")]
    return "dll";

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "so"; // Default to .so for unknown platforms
}

/// Get the platform-specific shared library prefix
///
/// Returns "lib" on Unix and "" on Windows.
pub fn library_prefix() -> &'static str {
    #[cfg(unix)]
    return "lib";

    #[cfg(windows)]
    return "";
}

/// Construct the module file name for a plugin id
///
/// # Examples
///
/// ```
/// use sdk::platform::library_filename;
///
/// let filename = library_filename("weather");
///
/// #[cfg(target_os = "linux")]
/// assert_eq!(filename, "libweather.so");
///
/// #[cfg(target_os = "windows")]
/// assert_eq!(filename, "weather.dll");
/// ```
pub fn library_filename(plugin_id: &str) -> String {
    format!("{}{}.{}", library_prefix(), plugin_id, library_extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_extension() {
        let ext = library_extension();

        #[cfg(target_os = "linux")]
        assert_eq!(ext, "so");

        #[cfg(target_os = "macos")]
        assert_eq!(ext, "dylib");

        #[cfg(target_os = "windows")]
        assert_eq!(ext, "dll");
    }

    #[test]
    fn test_library_prefix() {
        let prefix = library_prefix();

        #[cfg(unix)]
        assert_eq!(prefix, "lib");

        #[cfg(windows)]
        assert_eq!(prefix, "");
    }

    #[test]
    fn test_library_filename_with_dash() {
        let filename = library_filename("game-of-life");

        #[cfg(target_os = "linux")]
        assert_eq!(filename, "libgame-of-life.so");

        #[cfg(target_os = "macos")]
        assert_eq!(filename, "libgame-of-life.dylib");

        #[cfg(target_os = "windows")]
        assert_eq!(filename, "game-of-life.dll");
    }
}
