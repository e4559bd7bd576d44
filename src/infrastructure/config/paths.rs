use std::path::PathBuf;

/// Get platform-specific configuration directory
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("autopost")
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library/Application Support/autopost")
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("autopost")
    }
}

/// Cookie jar written after a successful login and read at restore time.
pub fn cookie_jar_path() -> PathBuf {
    config_dir().join("cookies.yaml")
}

/// Browser profile directory (cache, localStorage).
pub fn profile_dir() -> PathBuf {
    config_dir().join("profile")
}

pub fn log_dir() -> PathBuf {
    config_dir().join("logs")
}
