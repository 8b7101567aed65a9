//! # Platform-specific utilities
//!
//! Questo modulo centralizza la ricerca dei tool esterni (oggi solo `cwebp`)
//! in modo cross-platform: override tramite `TOOLS_DIR`, poi system `PATH`.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Platform-specific command manager with tool resolution
pub struct PlatformCommands {
    /// Directory with bundled tools, from the `TOOLS_DIR` environment variable
    tools_dir: Option<PathBuf>,
    executable_suffix: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());
        if let Some(ref dir) = tools_dir {
            debug!("Using TOOLS_DIR for external tools: {}", dir.display());
        }

        Self {
            tools_dir,
            executable_suffix: if cfg!(windows) { ".exe" } else { "" },
        }
    }

    /// Get the platform-specific executable name
    pub fn get_command(&self, base_name: &str) -> String {
        format!("{}{}", base_name, self.executable_suffix)
    }

    /// Get the resolved path to a tool (TOOLS_DIR first, then system PATH)
    pub fn get_tool_path(&self, base_name: &str) -> Option<PathBuf> {
        let command = self.get_command(base_name);

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = tools_dir.join(&command);
            if bundled.is_file() {
                debug!("Using bundled tool: {} -> {}", base_name, bundled.display());
                return Some(bundled);
            }
        }

        let found = env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(&command))
                .find(|candidate| candidate.is_file())
        });

        match found {
            Some(path) => {
                debug!("Using system tool: {} -> {}", base_name, path.display());
                Some(path)
            }
            None => {
                warn!("Tool not found: {}", base_name);
                None
            }
        }
    }

    /// Check if a command is available on the system or bundled
    pub fn is_command_available(&self, base_name: &str) -> bool {
        self.get_tool_path(base_name).is_some()
    }

    /// Installation hint shown when a tool is missing
    pub fn install_instructions(&self, base_name: &str) -> String {
        match base_name {
            "cwebp" | "dwebp" => {
                if cfg!(target_os = "macos") {
                    "brew install webp".to_string()
                } else if cfg!(windows) {
                    "download libwebp from https://developers.google.com/speed/webp/download and put cwebp.exe on PATH (or in TOOLS_DIR)".to_string()
                } else {
                    "sudo apt-get install webp".to_string()
                }
            }
            other => format!("install '{}' and make sure it is on PATH", other),
        }
    }
}
