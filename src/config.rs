//! Runtime configuration read from the process environment.

use std::env;
use std::path::PathBuf;

/// Snapshot of everything the server needs to start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Address the HTTP server binds, e.g. `127.0.0.1:8080`.
    pub bind_addr: String,
    /// Path of the exported ONNX model.
    pub model_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        fn env_or(key: &str, default: &str) -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        }

        Self {
            bind_addr: env_or("LESION_API_BIND", "127.0.0.1:8080"),
            model_path: PathBuf::from(env_or("LESION_API_MODEL", "model.onnx")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        env::remove_var("LESION_API_BIND");
        env::remove_var("LESION_API_MODEL");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.model_path, PathBuf::from("model.onnx"));
    }
}
