//! Command-line flags, `--name=value` style.

use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub physics: bool,
    pub monkeys: usize,
    pub assets: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            physics: true,
            monkeys: 1,
            assets: PathBuf::from("assets"),
        }
    }
}

impl AppConfig {
    /// Parse flags, ignoring anything unrecognised. `args` excludes the
    /// program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        let mut w: Option<u32> = None;
        let mut h: Option<u32> = None;

        for arg in args {
            let arg = arg.as_ref();
            if let Some(val) = arg.strip_prefix("--gpu-backend=") {
                config.backends = parse_backend(val);
            } else if let Some(v) = arg.strip_prefix("--size=") {
                if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                    if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                        w = Some(pw);
                        h = Some(ph);
                    }
                }
            } else if let Some(v) = arg.strip_prefix("--width=") {
                if let Ok(pw) = v.parse::<u32>() {
                    w = Some(pw);
                }
            } else if let Some(v) = arg.strip_prefix("--height=") {
                if let Ok(ph) = v.parse::<u32>() {
                    h = Some(ph);
                }
            } else if arg == "--no-physics" {
                config.physics = false;
            } else if let Some(v) = arg.strip_prefix("--monkeys=") {
                match v.parse::<usize>() {
                    Ok(n) => config.monkeys = n,
                    Err(_) => log::warn!("Ignoring bad monkey count '{}'", v),
                }
            } else if let Some(v) = arg.strip_prefix("--assets=") {
                config.assets = PathBuf::from(v);
            } else {
                log::debug!("Ignoring argument '{}'", arg);
            }
        }

        config.width = w.unwrap_or(config.width).max(1);
        config.height = h.unwrap_or(config.height).max(1);
        config
    }
}

/// Accept: auto|vulkan|dx12|metal|gl
fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let config = AppConfig::from_args(Vec::<String>::new());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn parses_every_flag() {
        let config = AppConfig::from_args([
            "--gpu-backend=VK",
            "--size=800x600",
            "--no-physics",
            "--monkeys=12",
            "--assets=/tmp/models",
        ]);
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert_eq!((config.width, config.height), (800, 600));
        assert!(!config.physics);
        assert_eq!(config.monkeys, 12);
        assert_eq!(config.assets, PathBuf::from("/tmp/models"));
    }

    #[test]
    fn width_and_height_override_and_clamp() {
        let config = AppConfig::from_args(["--size=800x600", "--width=1024", "--height=0"]);
        assert_eq!((config.width, config.height), (1024, 1));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = AppConfig::from_args(["--gpu-backend=glide", "--size=big", "--monkeys=-3", "--frobnicate"]);
        assert_eq!(config, AppConfig::default());
    }
}
