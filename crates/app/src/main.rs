//! Entry point for meshview.
//! Logging + CLI flags, then hands off to the platform viewer.

use std::path::PathBuf;

use anyhow::Result;
use platform::ViewerConfig;

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_show_fps_arg(args: &[String]) -> bool {
    // --show-fps[=on|off], off by default
    for arg in args {
        if arg == "--show-fps" {
            return true;
        }
        if let Some(val) = arg.strip_prefix("--show-fps=") {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
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
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

/// `--model=PATH` may repeat; all models share one shader.
fn parse_model_args(args: &[String]) -> Vec<PathBuf> {
    args.iter()
        .filter_map(|arg| arg.strip_prefix("--model="))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_shader_arg(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .filter_map(|arg| arg.strip_prefix("--shader="))
        .filter(|v| !v.is_empty())
        .last()
        .map(PathBuf::from)
}

fn parse_model_scale_arg(args: &[String]) -> Option<f32> {
    let mut scale = None;
    for arg in args {
        if let Some(v) = arg.strip_prefix("--model-scale=") {
            match v.parse::<f32>() {
                Ok(s) if s.is_finite() && s > 0.0 => scale = Some(s),
                _ => log::warn!("Invalid model scale '{}', keeping default.", v),
            }
        }
    }
    scale
}

fn parse_args(args: &[String]) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    config.backends = parse_backend_arg(args);
    config.show_fps = parse_show_fps_arg(args);
    (config.width, config.height) = parse_size_args(args);

    let models = parse_model_args(args);
    if !models.is_empty() {
        config.models = models;
    }
    config.shader = parse_shader_arg(args);
    if let Some(scale) = parse_model_scale_arg(args) {
        config.mesh.model_scale = scale;
    }
    config
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_args(&args);
    log::info!(
        "Starting meshview. Backend: {:?}, show_fps={}, window_size={}x{}, models={:?}, shader={:?}, model_scale={}",
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.models,
        config.shader,
        config.mesh.model_scale
    );

    platform::run_with_renderer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::mesh::DEFAULT_MODEL_SCALE;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse_args(&[]);
        assert_eq!(config.backends, wgpu::Backends::all());
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(!config.show_fps);
        assert_eq!(config.models, vec![PathBuf::from("models/cube.obj")]);
        assert!(config.shader.is_none());
        assert_eq!(config.mesh.model_scale, DEFAULT_MODEL_SCALE);
    }

    #[test]
    fn size_and_backend_flags() {
        let config = parse_args(&args(&["--size=800x600", "--gpu-backend=VK", "--show-fps"]));
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert!(config.show_fps);
    }

    #[test]
    fn unknown_backend_falls_back_to_auto() {
        let config = parse_args(&args(&["--gpu-backend=glide"]));
        assert_eq!(config.backends, wgpu::Backends::all());
    }

    #[test]
    fn repeated_models_and_shader() {
        let config = parse_args(&args(&[
            "--model=a.obj",
            "--model=b.obj",
            "--shader=shaders/alt.wgsl",
            "--model-scale=0.5",
        ]));
        assert_eq!(
            config.models,
            vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")]
        );
        assert_eq!(config.shader, Some(PathBuf::from("shaders/alt.wgsl")));
        assert_eq!(config.mesh.model_scale, 0.5);
    }

    #[test]
    fn invalid_model_scale_keeps_default() {
        let config = parse_args(&args(&["--model-scale=-2", "--model-scale=abc"]));
        assert_eq!(config.mesh.model_scale, DEFAULT_MODEL_SCALE);
    }

    #[test]
    fn zero_size_is_clamped() {
        assert_eq!(parse_size_args(&args(&["--width=0", "--height=0"])), (1, 1));
    }
}
