use std::path::PathBuf;

/// Shader profile directory under `resources/shaders/`.
///
/// wgpu translates WGSL for every backend, so there is a single profile.
pub const SHADER_PROFILE: &str = "wgsl";

/// Startup configuration for the demo window and its render passes.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub target_fps: u32,
    /// Requested sample count for the normal and lighting passes.
    pub msaa_samples: u32,
    pub shader_dir: PathBuf,
    /// Fonts tried in order for the diagnostics overlay.
    pub font_candidates: Vec<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "sketch lighting - basic lighting".to_string(),
            target_fps: 60,
            msaa_samples: 4,
            shader_dir: PathBuf::from("resources/shaders").join(SHADER_PROFILE),
            font_candidates: default_font_candidates(),
        }
    }
}

impl DemoConfig {
    /// Aspect ratio of the off-screen targets, which never follow the window.
    pub fn target_aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn frame_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

fn default_font_candidates() -> Vec<PathBuf> {
    [
        "resources/fonts/overlay.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_window() {
        let config = DemoConfig::default();
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.target_fps, 60);
        assert_eq!(config.msaa_samples, 4);
        assert!(config.shader_dir.ends_with("shaders/wgsl"));
    }

    #[test]
    fn frame_period_guards_against_zero_fps() {
        let config = DemoConfig {
            target_fps: 0,
            ..DemoConfig::default()
        };
        assert_eq!(config.frame_period(), std::time::Duration::from_secs(1));
    }
}
