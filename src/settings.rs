use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct CliRenderSettings {
    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub frames: Option<usize>,

    #[arg(long)]
    pub shader_path: Option<String>,

    #[arg(long)]
    pub point_shadow_size: Option<u32>,

    #[arg(long)]
    pub dir_shadow_size: Option<u32>,

    #[arg(long)]
    pub cascade_size: Option<u32>,

    #[arg(long)]
    pub cascades_count: Option<usize>,

    #[arg(long)]
    pub max_cascades: Option<usize>,

    #[arg(long)]
    pub cascades_lambda: Option<f32>,

    #[arg(long)]
    pub point_z_near: Option<f32>,

    #[arg(long)]
    pub point_z_far: Option<f32>,

    #[arg(long)]
    pub adaptation_rate: Option<f32>,

    #[arg(long)]
    pub exposure_factor: Option<f32>,

    #[arg(long)]
    pub hdr_num_samples: Option<usize>,

    #[arg(long)]
    pub use_adaptation: Option<bool>,

    #[arg(long)]
    pub bloom_threshold: Option<f32>,

    #[arg(long)]
    pub bloom_iterations: Option<usize>,

    #[arg(long)]
    pub bloom_offset_scale: Option<f32>,

    #[arg(long)]
    pub gamma: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TomlRenderSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_frames")]
    pub frames: usize,

    pub shader_path: Option<String>,

    #[serde(default = "default_point_shadow_size")]
    pub point_shadow_size: u32,

    #[serde(default = "default_dir_shadow_size")]
    pub dir_shadow_size: u32,

    #[serde(default = "default_cascade_size")]
    pub cascade_size: u32,

    #[serde(default = "default_cascades_count")]
    pub cascades_count: usize,

    #[serde(default = "default_max_cascades")]
    pub max_cascades: usize,

    #[serde(default = "default_cascades_lambda")]
    pub cascades_lambda: f32,

    #[serde(default = "default_point_z_near")]
    pub point_z_near: f32,

    #[serde(default = "default_point_z_far")]
    pub point_z_far: f32,

    #[serde(default = "default_adaptation_rate")]
    pub adaptation_rate: f32,

    #[serde(default = "default_exposure_factor")]
    pub exposure_factor: f32,

    #[serde(default = "default_hdr_num_samples")]
    pub hdr_num_samples: usize,

    #[serde(default = "default_use_adaptation")]
    pub use_adaptation: bool,

    #[serde(default = "default_bloom_threshold")]
    pub bloom_threshold: f32,

    #[serde(default = "default_bloom_iterations")]
    pub bloom_iterations: usize,

    #[serde(default = "default_bloom_offset_scale")]
    pub bloom_offset_scale: f32,

    #[serde(default = "default_gamma")]
    pub gamma: f32,
}

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub frames: usize,
    pub shader_path: PathBuf,
    pub point_shadow_size: u32,
    pub dir_shadow_size: u32,
    pub cascade_size: u32,
    pub cascades_count: usize,
    pub max_cascades: usize,
    pub cascades_lambda: f32,
    pub point_z_near: f32,
    pub point_z_far: f32,
    pub adaptation_rate: f32,
    pub exposure_factor: f32,
    pub hdr_num_samples: usize,
    pub use_adaptation: bool,
    pub bloom_threshold: f32,
    pub bloom_iterations: usize,
    pub bloom_offset_scale: f32,
    pub gamma: f32,
}

/// CLI flags win over `config.toml`, which wins over the built-in
/// defaults.
pub fn read_settings() -> RenderSettings {
    let cli = CliRenderSettings::parse();

    let toml = std::fs::read_to_string("config.toml")
        .ok()
        .and_then(|content| toml::from_str(&content).ok())
        .unwrap_or_else(default_toml_settings);

    merge_settings(cli, toml)
}

pub fn default_toml_settings() -> TomlRenderSettings {
    TomlRenderSettings {
        width: default_width(),
        height: default_height(),
        frames: default_frames(),
        shader_path: None,
        point_shadow_size: default_point_shadow_size(),
        dir_shadow_size: default_dir_shadow_size(),
        cascade_size: default_cascade_size(),
        cascades_count: default_cascades_count(),
        max_cascades: default_max_cascades(),
        cascades_lambda: default_cascades_lambda(),
        point_z_near: default_point_z_near(),
        point_z_far: default_point_z_far(),
        adaptation_rate: default_adaptation_rate(),
        exposure_factor: default_exposure_factor(),
        hdr_num_samples: default_hdr_num_samples(),
        use_adaptation: default_use_adaptation(),
        bloom_threshold: default_bloom_threshold(),
        bloom_iterations: default_bloom_iterations(),
        bloom_offset_scale: default_bloom_offset_scale(),
        gamma: default_gamma(),
    }
}

pub fn merge_settings(cli: CliRenderSettings, toml: TomlRenderSettings) -> RenderSettings {
    RenderSettings {
        width: cli.width.unwrap_or(toml.width),
        height: cli.height.unwrap_or(toml.height),
        frames: cli.frames.unwrap_or(toml.frames),
        shader_path: cli
            .shader_path
            .or(toml.shader_path)
            .unwrap_or_else(|| "shaders".into())
            .into(),
        point_shadow_size: cli.point_shadow_size.unwrap_or(toml.point_shadow_size),
        dir_shadow_size: cli.dir_shadow_size.unwrap_or(toml.dir_shadow_size),
        cascade_size: cli.cascade_size.unwrap_or(toml.cascade_size),
        cascades_count: cli.cascades_count.unwrap_or(toml.cascades_count),
        max_cascades: cli.max_cascades.unwrap_or(toml.max_cascades),
        cascades_lambda: cli.cascades_lambda.unwrap_or(toml.cascades_lambda),
        point_z_near: cli.point_z_near.unwrap_or(toml.point_z_near),
        point_z_far: cli.point_z_far.unwrap_or(toml.point_z_far),
        adaptation_rate: cli.adaptation_rate.unwrap_or(toml.adaptation_rate),
        exposure_factor: cli.exposure_factor.unwrap_or(toml.exposure_factor),
        hdr_num_samples: cli.hdr_num_samples.unwrap_or(toml.hdr_num_samples),
        use_adaptation: cli.use_adaptation.unwrap_or(toml.use_adaptation),
        bloom_threshold: cli.bloom_threshold.unwrap_or(toml.bloom_threshold),
        bloom_iterations: cli.bloom_iterations.unwrap_or(toml.bloom_iterations),
        bloom_offset_scale: cli.bloom_offset_scale.unwrap_or(toml.bloom_offset_scale),
        gamma: cli.gamma.unwrap_or(toml.gamma),
    }
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_frames() -> usize {
    60
}

fn default_point_shadow_size() -> u32 {
    1024
}

fn default_dir_shadow_size() -> u32 {
    4096
}

fn default_cascade_size() -> u32 {
    2048
}

fn default_cascades_count() -> usize {
    4
}

fn default_max_cascades() -> usize {
    4
}

fn default_cascades_lambda() -> f32 {
    0.5
}

fn default_point_z_near() -> f32 {
    0.05
}

fn default_point_z_far() -> f32 {
    150.0
}

fn default_adaptation_rate() -> f32 {
    1.0
}

fn default_exposure_factor() -> f32 {
    0.35
}

fn default_hdr_num_samples() -> usize {
    64
}

fn default_use_adaptation() -> bool {
    true
}

fn default_bloom_threshold() -> f32 {
    1.0
}

fn default_bloom_iterations() -> usize {
    2
}

fn default_bloom_offset_scale() -> f32 {
    1.0
}

fn default_gamma() -> f32 {
    2.2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cli() -> CliRenderSettings {
        CliRenderSettings::parse_from(["lumen-headless"])
    }

    #[test]
    fn cli_overrides_toml() {
        let mut cli = empty_cli();
        cli.width = Some(640);

        let settings = merge_settings(cli, default_toml_settings());
        assert_eq!(settings.width, 640);
        assert_eq!(settings.height, default_height());
    }

    #[test]
    fn toml_defaults_fill_missing_fields() {
        let toml: TomlRenderSettings = toml::from_str("width = 320").unwrap();
        assert_eq!(toml.width, 320);
        assert_eq!(toml.max_cascades, default_max_cascades());

        let settings = merge_settings(empty_cli(), toml);
        assert_eq!(settings.width, 320);
        assert_eq!(settings.gamma, default_gamma());
    }
}
