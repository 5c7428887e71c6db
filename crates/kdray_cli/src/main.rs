//! Renders a built-in scene to a PNG.

mod scenes;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use kdray_core::{Antialiasing, Color, Integrator, KdOptions, Partitioner};
use kdray_renderer::{
    render, render_simple, AmbientOcclusion, DepthIntegrator, DirectLightIntegrator, RenderSettings,
    TrivialIntegrator,
};

use crate::scenes::Preset;

/// Render a demo scene with the kdray ray tracer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output PNG path
    #[arg(short = 'o', long, default_value = "render.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: usize,

    #[arg(long, default_value_t = 360)]
    height: usize,

    /// Scene to render
    #[arg(short = 'p', long, value_enum, default_value_t = Preset::Spheres)]
    preset: Preset,

    #[arg(short = 'i', long, value_enum, default_value_t = IntegratorKind::Direct)]
    integrator: IntegratorKind,

    /// Acceleration structure
    #[arg(long, value_enum, default_value_t = PartitionerKind::Kd)]
    partitioner: PartitionerKind,

    /// kd-tree options as JSON, e.g. '{"leaf_size": 4}'; missing fields keep their defaults
    #[arg(long)]
    kd_options: Option<String>,

    /// Buckets rendered per batch
    #[arg(short = 'w', long, default_value_t = 16)]
    workers: usize,

    #[arg(long, default_value_t = 32)]
    bucket_size: usize,

    /// Samples per pixel
    #[arg(short = 's', long, default_value_t = 1)]
    samples: u32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Deepest mirror bounce for the direct light integrator
    #[arg(long, default_value_t = 5)]
    ray_depth: u32,

    /// Ambient occlusion samples per hit for the direct light integrator, 0 to disable
    #[arg(long, default_value_t = 0)]
    ao_samples: u32,

    /// Largest distance at which geometry occludes
    #[arg(long, default_value_t = 1.0)]
    ao_distance: f64,

    /// Render one pixel at a time on a single thread
    #[arg(long)]
    simple: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IntegratorKind {
    /// White where anything is hit
    Trivial,
    /// Inverse hit distance
    Depth,
    /// Direct lighting with mirror reflections
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PartitionerKind {
    Kd,
    /// Linear scan, for debugging
    Simple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Args {
    fn partitioner(&self) -> Result<Partitioner> {
        let options = match &self.kd_options {
            Some(json) => serde_json::from_str::<KdOptions>(json)
                .with_context(|| format!("Invalid kd-tree options '{json}'"))?,
            None => KdOptions::default(),
        };
        Ok(match self.partitioner {
            PartitionerKind::Kd => Partitioner::KdTree(options),
            PartitionerKind::Simple => Partitioner::Simple,
        })
    }

    fn integrator(&self) -> Box<dyn Integrator> {
        match self.integrator {
            IntegratorKind::Trivial => Box::new(TrivialIntegrator),
            IntegratorKind::Depth => Box::new(DepthIntegrator),
            IntegratorKind::Direct => {
                let mut direct = DirectLightIntegrator::new(self.ray_depth);
                if self.ao_samples > 0 {
                    direct = direct.with_ambient_occlusion(AmbientOcclusion::new(
                        self.ao_samples,
                        self.ao_distance,
                        Color::ONE,
                    ));
                }
                Box::new(direct)
            }
        }
    }

    fn settings(&self) -> RenderSettings {
        RenderSettings {
            workers: self.workers,
            bucket_size: self.bucket_size,
            seed: self.seed,
            ..RenderSettings::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    if args.width == 0 || args.height == 0 {
        bail!("Image size must be positive, got {}x{}", args.width, args.height);
    }

    let mut scene = scenes::build(args.preset, args.width, args.height)
        .with_context(|| format!("Failed to build the {:?} scene", args.preset))?;
    scene.set_partitioner(args.partitioner()?);
    scene.set_antialiasing(Antialiasing::new(args.samples, 1, 0, 0.05));
    log::info!(
        "Rendering {:?} at {}x{}, {} samples per pixel",
        args.preset,
        args.width,
        args.height,
        args.samples.max(1)
    );

    let mut integrator = args.integrator();
    let settings = args.settings();
    let start = Instant::now();
    let image = if args.simple {
        render_simple(&mut scene, integrator.as_mut(), &settings)
    } else {
        render(&mut scene, integrator.as_mut(), &settings)
    }
    .context("Render failed")?;
    log::info!("Total render time {:.2?}", start.elapsed());

    image
        .save_png(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    log::info!("Wrote {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["kdray"]);
        assert_eq!(args.preset, Preset::Spheres);
        assert_eq!(args.workers, 16);
        assert!(matches!(args.partitioner().unwrap(), Partitioner::KdTree(_)));
    }

    #[test]
    fn test_kd_options_json() {
        let args = Args::parse_from(["kdray", "--kd-options", r#"{"leaf_size": 4}"#]);
        match args.partitioner().unwrap() {
            Partitioner::KdTree(options) => {
                assert_eq!(options.leaf_size, 4);
                assert_eq!(options.max_depth, KdOptions::default().max_depth);
            }
            Partitioner::Simple => panic!("expected a kd-tree"),
        }

        let bad = Args::parse_from(["kdray", "--kd-options", "{"]);
        assert!(bad.partitioner().is_err());
    }

    #[test]
    fn test_render_single_preset() {
        let args = Args::parse_from(["kdray", "-p", "single", "--width", "8", "--height", "8"]);
        let mut scene = scenes::build(args.preset, args.width, args.height).unwrap();
        scene.set_partitioner(args.partitioner().unwrap());
        let mut integrator = args.integrator();
        let image = render(&mut scene, integrator.as_mut(), &args.settings()).unwrap();
        assert_eq!(image.get(4, 4).a, 1.0);
        assert_eq!(image.get(0, 0).a, 0.0);
    }

    #[test]
    fn test_ambient_occlusion_brightens() {
        let size = ["--width", "8", "--height", "8"];
        let plain = Args::parse_from(["kdray", "-p", "single"].into_iter().chain(size));
        let ao = Args::parse_from(
            ["kdray", "-p", "single", "--ao-samples", "8"]
                .into_iter()
                .chain(size),
        );
        assert_eq!(ao.ao_distance, 1.0);

        let mut pixels = Vec::new();
        for args in [plain, ao] {
            let mut scene = scenes::build(args.preset, args.width, args.height).unwrap();
            let mut integrator = args.integrator();
            let image = render(&mut scene, integrator.as_mut(), &args.settings()).unwrap();
            pixels.push(image.get(4, 4));
        }
        assert!(pixels[1].r > pixels[0].r);
        assert!(pixels[1].b > pixels[0].b);
    }
}
