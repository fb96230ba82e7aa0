//! ImageMagick backend: shells out to the `magick` (v7) or `convert` (v6) CLI.
//!
//! Preferred when installed: ImageMagick reads more formats than the pure
//! Rust decoders and handles color profiles. Each call spawns one process, so
//! native resources are released when the command exits.
//!
//! ## Step mapping
//!
//! | Step | Arguments |
//! |---|---|
//! | `Crop` | `-crop WxH+X+Y +repage` |
//! | `Resize` | `-resize WxH!` |
//! | `Sharpen` | `-unsharp 0x{sigma}+1+{threshold/255}` |
//! | `Canvas` | `-size WxH xc:none ( … ) -geometry +L+T -composite` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{RenderParams, Step};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Backend driving an installed ImageMagick binary.
pub struct MagickBackend {
    program: PathBuf,
}

impl MagickBackend {
    /// Use a specific ImageMagick executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Find `magick` or `convert` on `PATH`.
    pub fn detect() -> Option<Self> {
        ["magick", "convert"]
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: &[String]) -> Result<Vec<u8>, String> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.program.display(), e))?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

/// First frame of the source, so animated inputs produce a single image.
fn input_arg(path: &Path) -> String {
    format!("{}[0]", path.display())
}

/// Translate a render plan into ImageMagick arguments.
pub(crate) fn build_args(params: &RenderParams) -> Vec<String> {
    let mut args = vec![input_arg(&params.source)];

    for step in &params.steps {
        match *step {
            Step::Crop {
                x,
                y,
                width,
                height,
            } => {
                args.push("-crop".into());
                args.push(format!("{width}x{height}+{x}+{y}"));
                args.push("+repage".into());
            }
            Step::Resize { width, height } => {
                args.push("-resize".into());
                args.push(format!("{width}x{height}!"));
            }
            Step::Sharpen(s) => {
                args.push("-unsharp".into());
                args.push(format!("0x{}+1+{}", s.sigma, s.threshold as f32 / 255.0));
            }
            Step::Canvas {
                width,
                height,
                left,
                top,
            } => {
                let mut wrapped = vec![
                    "-size".to_string(),
                    format!("{width}x{height}"),
                    "xc:none".to_string(),
                    "(".to_string(),
                ];
                wrapped.append(&mut args);
                wrapped.extend([
                    ")".to_string(),
                    "-geometry".to_string(),
                    format!("{left:+}{top:+}"),
                    "-composite".to_string(),
                ]);
                args = wrapped;
            }
        }
    }

    args.push("-quality".into());
    args.push(params.quality.value().to_string());
    args.push(params.output.display().to_string());
    args
}

fn ensure_exists(path: &Path) -> Result<(), BackendError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BackendError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )))
    }
}

impl ImageBackend for MagickBackend {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        ensure_exists(path)?;
        let args = vec![
            input_arg(path),
            "-format".to_string(),
            "%w %h".to_string(),
            "info:".to_string(),
        ];
        let stdout = self.run(&args).map_err(|e| BackendError::load(path, e))?;
        let text = String::from_utf8_lossy(&stdout);
        let mut parts = text.split_whitespace().map(str::parse::<u32>);
        match (parts.next(), parts.next()) {
            (Some(Ok(width)), Some(Ok(height))) => Ok(Dimensions { width, height }),
            _ => Err(BackendError::load(
                path,
                format!("unexpected identify output {:?}", text.trim()),
            )),
        }
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        ensure_exists(&params.source)?;
        self.run(&build_args(params))
            .map(|_| ())
            .map_err(BackendError::ProcessingFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{Quality, Sharpening};

    fn params(steps: Vec<Step>) -> RenderParams {
        RenderParams {
            source: "/in/photo.jpg".into(),
            output: "/out/thumb.jpg".into(),
            steps,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn args_without_steps_copy_first_frame() {
        assert_eq!(
            build_args(&params(Vec::new())),
            vec!["/in/photo.jpg[0]", "-quality", "85", "/out/thumb.jpg"]
        );
    }

    #[test]
    fn args_crop_resize_sharpen() {
        let args = build_args(&params(vec![
            Step::Crop {
                x: 5,
                y: 10,
                width: 300,
                height: 200,
            },
            Step::Resize {
                width: 150,
                height: 100,
            },
            Step::Sharpen(Sharpening::light()),
        ]));
        assert_eq!(
            args,
            vec![
                "/in/photo.jpg[0]",
                "-crop",
                "300x200+5+10",
                "+repage",
                "-resize",
                "150x100!",
                "-unsharp",
                "0x0.5+1+0",
                "-quality",
                "85",
                "/out/thumb.jpg",
            ]
        );
    }

    #[test]
    fn args_canvas_wraps_previous_operations() {
        let args = build_args(&params(vec![
            Step::Resize {
                width: 80,
                height: 40,
            },
            Step::Canvas {
                width: 100,
                height: 100,
                left: 10,
                top: 30,
            },
        ]));
        assert_eq!(
            args,
            vec![
                "-size",
                "100x100",
                "xc:none",
                "(",
                "/in/photo.jpg[0]",
                "-resize",
                "80x40!",
                ")",
                "-geometry",
                "+10+30",
                "-composite",
                "-quality",
                "85",
                "/out/thumb.jpg",
            ]
        );
    }

    #[test]
    fn missing_source_is_io_error_without_spawning() {
        let backend = MagickBackend::new("/nonexistent/magick");
        let result = backend.identify(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn unspawnable_program_is_processing_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        std::fs::write(&source, b"x").unwrap();
        let backend = MagickBackend::new("/nonexistent/magick");
        let result = backend.render(&RenderParams {
            source,
            output: tmp.path().join("out.jpg"),
            steps: Vec::new(),
            quality: Quality::default(),
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
