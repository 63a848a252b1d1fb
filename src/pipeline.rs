use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::detection::ZoneContourMeasurer;
use crate::detection::preprocessing::{self, Histogram};
use crate::detection::steps::{BandPassStep, LaplacianStep, ZoneOverlayStep};
use crate::models::{Frame, MeasurementReport, WorkingFrame};

/// Data that flows through the pipeline: the working copy of one frame
/// plus what the stages learned about it.
#[derive(Debug, Clone)]
pub struct PipelineData {
    /// Working copy, replaced by every stage
    pub image: WorkingFrame,

    /// The frame the cycle started from (shared, never modified)
    pub original: Arc<Frame>,

    /// Set once the Laplacian stage has run
    pub laplacian_applied: bool,

    /// Present when the overlay stage measured the zones
    pub report: Option<MeasurementReport>,
}

impl PipelineData {
    pub fn from_frame(frame: Arc<Frame>) -> Self {
        Self {
            image: WorkingFrame::from(frame.as_ref().clone()),
            original: frame,
            laplacian_applied: false,
            report: None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
    /// Index of the frame being processed, used to name debug outputs
    pub frame_index: u64,
}

/// One stage of the filter pipeline. Stages take ownership of the working
/// data and hand back a new one; nothing they touch is shared.
pub trait PipelineStep: Send + Sync {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> PipelineData;

    /// Human-readable name for this step (used in logs and debug folders)
    fn name(&self) -> &str;
}

/// Result of one processing cycle.
#[derive(Debug, Clone)]
pub struct Inspection {
    /// The filtered and annotated frame
    pub frame: WorkingFrame,
    /// True once the Laplacian ran; histograms then cover a single channel
    pub grayscale: bool,
    /// `None` unless edge detection was enabled
    pub report: Option<MeasurementReport>,
}

impl Inspection {
    pub fn histogram(&self) -> Histogram {
        preprocessing::histogram(&self.frame)
    }
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self { steps: Vec::new(), debug: None }
    }

    /// The fixed filter order: band-pass, Laplacian, zone overlay. Disabled
    /// stages are left out.
    pub fn for_config(config: &FilterConfig, measurer: Arc<ZoneContourMeasurer>) -> Self {
        let mut pipeline = Self::new();
        if config.bandpass_enabled {
            pipeline = pipeline.add_step(Arc::new(BandPassStep { band: config.bandpass }));
        }
        if config.laplacian_enabled {
            pipeline = pipeline.add_step(Arc::new(LaplacianStep));
        }
        if config.overlay_requested() {
            pipeline = pipeline.add_step(Arc::new(ZoneOverlayStep {
                measurer,
                measure: config.edge_detection_enabled,
            }));
        }
        pipeline
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.debug = Some(prepare_debug_dir(output_dir)?);
        Ok(self)
    }

    fn with_debug_config(mut self, debug: Option<DebugConfig>) -> Self {
        self.debug = debug;
        self
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order on a working copy of `frame`.
    pub fn run(&self, frame: Arc<Frame>, frame_index: u64) -> Inspection {
        let context = PipelineContext { debug: self.debug.clone(), frame_index };

        save_debug_image(&context, "00_input", &WorkingFrame::from(frame.as_ref().clone()));

        let mut data = PipelineData::from_frame(frame);
        for (step_idx, step) in self.steps.iter().enumerate() {
            debug!(step = step.name(), frame = frame_index, "running step");
            data = step.process(data, &context);

            let step_dir = format!("{:02}_{}", step_idx + 1, step.name().to_lowercase().replace(' ', "_"));
            save_debug_image(&context, &step_dir, &data.image);
        }

        Inspection {
            grayscale: data.laplacian_applied || data.image.is_grayscale(),
            frame: data.image,
            report: data.report,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one pipeline per cycle for a fixed set of zones.
pub struct Inspector {
    measurer: Arc<ZoneContourMeasurer>,
    debug: Option<DebugConfig>,
    frames: AtomicU64,
}

impl Inspector {
    pub fn new(measurer: ZoneContourMeasurer) -> Self {
        Self {
            measurer: Arc::new(measurer),
            debug: None,
            frames: AtomicU64::new(0),
        }
    }

    /// Dump every stage output of every processed frame below `output_dir`.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.debug = Some(prepare_debug_dir(output_dir)?);
        Ok(self)
    }

    pub fn measurer(&self) -> &ZoneContourMeasurer {
        &self.measurer
    }

    /// Filter, annotate and measure one frame.
    pub fn process(&self, frame: Arc<Frame>, config: &FilterConfig) -> Inspection {
        let index = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        Pipeline::for_config(config, self.measurer.clone())
            .with_debug_config(self.debug.clone())
            .run(frame, index)
    }
}

/// Single-shot entry point: filter `frame` according to `config` and
/// measure the zones of `measurer`.
pub fn process(frame: &Frame, config: &FilterConfig, measurer: &ZoneContourMeasurer) -> Inspection {
    Pipeline::for_config(config, Arc::new(measurer.clone())).run(Arc::new(frame.clone()), 1)
}

fn prepare_debug_dir(output_dir: PathBuf) -> Result<DebugConfig> {
    // Check if directory exists and is empty
    if output_dir.exists() {
        let entries = std::fs::read_dir(&output_dir)?;
        if entries.count() > 0 {
            return Err(anyhow::anyhow!(
                "Debug directory is not empty: {}",
                output_dir.display()
            ));
        }
    } else {
        std::fs::create_dir_all(&output_dir)?;
    }
    Ok(DebugConfig { output_dir })
}

/// Debug output is best effort; a failed write never aborts the cycle.
fn save_debug_image(context: &PipelineContext, step_dir: &str, image: &WorkingFrame) {
    let Some(debug_config) = &context.debug else {
        return;
    };
    let dir = debug_config.output_dir.join(step_dir);
    let path = dir.join(format!("frame_{:04}.png", context.frame_index));
    if let Err(err) = write_png(&dir, &path, image) {
        warn!(path = %path.display(), %err, "failed to save debug image");
    } else {
        debug!(path = %path.display(), "saved debug image");
    }
}

fn write_png(dir: &Path, path: &Path, image: &WorkingFrame) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    image
        .to_dynamic()
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))
}
