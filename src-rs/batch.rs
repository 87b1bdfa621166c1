use crate::error::{AnnotateError, AnnotateResult};
use crate::geometry::ReferenceFrame;
use crate::hierarchy;
use crate::render::{self, WalkStats};
use clap::ValueEnum;
use rayon::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const HIERARCHY_EXTENSION: &str = "json";
const IMAGE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Log the failed pair and continue with the rest
    Skip,
    /// Stop the run at the first failed pair
    Abort,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub frame: ReferenceFrame,
    pub on_error: FailurePolicy,
    pub jobs: usize,
}

/// One `<name>.json` / `<name>.jpg` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub hierarchy: PathBuf,
    pub image: PathBuf,
}

impl FilePair {
    fn for_hierarchy(hierarchy: PathBuf) -> Self {
        let image = hierarchy.with_extension(IMAGE_EXTENSION);
        Self { hierarchy, image }
    }

    fn image_name(&self) -> String {
        self.image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct Annotated {
    pub pair: FilePair,
    pub output: PathBuf,
    pub stats: WalkStats,
}

#[derive(Debug)]
pub struct Failed {
    pub pair: FilePair,
    pub error: AnnotateError,
}

/// Result of scanning the input directory.
#[derive(Debug, Default)]
pub struct Discovery {
    pub pairs: Vec<FilePair>,
    /// Entries that could not be inspected and were left out of `pairs`.
    pub unreadable: Vec<AnnotateError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub annotated: Vec<Annotated>,
    pub failed: Vec<Failed>,
    pub unreadable: Vec<AnnotateError>,
}

impl BatchReport {
    pub fn failure_count(&self) -> usize {
        self.failed.len() + self.unreadable.len()
    }

    pub fn to_json(&self, options: &BatchOptions, generated_at: &str) -> Value {
        let annotated: Vec<Value> = self
            .annotated
            .iter()
            .map(|item| {
                json!({
                    "hierarchy": item.pair.hierarchy.display().to_string(),
                    "image": item.pair.image.display().to_string(),
                    "output": item.output.display().to_string(),
                    "nodes": item.stats.nodes,
                    "rectangles": item.stats.rectangles,
                })
            })
            .collect();
        let failed: Vec<Value> = self
            .failed
            .iter()
            .map(|item| {
                json!({
                    "hierarchy": item.pair.hierarchy.display().to_string(),
                    "image": item.pair.image.display().to_string(),
                    "error": item.error.to_string(),
                })
            })
            .collect();
        let unreadable: Vec<String> = self.unreadable.iter().map(ToString::to_string).collect();

        json!({
            "report_version": 1,
            "generated_at": generated_at,
            "input_dir": options.input_dir.display().to_string(),
            "output_dir": options.output_dir.display().to_string(),
            "reference": {"width": options.frame.width, "height": options.frame.height},
            "succeeded": self.annotated.len(),
            "failed": self.failure_count(),
            "annotated": annotated,
            "failures": failed,
            "unreadable": unreadable,
        })
    }
}

/// Lists `*.json` hierarchy files directly inside `input_dir`, sorted by
/// file name, each paired with its `.jpg` sibling. Symlinks are followed;
/// entries that cannot be inspected are returned in
/// [`Discovery::unreadable`].
pub fn discover_pairs(input_dir: &Path) -> AnnotateResult<Discovery> {
    if !input_dir.is_dir() {
        return Err(AnnotateError::InputDirectory(input_dir.to_path_buf()));
    }

    let mut discovery = Discovery::default();
    let mut hierarchies: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        match entry {
            Ok(entry) => {
                let path = entry.into_path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == HIERARCHY_EXTENSION)
                {
                    hierarchies.push(path);
                }
            }
            Err(source) => {
                let path = source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| input_dir.to_path_buf());
                discovery
                    .unreadable
                    .push(AnnotateError::Scan { path, source });
            }
        }
    }
    hierarchies.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    discovery.pairs = hierarchies.into_iter().map(FilePair::for_hierarchy).collect();
    Ok(discovery)
}

/// Creates `output_dir` if needed and removes every regular file directly
/// inside it. Subdirectories are left alone.
pub fn reset_output_dir(output_dir: &Path) -> AnnotateResult<usize> {
    let io_err = |source: std::io::Error| AnnotateError::OutputDirectory {
        path: output_dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(output_dir).map_err(io_err)?;
    let mut removed = 0;
    for entry in fs::read_dir(output_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(io_err)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Annotates one pair and writes the result into `output_dir`.
pub fn process_pair(
    pair: &FilePair,
    output_dir: &Path,
    frame: ReferenceFrame,
) -> AnnotateResult<Annotated> {
    let root = hierarchy::load_root(&pair.hierarchy)?;

    if !pair.image.is_file() {
        return Err(AnnotateError::MissingCompanionImage {
            json: pair.hierarchy.clone(),
            image: pair.image.clone(),
        });
    }
    let mut img = image::open(&pair.image)
        .map_err(|source| AnnotateError::ImageLoad {
            path: pair.image.clone(),
            source,
        })?
        .to_rgb8();

    let stats = render::draw_hierarchy(&mut img, &root, frame);

    let output = output_dir.join(pair.image_name());
    img.save(&output).map_err(|source| AnnotateError::ImageSave {
        path: output.clone(),
        source,
    })?;

    tracing::debug!(
        image = %pair.image.display(),
        nodes = stats.nodes,
        rectangles = stats.rectangles,
        "annotated screenshot"
    );
    Ok(Annotated {
        pair: pair.clone(),
        output,
        stats,
    })
}

/// Resets the output directory once, then annotates every pair found in
/// the input directory. Per-pair failures are collected under
/// [`FailurePolicy::Skip`] and returned as the error under
/// [`FailurePolicy::Abort`].
pub fn run_batch(options: &BatchOptions) -> AnnotateResult<BatchReport> {
    let Discovery {
        pairs,
        mut unreadable,
    } = discover_pairs(&options.input_dir)?;
    if options.on_error == FailurePolicy::Abort && !unreadable.is_empty() {
        return Err(unreadable.swap_remove(0));
    }
    for error in &unreadable {
        tracing::warn!("skipping unreadable entry: {error}");
    }
    ensure_distinct_dirs(&options.input_dir, &options.output_dir)?;

    let removed = reset_output_dir(&options.output_dir)?;
    tracing::debug!(
        output_dir = %options.output_dir.display(),
        removed,
        "cleared output directory"
    );
    tracing::info!(pairs = pairs.len(), "annotating view hierarchies");

    let outcomes = if options.jobs > 1 {
        run_parallel(&pairs, options)?
    } else {
        run_sequential(&pairs, options)?
    };

    let mut report = BatchReport {
        unreadable,
        ..BatchReport::default()
    };
    for (pair, outcome) in pairs.into_iter().zip(outcomes) {
        match outcome {
            Ok(done) => report.annotated.push(done),
            Err(error) => {
                tracing::warn!(hierarchy = %pair.hierarchy.display(), "skipping pair: {error}");
                report.failed.push(Failed { pair, error });
            }
        }
    }
    Ok(report)
}

type Outcomes = Vec<AnnotateResult<Annotated>>;

fn run_sequential(pairs: &[FilePair], options: &BatchOptions) -> AnnotateResult<Outcomes> {
    let mut outcomes = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let outcome = process_pair(pair, &options.output_dir, options.frame);
        if options.on_error == FailurePolicy::Abort {
            outcomes.push(Ok(outcome?));
        } else {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

fn run_parallel(pairs: &[FilePair], options: &BatchOptions) -> AnnotateResult<Outcomes> {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .build()
    {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!("falling back to the global rayon pool: {err}");
            None
        }
    };
    let work = || -> AnnotateResult<Outcomes> {
        match options.on_error {
            FailurePolicy::Skip => Ok(pairs
                .par_iter()
                .map(|pair| process_pair(pair, &options.output_dir, options.frame))
                .collect()),
            FailurePolicy::Abort => pairs
                .par_iter()
                .map(|pair| process_pair(pair, &options.output_dir, options.frame).map(Ok))
                .collect(),
        }
    };
    match pool {
        Some(pool) => pool.install(work),
        None => work(),
    }
}

fn ensure_distinct_dirs(input_dir: &Path, output_dir: &Path) -> AnnotateResult<()> {
    let Ok(input) = input_dir.canonicalize() else {
        return Ok(());
    };
    let same = output_dir
        .canonicalize()
        .map(|output| output == input)
        .unwrap_or(false);
    if same {
        return Err(AnnotateError::OutputOverlapsInput {
            output: output_dir.to_path_buf(),
        });
    }
    Ok(())
}
