//! Image text extraction using `pure-onnx-ocr`.
//!
//! The engine is not `Send`, so it lives on a dedicated worker thread and
//! extractors submit jobs to it over a channel.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use super::TextExtractor;
use crate::error::{DocumentError, OcrError};
use crate::models::config::OcrConfig;

/// A recognised line of text with its position.
#[derive(Debug, Clone)]
struct TextLine {
    /// Axis-aligned bounds (min_x, min_y, max_x, max_y).
    rect: (f32, f32, f32, f32),
    text: String,
}

/// One recognition request for the worker.
struct OcrJob {
    image: DynamicImage,
    reply: mpsc::Sender<Result<Vec<TextLine>, OcrError>>,
}

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Jobs are served one at a time by the worker; the worker exits when the
/// last extractor handle is dropped.
pub struct OcrTextExtractor {
    jobs: mpsc::Sender<OcrJob>,
    keep_unk: bool,
}

impl OcrTextExtractor {
    /// Start a worker with model files from a directory.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing {}", path.display())));
            }
        }

        let (jobs, queue) = mpsc::channel::<OcrJob>();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("ocr-worker".to_string())
            .spawn(move || {
                let engine = match build_engine(&det_path, &rec_path, &dict_path) {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for job in queue {
                    let lines = engine
                        .run_from_image(&job.image)
                        .map(|results| {
                            results
                                .iter()
                                .map(|r| TextLine {
                                    rect: polygon_rect(&r.bounding_box),
                                    text: r.text.clone(),
                                })
                                .collect()
                        })
                        .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)));
                    let _ = job.reply.send(lines);
                }
                debug!("OCR worker stopped");
            })
            .map_err(|e| OcrError::ModelLoad(format!("failed to start OCR worker: {}", e)))?;

        ready_rx
            .recv()
            .map_err(|_| OcrError::ModelLoad("OCR worker exited during startup".to_string()))??;

        info!("Loaded OCR engine from {}", model_dir.display());

        Ok(Self {
            jobs,
            keep_unk: config.keep_unk,
        })
    }

    /// Recognise text in an image, lines in reading order.
    ///
    /// Blocks until the worker has processed the image.
    pub fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Running OCR on {}x{} image", width, height);

        let (reply, response) = mpsc::channel();
        self.jobs
            .send(OcrJob {
                image: image.clone(),
                reply,
            })
            .map_err(|_| worker_gone())?;
        let mut lines = response.recv().map_err(|_| worker_gone())??;

        if !self.keep_unk {
            for line in &mut lines {
                line.text = line.text.replace("[UNK]", " ");
            }
        }
        sort_reading_order(&mut lines);

        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            "OCR complete: {} text lines in {}ms",
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

fn build_engine(
    det_path: &Path,
    rec_path: &Path,
    dict_path: &Path,
) -> Result<pure_onnx_ocr::engine::OcrEngine, OcrError> {
    pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(det_path)
        .rec_model_path(rec_path)
        .dictionary_path(dict_path)
        .build()
        .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))
}

fn worker_gone() -> OcrError {
    warn!("OCR worker is no longer running");
    OcrError::Recognition("OCR worker stopped".to_string())
}

impl TextExtractor for OcrTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, DocumentError> {
        let image = image::load_from_memory(data)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        Ok(self.recognize(&image)?)
    }
}

/// Sort top-to-bottom in 20px rows, then left-to-right.
fn sort_reading_order(lines: &mut [TextLine]) {
    lines.sort_by(|a, b| {
        let row_a = (a.rect.1 / 20.0) as i32;
        let row_b = (b.rect.1 / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.rect
                .0
                .partial_cmp(&b.rect.0)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}

/// Axis-aligned bounds of the first four exterior points of a polygon.
fn polygon_rect(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f32, f32, f32, f32) {
    polygon.exterior().coords().take(4).fold(
        (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), c| {
            let (x, y) = (c.x as f32, c.y as f32);
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    )
}
