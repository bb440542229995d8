//! Sequence Assembler
//! ==================
//!
//! Encodes rendered frames, in increasing cycle order, into one looping GIF
//! and then deletes the intermediate PNG files.
//!
//! The GIF is encoded in memory and then written and synced in one step,
//! so write errors surface as [`VizError::Encoding`]. Frames are only
//! deleted after that succeeded. On failure the partial GIF is removed and
//! every frame is left on disk for inspection.

use crate::render::RenderedFrame;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use sedlab_env::VizError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Display time of each frame (0.2 s).
pub const FRAME_DELAY_MS: u32 = 200;

/// NeuQuant sampling factor: 1 is slowest/best, 30 fastest.
const QUANTIZER_SPEED: i32 = 10;

/// Returns the path of the animation for a run.
pub fn animation_path(output_dir: &Path, basename: &str) -> PathBuf {
    output_dir.join(format!("{}_animation.gif", basename))
}

/// Encodes `frames` into a GIF at `output` and removes the frame files.
///
/// # Errors
/// * `VizError::Encoding` - `frames` is empty (nothing is written), a frame
///   could not be read or encoded, or the GIF could not be written and synced
///   (partial output removed, frames kept)
pub fn assemble(frames: &[RenderedFrame], output: &Path) -> Result<PathBuf, VizError> {
    if frames.is_empty() {
        return Err(VizError::encoding("no frames rendered, animation cancelled"));
    }

    let mut ordered: Vec<&RenderedFrame> = frames.iter().collect();
    ordered.sort_by_key(|f| f.cycle);

    tracing::info!("Assembling {} frames into {}", ordered.len(), output.display());

    if let Err(e) = encode_gif(&ordered).and_then(|gif| write_synced(&gif, output)) {
        // Only regular files are ours to remove
        if fs::metadata(output).map(|m| m.is_file()).unwrap_or(false) {
            if let Err(rm) = fs::remove_file(output) {
                tracing::warn!("Could not remove partial animation {}: {}", output.display(), rm);
            }
        }
        return Err(e);
    }

    let mut removed = 0;
    for frame in &ordered {
        match fs::remove_file(&frame.path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Could not delete frame {}: {}", frame.path.display(), e),
        }
    }
    tracing::debug!("Removed {}/{} intermediate frames", removed, ordered.len());

    tracing::info!("GIF created: {}", output.display());
    Ok(output.to_path_buf())
}

fn encode_gif(frames: &[&RenderedFrame]) -> Result<Vec<u8>, VizError> {
    let mut buffer = Vec::new();
    {
        // The trailer is written when the encoder drops at the end of this block
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, QUANTIZER_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| VizError::encoding(e.to_string()))?;

        for frame in frames {
            let pixels = image::open(&frame.path)
                .map_err(|e| {
                    VizError::encoding(format!("cannot read frame {}: {}", frame.path.display(), e))
                })?
                .into_rgba8();

            encoder
                .encode_frame(Frame::from_parts(
                    pixels,
                    0,
                    0,
                    Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
                ))
                .map_err(|e| VizError::encoding(format!("cycle {}: {}", frame.cycle, e)))?;
        }
    }
    Ok(buffer)
}

fn write_synced(bytes: &[u8], output: &Path) -> Result<(), VizError> {
    let fail = |e: std::io::Error| VizError::encoding(format!("cannot write {}: {}", output.display(), e));

    let mut file = File::create(output).map_err(fail)?;
    file.write_all(bytes).map_err(fail)?;
    file.sync_all().map_err(fail)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, Rgba, RgbaImage};
    use std::io::BufReader;

    fn write_frame(dir: &Path, cycle: u64, shade: u8) -> RenderedFrame {
        let path = dir.join(format!("f_cycle_{}_visualisation.png", cycle));
        RgbaImage::from_pixel(16, 16, Rgba([shade, shade, shade, 255]))
            .save(&path)
            .unwrap();
        RenderedFrame {
            cycle,
            path,
            points: 0,
        }
    }

    fn decode(path: &Path) -> Vec<image::Frame> {
        let reader = BufReader::new(File::open(path).unwrap());
        GifDecoder::new(reader)
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap()
    }

    #[test]
    fn test_empty_frame_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = animation_path(dir.path(), "f");

        let err = assemble(&[], &output).unwrap_err();
        assert!(matches!(err, VizError::Encoding(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_assemble_orders_by_cycle_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        // Given out of order on purpose
        let frames = vec![
            write_frame(dir.path(), 10, 200),
            write_frame(dir.path(), 2, 0),
            write_frame(dir.path(), 5, 100),
        ];
        let output = animation_path(dir.path(), "f");

        let written = assemble(&frames, &output).unwrap();
        assert_eq!(written, output);
        assert!(frames.iter().all(|f| !f.path.exists()));

        let decoded = decode(&output);
        assert_eq!(decoded.len(), 3);

        let shades: Vec<u8> = decoded.iter().map(|f| f.buffer().get_pixel(8, 8).0[0]).collect();
        assert!(shades[0] < shades[1] && shades[1] < shades[2], "{:?}", shades);

        let (numer, denom) = decoded[0].delay().numer_denom_ms();
        assert_eq!(numer / denom, FRAME_DELAY_MS);
    }

    #[test]
    fn test_encoding_failure_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_frame(dir.path(), 1, 50);
        let broken = RenderedFrame {
            cycle: 2,
            path: dir.path().join("not_a_png.png"),
            points: 0,
        };
        fs::write(&broken.path, b"not an image").unwrap();
        let output = animation_path(dir.path(), "f");

        let err = assemble(&[good.clone(), broken.clone()], &output).unwrap_err();
        assert!(matches!(err, VizError::Encoding(_)));
        assert!(!output.exists());
        assert!(good.path.exists());
        assert!(broken.path.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_failure_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frame = write_frame(dir.path(), 3, 120);

        // Every write to /dev/full fails with ENOSPC
        let err = assemble(std::slice::from_ref(&frame), Path::new("/dev/full")).unwrap_err();
        assert!(matches!(err, VizError::Encoding(_)), "{:?}", err);
        assert!(frame.path.exists());
        assert!(Path::new("/dev/full").exists());
    }

    #[test]
    fn test_unwritable_output_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frame = write_frame(dir.path(), 4, 60);
        let output = dir.path().join("missing").join("f_animation.gif");

        let err = assemble(std::slice::from_ref(&frame), &output).unwrap_err();
        assert!(matches!(err, VizError::Encoding(_)));
        assert!(!output.exists());
        assert!(frame.path.exists());
    }
}
