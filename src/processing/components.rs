// src/processing/components.rs
//! Binary thresholding and connected component counting

use crate::error::{ErrorBuilder, FingerTimerResult};

fn check_dimensions(len: usize, width: usize, height: usize, operation: &str) -> FingerTimerResult<()> {
    match width.checked_mul(height) {
        Some(area) if area == len => Ok(()),
        _ => Err(ErrorBuilder::new("components", operation).mismatch(
            "image buffer",
            format!("{}x{}", width, height),
            len,
        )),
    }
}

/// Set pixels above `level` to 255 and the rest to 0
pub(crate) fn threshold(image: &mut [u8], width: usize, height: usize, level: u8) -> FingerTimerResult<()> {
    check_dimensions(image.len(), width, height, "threshold")?;
    for pixel in image.iter_mut() {
        *pixel = if *pixel > level { 255 } else { 0 };
    }
    Ok(())
}

/// Count 4-connected regions of non-zero pixels
///
/// Uses an explicit work-list. Each pixel is pushed at most once, so the list
/// never holds more than `width * height` entries.
pub(crate) fn count_connected_components(binary: &[u8], width: usize, height: usize) -> FingerTimerResult<usize> {
    check_dimensions(binary.len(), width, height, "count_connected_components")?;

    let mut visited = vec![false; binary.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut components = 0;

    for start in 0..binary.len() {
        if binary[start] == 0 || visited[start] {
            continue;
        }

        components += 1;
        visited[start] = true;
        stack.push(start);

        while let Some(index) = stack.pop() {
            let (x, y) = (index % width, index / width);
            let neighbours = [
                (x > 0).then(|| index - 1),
                (x + 1 < width).then(|| index + 1),
                (y > 0).then(|| index - width),
                (y + 1 < height).then(|| index + width),
            ];

            for next in neighbours.into_iter().flatten() {
                if binary[next] != 0 && !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
    }

    Ok(components)
}
