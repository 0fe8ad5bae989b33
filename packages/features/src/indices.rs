//! Band math and elevation-grid math used by imagery and terrain sources.

use terra_insight_features_models::{
    ElevationGrid, SpectralBands, TerrainFeatures, VegetationIndices,
};

use crate::FeatureError;

/// Guards normalized-difference ratios against division by zero.
const RATIO_EPSILON: f64 = 1e-10;

/// NDVI above which a pixel counts as vegetated.
const VEGETATED_NDVI: f64 = 0.3;

/// Computes mean NDVI/NDMI, fuel moisture and vegetation cover.
///
/// NaN pixels are skipped when averaging.
///
/// # Errors
///
/// * [`FeatureError::EmptyRaster`] if the bands are empty or every pixel
///   is NaN
/// * [`FeatureError::BandMismatch`] if the bands differ in length
#[allow(clippy::cast_precision_loss)]
pub fn vegetation_indices(bands: &SpectralBands) -> Result<VegetationIndices, FeatureError> {
    let pixels = bands.nir.len();
    if pixels == 0 {
        return Err(FeatureError::EmptyRaster);
    }
    if bands.red.len() != pixels || bands.swir.len() != pixels {
        return Err(FeatureError::BandMismatch {
            nir: pixels,
            red: bands.red.len(),
            swir: bands.swir.len(),
        });
    }

    let ndvi: Vec<f64> = normalized_difference(&bands.nir, &bands.red).collect();
    let ndmi: Vec<f64> = normalized_difference(&bands.nir, &bands.swir).collect();

    let ndvi_mean = nan_mean(&ndvi).ok_or(FeatureError::EmptyRaster)?;
    let ndmi_mean = nan_mean(&ndmi).ok_or(FeatureError::EmptyRaster)?;

    let vegetated = ndvi.iter().filter(|v| **v > VEGETATED_NDVI).count();

    Ok(VegetationIndices {
        ndvi: ndvi_mean,
        ndmi: ndmi_mean,
        fuel_moisture: 100.0 * (1.0 - (-2.0 * ndmi_mean).exp()),
        vegetation_cover: Some(vegetated as f64 / pixels as f64),
    })
}

fn normalized_difference<'a>(a: &'a [f64], b: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    a.iter()
        .zip(b)
        .map(|(a, b)| (a - b) / (a + b + RATIO_EPSILON))
}

#[allow(clippy::cast_precision_loss)]
fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Derives mean elevation, slope and aspect from an elevation grid.
///
/// Gradients use central differences in the interior and one-sided
/// differences on the edges. `dx` runs along rows and `dy` along
/// columns. When `mask` is given, only cells where it is `true` are
/// aggregated.
///
/// Non-finite elevations are nodata: they are left out of the elevation
/// statistics, and so is any slope or aspect whose gradient touches one.
///
/// # Errors
///
/// * [`FeatureError::InvalidRaster`] if the grid is smaller than 2x2, its
///   values do not match its dimensions, or the mask has the wrong length
/// * [`FeatureError::EmptyRaster`] if no selected cell has a finite
///   elevation and gradient
#[allow(clippy::cast_precision_loss)]
pub fn terrain_features(
    grid: &ElevationGrid,
    mask: Option<&[bool]>,
) -> Result<TerrainFeatures, FeatureError> {
    if grid.rows < 2 || grid.cols < 2 {
        return Err(FeatureError::InvalidRaster {
            message: format!(
                "grid must be at least 2x2, got {}x{}",
                grid.rows, grid.cols
            ),
        });
    }
    if grid.values.len() != grid.rows * grid.cols {
        return Err(FeatureError::InvalidRaster {
            message: format!(
                "expected {} values for a {}x{} grid, got {}",
                grid.rows * grid.cols,
                grid.rows,
                grid.cols,
                grid.values.len()
            ),
        });
    }
    if let Some(mask) = mask
        && mask.len() != grid.values.len()
    {
        return Err(FeatureError::InvalidRaster {
            message: format!(
                "mask has {} cells, grid has {}",
                mask.len(),
                grid.values.len()
            ),
        });
    }

    let mut elevations = Vec::new();
    let mut slopes = Vec::new();
    let mut aspects = Vec::new();

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let idx = row * grid.cols + col;
            if mask.is_some_and(|m| !m[idx]) {
                continue;
            }

            let elevation = grid.values[idx];
            if elevation.is_finite() {
                elevations.push(elevation);
            }

            let dx = gradient(grid.rows, row, |r| grid.at(r, col));
            let dy = gradient(grid.cols, col, |c| grid.at(row, c));
            if dx.is_finite() && dy.is_finite() {
                slopes.push(dx.hypot(dy).atan().to_degrees());
                aspects.push(dy.atan2(dx).to_degrees());
            }
        }
    }

    if elevations.is_empty() || slopes.is_empty() {
        return Err(FeatureError::EmptyRaster);
    }

    let mean_elevation = mean(&elevations);
    let variance = elevations
        .iter()
        .map(|e| (e - mean_elevation).powi(2))
        .sum::<f64>()
        / elevations.len() as f64;

    Ok(TerrainFeatures {
        elevation: mean_elevation,
        slope: mean(&slopes),
        aspect: mean(&aspects),
        terrain_ruggedness: Some(variance.sqrt()),
    })
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// First derivative at `i` along an axis of length `len` (`len >= 2`).
fn gradient(len: usize, i: usize, value: impl Fn(usize) -> f64) -> f64 {
    if i == 0 {
        value(1) - value(0)
    } else if i == len - 1 {
        value(i) - value(i - 1)
    } else {
        (value(i + 1) - value(i - 1)) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_dry_vegetation_indices() {
        let bands = SpectralBands {
            nir: vec![0.5, 0.5, 0.1, f64::NAN],
            red: vec![0.1, 0.1, 0.1, 0.1],
            swir: vec![0.3, 0.3, 0.3, 0.3],
        };
        let indices = vegetation_indices(&bands).unwrap();

        // (0.5 - 0.1) / 0.6 twice, 0.0 once; the NaN pixel is skipped.
        assert!((indices.ndvi - (2.0 * (0.4 / 0.6)) / 3.0).abs() < 1e-9);
        assert_eq!(indices.vegetation_cover, Some(0.5));

        let expected_ndmi = (2.0 * 0.25 + (-0.5)) / 3.0;
        assert!((indices.ndmi - expected_ndmi).abs() < 1e-9);

        // The fuel curve amplifies the ratio epsilon, so rebuild NDMI with it.
        let expected_ndmi =
            (2.0 * (0.2 / (0.8 + RATIO_EPSILON)) - 0.2 / (0.4 + RATIO_EPSILON)) / 3.0;
        let expected_moisture = 100.0 * (1.0 - (-2.0 * expected_ndmi).exp());
        assert!((indices.fuel_moisture - expected_moisture).abs() < 1e-9);
    }

    #[test]
    fn mismatched_bands_are_rejected() {
        let bands = SpectralBands {
            nir: vec![0.5, 0.5],
            red: vec![0.1],
            swir: vec![0.3, 0.3],
        };
        assert!(matches!(
            vegetation_indices(&bands),
            Err(FeatureError::BandMismatch {
                nir: 2,
                red: 1,
                swir: 2
            })
        ));
    }

    #[test]
    fn empty_bands_are_rejected() {
        let bands = SpectralBands {
            nir: vec![],
            red: vec![],
            swir: vec![],
        };
        assert!(matches!(
            vegetation_indices(&bands),
            Err(FeatureError::EmptyRaster)
        ));
    }

    #[test]
    fn planar_ramp_has_uniform_slope() {
        // Rises 2 m per row, flat across columns.
        let grid = ElevationGrid {
            rows: 3,
            cols: 3,
            values: vec![0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 4.0, 4.0, 4.0],
        };
        let terrain = terrain_features(&grid, None).unwrap();

        assert!((terrain.elevation - 2.0).abs() < 1e-9);
        assert!((terrain.slope - 2.0_f64.atan().to_degrees()).abs() < 1e-9);
        assert!(terrain.aspect.abs() < 1e-9);
        let expected_std = (8.0_f64 / 3.0).sqrt();
        assert!((terrain.terrain_ruggedness.unwrap() - expected_std).abs() < 1e-9);
    }

    #[test]
    fn mask_limits_aggregation() {
        let grid = ElevationGrid {
            rows: 2,
            cols: 2,
            values: vec![100.0, 100.0, 300.0, 300.0],
        };
        let mask = [false, false, true, true];
        let terrain = terrain_features(&grid, Some(&mask)).unwrap();
        assert!((terrain.elevation - 300.0).abs() < 1e-9);
        assert_eq!(terrain.terrain_ruggedness, Some(0.0));

        let nothing = [false; 4];
        assert!(matches!(
            terrain_features(&grid, Some(&nothing)),
            Err(FeatureError::EmptyRaster)
        ));
    }

    #[test]
    fn nodata_cells_are_skipped() {
        // Same ramp as above with one corner missing.
        let grid = ElevationGrid {
            rows: 3,
            cols: 3,
            values: vec![f64::NAN, 0.0, 0.0, 2.0, 2.0, 2.0, 4.0, 4.0, 4.0],
        };
        let terrain = terrain_features(&grid, None).unwrap();

        assert!((terrain.elevation - 18.0 / 8.0).abs() < 1e-9);
        assert!(terrain.slope.is_finite());
        assert!(terrain.aspect.is_finite());
        assert!(terrain.terrain_ruggedness.is_some_and(f64::is_finite));

        let all_missing = ElevationGrid {
            rows: 2,
            cols: 2,
            values: vec![f64::NAN; 4],
        };
        assert!(matches!(
            terrain_features(&all_missing, None),
            Err(FeatureError::EmptyRaster)
        ));
    }

    #[test]
    fn degenerate_grids_are_rejected() {
        let single_row = ElevationGrid {
            rows: 1,
            cols: 3,
            values: vec![1.0, 2.0, 3.0],
        };
        assert!(matches!(
            terrain_features(&single_row, None),
            Err(FeatureError::InvalidRaster { .. })
        ));

        let short = ElevationGrid {
            rows: 2,
            cols: 2,
            values: vec![1.0, 2.0, 3.0],
        };
        assert!(matches!(
            terrain_features(&short, None),
            Err(FeatureError::InvalidRaster { .. })
        ));
    }
}
