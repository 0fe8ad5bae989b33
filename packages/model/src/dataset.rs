//! CSV training data loading.
//!
//! The file must have a header row containing every model feature name
//! plus a `risk_score` column. Extra columns are ignored.

use std::{io::Read, path::Path};

use terra_insight_risk_models::MODEL_FEATURES;

use crate::ModelError;

/// Name of the label column.
pub const LABEL_COLUMN: &str = "risk_score";

/// One labelled training row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    /// Raw feature values in model feature order.
    pub features: Vec<f64>,
    /// Target risk score in `[0, 100]`.
    pub risk_score: f64,
}

/// Loads training samples from a CSV file.
///
/// # Errors
///
/// Returns [`ModelError`] if the file cannot be read, a required column
/// is missing, or a cell is not a number.
pub fn load_csv(path: &Path) -> Result<Vec<TrainingSample>, ModelError> {
    let file = std::fs::File::open(path)?;
    let samples = from_reader(file)?;
    log::info!(
        "Loaded {} training samples from {}",
        samples.len(),
        path.display()
    );
    Ok(samples)
}

/// Parses training samples from any CSV source.
///
/// # Errors
///
/// Returns [`ModelError`] if a required column is missing or a cell is
/// not a number.
pub fn from_reader<R: Read>(reader: R) -> Result<Vec<TrainingSample>, ModelError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ModelError::Dataset {
                message: format!("missing column '{name}'"),
            })
    };

    let feature_columns = MODEL_FEATURES
        .iter()
        .map(|f| column(f.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let label_column = column(LABEL_COLUMN)?;

    let mut samples = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |idx: usize| -> Result<f64, ModelError> {
            let raw = record.get(idx).unwrap_or_default().trim();
            let column = headers.get(idx).unwrap_or_default();
            let value: f64 = raw.parse().map_err(|e| ModelError::Dataset {
                message: format!(
                    "row {}: column '{column}' value '{raw}' is not a number: {e}",
                    row + 1
                ),
            })?;
            if !value.is_finite() {
                return Err(ModelError::Dataset {
                    message: format!(
                        "row {}: column '{column}' value '{raw}' is not finite",
                        row + 1
                    ),
                });
            }
            Ok(value)
        };

        samples.push(TrainingSample {
            features: feature_columns
                .iter()
                .map(|idx| cell(*idx))
                .collect::<Result<_, _>>()?,
            risk_score: cell(label_column)?,
        });
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        let mut cols: Vec<&str> = MODEL_FEATURES.iter().map(AsRef::as_ref).collect();
        cols.reverse();
        cols.push("notes");
        cols.push(LABEL_COLUMN);
        cols.join(",")
    }

    #[test]
    fn reorders_columns_into_model_feature_order() {
        // Columns are reversed, so the first value belongs to historical_fires.
        let values: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        let csv = format!("{}\n{},ignored,72.5\n", header(), values.join(","));

        let samples = from_reader(csv.as_bytes()).unwrap();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].features[0] - 14.0).abs() < f64::EPSILON);
        assert!((samples[0].features[14] - 0.0).abs() < f64::EPSILON);
        assert!((samples[0].risk_score - 72.5).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = from_reader("ndvi,risk_score\n0.5,10\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing column 'ndmi'"), "{err}");
    }

    #[test]
    fn non_numeric_cell_is_reported_with_row() {
        let values: Vec<&str> = std::iter::repeat_n("1", 15).collect();
        let csv = format!(
            "{}\n{},x,50\n{},x,dry\n",
            header(),
            values.join(","),
            values.join(",")
        );
        let err = from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
        assert!(err.to_string().contains("risk_score"), "{err}");
    }

    #[test]
    fn non_finite_cells_are_rejected() {
        let mut values: Vec<&str> = std::iter::repeat_n("1", 15).collect();
        values[3] = "NaN";
        let csv = format!("{}\n{},x,50\n", header(), values.join(","));
        let err = from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("not finite"), "{err}");
        assert!(err.to_string().contains("row 1"), "{err}");

        let values: Vec<&str> = std::iter::repeat_n("1", 15).collect();
        let csv = format!("{}\n{},x,inf\n", header(), values.join(","));
        let err = from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("risk_score"), "{err}");
    }
}
