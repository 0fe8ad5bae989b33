//! Matched-pair persistence of the network and its scaler.
//!
//! Both files carry the same artifact id. Loading refuses a directory
//! where either half is missing or the ids differ.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelMetadata, network::DenseNetwork, scaler::StandardScaler};

/// File name of the serialized network and metadata.
pub const MODEL_FILE: &str = "wildfire_risk_model.json";

/// File name of the serialized scaler parameters.
pub const SCALER_FILE: &str = "scaler_params.json";

#[derive(Serialize, Deserialize)]
struct ModelArtifact {
    artifact_id: String,
    metadata: ModelMetadata,
    network: DenseNetwork,
}

#[derive(Serialize, Deserialize)]
struct ScalerArtifact {
    artifact_id: String,
    #[serde(flatten)]
    scaler: StandardScaler,
}

/// Writes the network, metadata and scaler to `dir` as a matched pair.
///
/// Returns the artifact id shared by both files.
///
/// # Errors
///
/// * [`ModelError::NonFiniteParameters`] if the network or scaler holds
///   NaN or infinity; nothing is written in that case
/// * [`ModelError::Io`] if the directory cannot be created or either file
///   cannot be written
pub fn save(
    dir: &Path,
    network: &DenseNetwork,
    scaler: &StandardScaler,
    metadata: &ModelMetadata,
) -> Result<String, ModelError> {
    if !scaler.is_finite() {
        return Err(ModelError::NonFiniteParameters { artifact: "scaler" });
    }
    if !network.is_finite() {
        return Err(ModelError::NonFiniteParameters { artifact: "network" });
    }

    std::fs::create_dir_all(dir)?;
    let artifact_id = uuid::Uuid::new_v4().to_string();

    write_json(
        &dir.join(SCALER_FILE),
        &ScalerArtifact {
            artifact_id: artifact_id.clone(),
            scaler: scaler.clone(),
        },
    )?;
    write_json(
        &dir.join(MODEL_FILE),
        &ModelArtifact {
            artifact_id: artifact_id.clone(),
            metadata: metadata.clone(),
            network: network.clone(),
        },
    )?;

    Ok(artifact_id)
}

/// Reads a matched pair from `dir`.
///
/// # Errors
///
/// * [`ModelError::MissingArtifact`] if either file is absent
/// * [`ModelError::ArtifactMismatch`] if the files come from different
///   saves
/// * [`ModelError::Serialization`] if either file is malformed
pub fn load(dir: &Path) -> Result<(DenseNetwork, StandardScaler, ModelMetadata), ModelError> {
    let model: ModelArtifact = read_json(&dir.join(MODEL_FILE))?;
    let scaler: ScalerArtifact = read_json(&dir.join(SCALER_FILE))?;

    if model.artifact_id != scaler.artifact_id {
        return Err(ModelError::ArtifactMismatch {
            model_id: model.artifact_id,
            scaler_id: scaler.artifact_id,
        });
    }

    Ok((model.network, scaler.scaler, model.metadata))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ModelError> {
    if !path.exists() {
        return Err(ModelError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (DenseNetwork, StandardScaler, ModelMetadata) {
        let network = DenseNetwork::with_hidden_layers(2, &[(3, 0.0)], 4);
        let scaler = StandardScaler {
            mean: vec![1.0, 2.0],
            scale: vec![0.5, 4.0],
        };
        (network, scaler, ModelMetadata::default())
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn save_then_load_restores_both_halves() {
        let dir = temp_dir("terra_insight_persistence_roundtrip");
        let (network, scaler, metadata) = fixture();

        save(&dir, &network, &scaler, &metadata).unwrap();
        let (loaded_network, loaded_scaler, loaded_metadata) = load(&dir).unwrap();

        assert_eq!(loaded_network, network);
        assert_eq!(loaded_scaler, scaler);
        assert_eq!(loaded_metadata, metadata);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn scaler_from_another_save_is_rejected() {
        let first = temp_dir("terra_insight_persistence_first");
        let second = temp_dir("terra_insight_persistence_second");
        let (network, scaler, metadata) = fixture();

        save(&first, &network, &scaler, &metadata).unwrap();
        save(&second, &network, &scaler, &metadata).unwrap();
        std::fs::copy(second.join(SCALER_FILE), first.join(SCALER_FILE)).unwrap();

        assert!(matches!(
            load(&first),
            Err(ModelError::ArtifactMismatch { .. })
        ));

        let _ = std::fs::remove_dir_all(&first);
        let _ = std::fs::remove_dir_all(&second);
    }

    #[test]
    fn non_finite_parameters_are_not_written() {
        let dir = temp_dir("terra_insight_persistence_non_finite");
        let (mut network, mut scaler, metadata) = fixture();

        scaler.mean[1] = f64::NAN;
        assert!(matches!(
            save(&dir, &network, &scaler, &metadata),
            Err(ModelError::NonFiniteParameters { artifact: "scaler" })
        ));

        scaler.mean[1] = 2.0;
        network.layers[0].weights[0][0] = f64::INFINITY;
        assert!(matches!(
            save(&dir, &network, &scaler, &metadata),
            Err(ModelError::NonFiniteParameters { artifact: "network" })
        ));

        assert!(!dir.exists());
    }

    #[test]
    fn missing_scaler_is_rejected() {
        let dir = temp_dir("terra_insight_persistence_missing");
        let (network, scaler, metadata) = fixture();

        save(&dir, &network, &scaler, &metadata).unwrap();
        std::fs::remove_file(dir.join(SCALER_FILE)).unwrap();

        match load(&dir) {
            Err(ModelError::MissingArtifact { path }) => assert!(path.ends_with(SCALER_FILE)),
            other => panic!("expected MissingArtifact, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
