use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::network::ValueFunction;
use crate::error::AgentError;

/// Architecture fingerprint stored next to the weights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub parameter_shapes: Vec<Vec<usize>>,
    pub version: String,
}

/// On-disk envelope: policy parameters only, no optimizer or replay state.
#[derive(Serialize, Deserialize)]
pub struct PolicyCheckpoint {
    pub metadata: CheckpointMetadata,
    pub weights: Vec<u8>,
}

pub fn encode_policy<B, M>(model: &M) -> Result<Vec<u8>, AgentError>
where
    B: Backend,
    M: ValueFunction<B>,
{
    let metadata = CheckpointMetadata {
        parameter_shapes: model.parameter_shapes(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let weights =
        BinBytesRecorder::<FullPrecisionSettings>::new().record(model.clone().into_record(), ())?;
    let checkpoint = PolicyCheckpoint { metadata, weights };
    Ok(bincode::serde::encode_to_vec(
        &checkpoint,
        bincode::config::standard(),
    )?)
}

/// Loads parameters into `model`. Shapes are checked before any tensor is
/// touched, so a mismatched checkpoint leaves nothing half-loaded.
pub fn decode_policy<B, M>(model: M, bytes: &[u8], device: &B::Device) -> Result<M, AgentError>
where
    B: Backend,
    M: ValueFunction<B>,
{
    let (checkpoint, _): (PolicyCheckpoint, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    let expected = model.parameter_shapes();
    if checkpoint.metadata.parameter_shapes != expected {
        return Err(AgentError::CheckpointMismatch {
            expected: format!("{expected:?}"),
            found: format!("{:?}", checkpoint.metadata.parameter_shapes),
        });
    }
    let record = BinBytesRecorder::<FullPrecisionSettings>::new()
        .load::<<M as Module<B>>::Record>(checkpoint.weights, device)?;
    Ok(model.load_record(record))
}

/// Writes the policy to `path`, replacing any previous checkpoint.
pub fn save_policy<B, M>(model: &M, path: &Path) -> Result<(), AgentError>
where
    B: Backend,
    M: ValueFunction<B>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let bytes = encode_policy::<B, M>(model)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_policy<B, M>(model: M, path: &Path, device: &B::Device) -> Result<M, AgentError>
where
    B: Backend,
    M: ValueFunction<B>,
{
    let bytes = fs::read(path)?;
    decode_policy::<B, M>(model, &bytes, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;

    use crate::ml::network::QNetworkConfig;

    type Backend = NdArray<f32>;

    #[test]
    fn round_trip_restores_outputs() {
        let device = Default::default();
        let config = QNetworkConfig::new(3, 3, 3, 4).with_hidden(8);
        let source = config.init::<Backend>(&device);
        let bytes = encode_policy::<Backend, _>(&source).expect("encode");
        let fresh = config.init::<Backend>(&device);
        let restored = decode_policy::<Backend, _>(fresh, &bytes, &device).expect("decode");
        let input = Tensor::<Backend, 4>::ones([2, 3, 3, 3], &device);
        let a = source.forward(input.clone()).into_data().to_vec::<f32>().expect("data");
        let b = restored.forward(input).into_data().to_vec::<f32>().expect("data");
        assert_eq!(a, b);
    }

    #[test]
    fn mismatched_architecture_is_refused() {
        let device = Default::default();
        let source = QNetworkConfig::new(3, 3, 3, 4)
            .with_hidden(8)
            .init::<Backend>(&device);
        let bytes = encode_policy::<Backend, _>(&source).expect("encode");
        let other = QNetworkConfig::new(3, 3, 3, 5)
            .with_hidden(8)
            .init::<Backend>(&device);
        assert!(matches!(
            decode_policy::<Backend, _>(other, &bytes, &device),
            Err(AgentError::CheckpointMismatch { .. })
        ));
    }
}
