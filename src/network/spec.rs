use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::activation::ActivationKind;
use crate::error::{Error, Result};
use crate::layers::{ActivationLayer, DenseLayer};
use crate::network::network::Network;

/// Describes one layer in a network specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    /// Fully-connected layer `input_size → output_size`.
    Dense { input_size: usize, output_size: usize },
    /// Pointwise activation; `kind` is `"relu"` or `"softmax"`.
    Activation { kind: ActivationKind },
}

/// A serializable description of a network architecture.
///
/// The model file written by `Network::save` carries no layer tags, so the
/// spec used to build a network is what makes its parameters loadable later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Human-readable name, used in logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
}

fn default_name() -> String {
    "model".to_owned()
}

impl NetworkSpec {
    /// The MNIST classifier: 784 → 512 → 512 → 512 → 512 → 10, ReLU after
    /// every hidden dense layer and softmax on top.
    pub fn mnist() -> NetworkSpec {
        let widths = [784, 512, 512, 512, 512, 10];
        let mut layers = Vec::new();
        for pair in widths.windows(2) {
            layers.push(LayerSpec::Dense { input_size: pair[0], output_size: pair[1] });
            layers.push(LayerSpec::Activation { kind: ActivationKind::Relu });
        }
        if let Some(last) = layers.last_mut() {
            *last = LayerSpec::Activation { kind: ActivationKind::Softmax };
        }
        NetworkSpec { name: "mnist".to_owned(), layers }
    }

    /// Checks that the spec is non-empty, has no zero-width dense layer and
    /// that consecutive dense layers chain.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::ModelFormat(format!("network spec '{}' has no layers", self.name)));
        }
        let mut previous_out: Option<usize> = None;
        for layer in &self.layers {
            if let LayerSpec::Dense { input_size, output_size } = *layer {
                if input_size == 0 || output_size == 0 {
                    return Err(Error::ModelFormat(format!(
                        "dense layer {}x{} has a zero dimension",
                        input_size, output_size
                    )));
                }
                if let Some(prev) = previous_out {
                    if prev != input_size {
                        return Err(Error::ShapeMismatch {
                            context: "NetworkSpec::validate",
                            expected: format!("dense input width {}", prev),
                            got: input_size.to_string(),
                        });
                    }
                }
                previous_out = Some(output_size);
            }
        }
        Ok(())
    }

    /// Width of the first dense layer's input, if any.
    pub fn input_size(&self) -> Option<usize> {
        self.layers.iter().find_map(|l| match l {
            LayerSpec::Dense { input_size, .. } => Some(*input_size),
            LayerSpec::Activation { .. } => None,
        })
    }

    /// Width of the last dense layer's output, if any.
    pub fn output_size(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(|l| match l {
            LayerSpec::Dense { output_size, .. } => Some(*output_size),
            LayerSpec::Activation { .. } => None,
        })
    }

    /// Validates the spec and constructs a freshly initialized network.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        self.validate()?;
        let mut network = Network::new();
        for layer in &self.layers {
            match *layer {
                LayerSpec::Dense { input_size, output_size } => {
                    network.add_layer(DenseLayer::new(input_size, output_size, rng))
                }
                LayerSpec::Activation { kind } => network.add_layer(ActivationLayer::new(kind)),
            }
        }
        debug!(name = %self.name, summary = %network.summary(), "network built");
        Ok(network)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn mnist_spec_matches_reference_architecture() {
        let spec = NetworkSpec::mnist();
        assert_eq!(spec.layers.len(), 10);
        assert_eq!(spec.input_size(), Some(784));
        assert_eq!(spec.output_size(), Some(10));
        assert_eq!(spec.layers[1], LayerSpec::Activation { kind: ActivationKind::Relu });
        assert_eq!(spec.layers[9], LayerSpec::Activation { kind: ActivationKind::Softmax });
        spec.validate().unwrap();
    }

    #[test]
    fn parses_tagged_json() {
        let json = r#"{
            "name": "tiny",
            "layers": [
                {"type": "dense", "input_size": 2, "output_size": 3},
                {"type": "activation", "kind": "relu"},
                {"type": "dense", "input_size": 3, "output_size": 2},
                {"type": "activation", "kind": "softmax"}
            ]
        }"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let net = spec.build(&mut rng).unwrap();
        assert_eq!(net.summary(), "dense(2->3) -> relu -> dense(3->2) -> softmax");
    }

    #[test]
    fn unknown_activation_in_json_is_rejected() {
        let json = r#"{"layers": [{"type": "activation", "kind": "tanh"}]}"#;
        assert!(serde_json::from_str::<NetworkSpec>(json).is_err());
    }

    #[test]
    fn validate_rejects_broken_chain() {
        let spec = NetworkSpec {
            name: "broken".to_owned(),
            layers: vec![
                LayerSpec::Dense { input_size: 4, output_size: 3 },
                LayerSpec::Dense { input_size: 2, output_size: 1 },
            ],
        };
        assert!(matches!(spec.validate(), Err(Error::ShapeMismatch { .. })));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(spec.build(&mut rng).is_err());
    }
}
