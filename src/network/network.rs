use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::math::matrix::Matrix;
use crate::optim::sgd::Optimizer;

/// An ordered stack of layers run as one differentiable pipeline.
///
/// The network owns its layers; they are only ever appended. Forward runs in
/// append order, backward in reverse.
#[derive(Debug, Default)]
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

impl Network {
    pub fn new() -> Network {
        Network { layers: Vec::new() }
    }

    /// Appends `layer`; the network takes ownership.
    pub fn add_layer<L: Layer + 'static>(&mut self, layer: L) {
        self.layers.push(Box::new(layer));
    }

    /// Builder-style `add_layer`.
    pub fn with_layer<L: Layer + 'static>(mut self, layer: L) -> Network {
        self.add_layer(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Forward pass; every layer caches what its backward needs.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Backward pass from ∂L/∂output of the last forward. Returns ∂L/∂input
    /// of the first layer.
    pub fn backward(&mut self, output_gradient: &Matrix) -> Result<Matrix> {
        let mut gradient = output_gradient.clone();
        for layer in self.layers.iter_mut().rev() {
            gradient = layer.backward(&gradient)?;
        }
        Ok(gradient)
    }

    pub fn update(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        for layer in &mut self.layers {
            layer.update(optimizer)?;
        }
        Ok(())
    }

    /// Writes every layer's parameters in append order. The stream carries no
    /// layer tags: it can only be read back by a network with the same
    /// layer sequence.
    pub fn save(&self, writer: &mut dyn Write) -> Result<()> {
        for layer in &self.layers {
            layer.save(writer)?;
        }
        Ok(())
    }

    /// Reads every layer's parameters in append order, then checks that the
    /// loaded widths chain and that the stream is fully consumed.
    ///
    /// On any error the network keeps the parameters it had before the call.
    pub fn load(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut snapshot = Vec::new();
        self.save(&mut snapshot)?;

        if let Err(e) = self.load_records(reader) {
            let mut restore = snapshot.as_slice();
            for layer in &mut self.layers {
                layer.load(&mut restore)?;
            }
            return Err(e);
        }
        Ok(())
    }

    fn load_records(&mut self, reader: &mut dyn Read) -> Result<()> {
        for layer in &mut self.layers {
            layer.load(reader)?;
        }

        if let Err(e) = self.check_chain() {
            warn!(error = %e, "loaded model does not chain");
            return Err(Error::ModelFormat(e.to_string()));
        }

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(Error::ModelFormat(
                "trailing data after the last layer; the file was saved from a different architecture"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        debug!(path = %path.display(), layers = self.len(), "model saved");
        Ok(())
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        self.load(&mut reader)?;
        debug!(path = %path.display(), layers = self.len(), "model loaded");
        Ok(())
    }

    /// Checks that each fixed-width layer's input size equals the output size
    /// of the previous fixed-width layer.
    pub fn check_chain(&self) -> Result<()> {
        let mut previous: Option<(usize, usize)> = None;
        for (i, dims) in self.layers.iter().filter_map(|l| l.dims()).enumerate() {
            if let Some((_, prev_out)) = previous {
                if prev_out != dims.0 {
                    return Err(Error::ShapeMismatch {
                        context: "Network::check_chain",
                        expected: format!("input width {} for fixed-width layer #{}", prev_out, i),
                        got: dims.0.to_string(),
                    });
                }
            }
            previous = Some(dims);
        }
        Ok(())
    }

    /// One-line description, e.g. `dense(784->512) -> relu -> dense(512->10) -> softmax`.
    pub fn summary(&self) -> String {
        self.layers.iter().map(|l| l.name()).collect::<Vec<_>>().join(" -> ")
    }
}
