//! Training instance writers

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tlink_core::{DataWriter, Instance, Result, TlinkError};

/// Writes one JSON object per instance and line
pub struct JsonlDataWriter<W: Write + Send> {
    out: BufWriter<W>,
    written: usize,
}

impl<W: Write + Send> JsonlDataWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|e| TlinkError::DataWriter(e.error().to_string()))
    }
}

impl JsonlDataWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Send> DataWriter for JsonlDataWriter<W> {
    fn write(&mut self, instance: Instance) -> Result<()> {
        serde_json::to_writer(&mut self.out, &instance)
            .map_err(|e| TlinkError::DataWriter(e.to_string()))?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// In-memory writer. Clones share the same buffer, so a caller can keep a
/// handle after moving the writer into an annotator.
#[derive(Debug, Clone, Default)]
pub struct InstanceBuffer {
    instances: Arc<Mutex<Vec<Instance>>>,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn instances(&self) -> Vec<Instance> {
        self.instances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels in write order
    pub fn labels(&self) -> Vec<String> {
        self.instances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|i| i.label.clone())
            .collect()
    }
}

impl DataWriter for InstanceBuffer {
    fn write(&mut self, instance: Instance) -> Result<()> {
        self.instances
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(instance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlink_core::Feature;

    #[test]
    fn test_jsonl_lines() {
        let mut writer = JsonlDataWriter::new(Vec::new());
        writer
            .write(Instance::new("BEFORE", vec![Feature::number("distance", 2.0)]))
            .unwrap();
        writer
            .write(Instance::new("-NONE-", vec![Feature::text("arg1_kind", "EVENT")]))
            .unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.written(), 2);

        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Instance = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.label, "BEFORE");
        assert_eq!(first.features[0].value.as_number(), Some(2.0));
    }

    #[test]
    fn test_buffer_handles_share_storage() {
        let buffer = InstanceBuffer::new();
        let mut handle = buffer.clone();
        handle.write(Instance::new("O", Vec::new())).unwrap();

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.labels(), vec!["O".to_string()]);
    }
}
