use super::{Capabilities, Frame, Writer, WriterKey};
use crate::error::Result;

/// Degenerate writer: the raw module matrix as `0`/`1` rows, no visual geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryWriter;

impl Writer for BinaryWriter {
    fn key(&self) -> WriterKey {
        WriterKey::BINARY
    }

    fn content_type(&self) -> &str {
        "application/octet-stream"
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["bin"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::OPAQUE
    }

    fn render(&self, frame: &Frame<'_>) -> Result<Vec<u8>> {
        Ok(frame.grid.to_bit_rows().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::writers::test_support::{checker, plan, BlockFont};

    #[test]
    fn test_payload_ignores_presentation() {
        let grid = checker(3);
        let small = Configuration::new("x");
        let mut large = Configuration::new("x");
        large.set_size(900).unwrap();
        large.set_quiet_zone(40);

        let render = |config: &Configuration| {
            let plan = plan(config, &grid);
            let frame = Frame { config, grid: &grid, plan: &plan, fonts: &BlockFont };
            BinaryWriter.render(&frame).unwrap()
        };
        assert_eq!(render(&small), b"101\n010\n101\n");
        assert_eq!(render(&small), render(&large));
    }
}
