//! Owned-buffer backend.

use super::Backend;

/// An image the caller already holds in memory
#[derive(Debug)]
pub struct Memory(Vec<u8>);

impl Memory {
    pub fn new(data: Vec<u8>) -> Memory {
        Memory(data)
    }
}

impl Backend for Memory {
    fn data(&self) -> &[u8] {
        &self.0
    }
}
