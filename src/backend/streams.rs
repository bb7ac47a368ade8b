/// An instance buffer attached to a stream slot, starting at `byte_offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamBinding {
    pub stream: u32,
    pub byte_offset: u64,
}

/// The stream slots an instance buffer is currently attached to.
///
/// At most one binding per stream; binding a stream again replaces its offset.
#[derive(Clone, Debug, Default)]
pub struct StreamBindings {
    bindings: Vec<StreamBinding>,
}

impl StreamBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to `stream` at `byte_offset`.
    pub fn bind(&mut self, stream: u32, byte_offset: u64) {
        match self.bindings.iter_mut().find(|b| b.stream == stream) {
            Some(binding) => binding.byte_offset = byte_offset,
            None => self.bindings.push(StreamBinding {
                stream,
                byte_offset,
            }),
        }
    }

    /// Detach from `stream`, returning the binding it had (if any).
    pub fn unbind(&mut self, stream: u32) -> Option<StreamBinding> {
        let pos = self.bindings.iter().position(|b| b.stream == stream)?;
        Some(self.bindings.swap_remove(pos))
    }

    /// Get the binding for `stream`.
    pub fn get(&self, stream: u32) -> Option<StreamBinding> {
        self.bindings.iter().find(|b| b.stream == stream).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamBinding> {
        self.bindings.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
