//! Plumbing configuration

/// Read size used by pull inlets
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Write buffer size of push inlets
pub const DEFAULT_INLET_BUFFER_SIZE: usize = 4096;

/// Plumbing configuration options
#[derive(Debug, Clone)]
pub struct PlumbingConfig {
    /// Maximum bytes a pull inlet reads from its source per chunk
    pub read_buffer_size: usize,

    /// Bytes a push inlet buffers before broadcasting (0 = every write is a chunk)
    pub inlet_buffer_size: usize,

    /// Prefix for background thread names
    pub thread_name_prefix: String,
}

impl Default for PlumbingConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            inlet_buffer_size: DEFAULT_INLET_BUFFER_SIZE,
            thread_name_prefix: "plumbing".to_string(),
        }
    }
}

impl PlumbingConfig {
    /// Set the pull-inlet read size (clamped to at least one byte)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the push-inlet write buffer size
    pub fn inlet_buffer_size(mut self, size: usize) -> Self {
        self.inlet_buffer_size = size;
        self
    }

    /// Make every write to a push inlet its own chunk
    pub fn unbuffered(mut self) -> Self {
        self.inlet_buffer_size = 0;
        self
    }

    /// Set the background thread name prefix
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}
