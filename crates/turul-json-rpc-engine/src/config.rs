/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Largest batch accepted; larger batches are answered with a single
    /// Invalid Request error (default: unlimited)
    pub max_batch_size: Option<usize>,
    /// Include the text of a procedure failure in the `data.cause` member of
    /// Internal error responses (default: false)
    pub expose_error_cause: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            expose_error_cause: false,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = Some(limit);
        self
    }

    pub fn with_error_cause(mut self, expose: bool) -> Self {
        self.expose_error_cause = expose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_batch_size, None);
        assert!(!config.expose_error_cause);
    }

    #[test]
    fn test_builder() {
        let config = DispatcherConfig::new()
            .with_max_batch_size(2)
            .with_error_cause(true);
        assert_eq!(config.max_batch_size, Some(2));
        assert!(config.expose_error_cause);
    }
}
