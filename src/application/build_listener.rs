use std::sync::Mutex;

/// Receives the human-readable build log.
///
/// Implementations must tolerate being called from any task.
pub trait BuildListener: Send + Sync {
    fn log(&self, line: &str);

    fn error(&self, line: &str) {
        self.log(&format!("ERROR: {}", line));
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct RecordingListener {
    lines: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Index of the first line containing `needle`
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines().iter().position(|line| line.contains(needle))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.position(needle).is_some()
    }
}

impl BuildListener for RecordingListener {
    fn log(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_listener() {
        let listener = RecordingListener::new();
        listener.log("Cleaning workspace /ws");
        listener.error("boom");

        assert_eq!(listener.position("Cleaning"), Some(0));
        assert!(listener.contains("ERROR: boom"));
        assert!(!listener.contains("Checking out"));
    }
}
