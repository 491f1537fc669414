use std::collections::HashMap;
use std::sync::Mutex;

/// Signals that cached renders of a path are stale
pub trait Revalidator: Send + Sync {
    fn revalidate_path(&self, path: &str);

    /// Monotonic counter bumped by every revalidation of `path`
    fn generation(&self, path: &str) -> u64;
}

/// Per-path generation counters; views embed the generation in their `ETag`
#[derive(Debug, Default)]
pub struct PathGenerations {
    generations: Mutex<HashMap<String, u64>>,
}

impl PathGenerations {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Revalidator for PathGenerations {
    fn revalidate_path(&self, path: &str) {
        let mut generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        *generations.entry(path.to_string()).or_insert(0) += 1;
    }

    fn generation(&self, path: &str) -> u64 {
        let generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        generations.get(path).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revalidation_bumps_only_that_path() {
        let generations = PathGenerations::new();
        assert_eq!(generations.generation("/dashboard"), 0);

        generations.revalidate_path("/dashboard");
        generations.revalidate_path("/dashboard");

        assert_eq!(generations.generation("/dashboard"), 2);
        assert_eq!(generations.generation("/admin"), 0);
    }
}
