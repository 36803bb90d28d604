//! Utility functions for Perm-ML

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};

/// Save object to JSON file
pub fn save_json<T: Serialize>(obj: &T, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(obj)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Load object from JSON file
pub fn load_json<T: for<'de> Deserialize<'de>>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let obj = serde_json::from_str(&contents)?;
    Ok(obj)
}

/// Timing utilities
pub mod timing {
    use std::time::Instant;

    /// Simple timer
    pub struct Timer {
        start: Instant,
        name: String,
    }

    impl Timer {
        /// Start new timer
        pub fn new(name: &str) -> Self {
            Timer {
                start: Instant::now(),
                name: name.to_string(),
            }
        }

        /// Get elapsed time
        pub fn elapsed(&self) -> f32 {
            self.start.elapsed().as_secs_f32()
        }

        /// Print elapsed time
        pub fn print(&self) {
            println!("{}: {:.3}s", self.name, self.elapsed());
        }
    }

    impl Drop for Timer {
        fn drop(&mut self) {
            self.print();
        }
    }
}

/// Progress tracking
pub mod progress {
    use std::io::{self, Write};

    /// Simple progress bar
    pub struct ProgressBar {
        total: usize,
        current: usize,
        width: usize,
    }

    impl ProgressBar {
        /// Create new progress bar
        pub fn new(total: usize) -> Self {
            ProgressBar {
                total,
                current: 0,
                width: 50,
            }
        }

        /// Update progress
        pub fn update(&mut self, current: usize) {
            self.current = current;
            self.display();
        }

        /// Increment progress
        pub fn inc(&mut self) {
            self.current += 1;
            self.display();
        }

        /// Display progress bar
        fn display(&self) {
            let progress = self.current as f32 / self.total as f32;
            let filled = (progress * self.width as f32) as usize;
            let empty = self.width - filled;

            print!("\r[");
            print!("{}", "=".repeat(filled));
            print!("{}", " ".repeat(empty));
            print!("] {}/{} ({:.1}%)", self.current, self.total, progress * 100.0);

            if self.current >= self.total {
                println!();
            }

            io::stdout().flush().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::SinkhornConfig;

    #[test]
    fn test_json_serialization() {
        let cfg = SinkhornConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sinkhorn.json");
        let path = path.to_str().unwrap();

        save_json(&cfg, path).unwrap();
        let loaded: SinkhornConfig = load_json(path).unwrap();

        assert_eq!(cfg, loaded);
    }
}
