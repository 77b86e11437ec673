//! Per-generation progress reporting.

use super::tree::GenerationStats;

/// How much progress output a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// One line per generation.
    Info,
    /// Generation lines plus start/finish summaries.
    Debug,
}

/// Writes progress lines to stderr according to the verbosity level.
#[derive(Debug, Clone, Copy)]
pub struct PartitionLogger {
    verbosity: Verbosity,
}

impl PartitionLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn start(&self, cells: usize, generations: u32) {
        if self.verbosity >= Verbosity::Debug {
            eprintln!("splitting {cells} cell(s) for up to {generations} generation(s)");
        }
    }

    pub fn generation(&self, stats: &GenerationStats) {
        if self.verbosity >= Verbosity::Info {
            eprintln!(
                "generation {}: {} split, {} retired, {} active",
                stats.generation, stats.split, stats.retired, stats.active
            );
        }
    }

    pub fn finish(&self, active: usize, terminal: usize) {
        if self.verbosity >= Verbosity::Debug {
            eprintln!("done: {active} active cell(s), {terminal} terminal");
        }
    }
}
