//! Progress observer for the collect and move stages
//!
//! The partitioner never sees this; it only exists so a front end can draw
//! progress while files are read and moved.

/// Which long-running stage is reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Moving,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Extracting => "Extracting EXIF data",
            Stage::Moving => "Moving HDR groups",
        }
    }
}

pub trait Progress {
    /// A stage is about to process `total` items
    fn start(&mut self, _stage: Stage, _total: usize) {}

    /// One item (a file name) has been handled
    fn advance(&mut self, _stage: Stage, _item: &str) {}

    fn finish(&mut self, _stage: Stage) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every callback, for asserting on what a stage reported
    #[derive(Debug, Default)]
    pub struct RecordingProgress {
        pub events: Vec<(Stage, String)>,
    }

    impl Progress for RecordingProgress {
        fn start(&mut self, stage: Stage, total: usize) {
            self.events.push((stage, format!("start:{}", total)));
        }

        fn advance(&mut self, stage: Stage, item: &str) {
            self.events.push((stage, item.to_string()));
        }

        fn finish(&mut self, stage: Stage) {
            self.events.push((stage, "finish".to_string()));
        }
    }
}
