use std::fmt;

/// Position of one question in the pipeline. Stages only move forward;
/// `Failed` can follow any stage before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    IntentClassified,
    QueryGenerated,
    ResultObtained,
    Explained,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Start => "start",
            PipelineStage::IntentClassified => "intent_classified",
            PipelineStage::QueryGenerated => "query_generated",
            PipelineStage::ResultObtained => "result_obtained",
            PipelineStage::Explained => "explained",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    /// Stage reached on success from this one. Terminal stages return
    /// themselves.
    pub fn next(&self) -> PipelineStage {
        match self {
            PipelineStage::Start => PipelineStage::IntentClassified,
            PipelineStage::IntentClassified => PipelineStage::QueryGenerated,
            PipelineStage::QueryGenerated => PipelineStage::ResultObtained,
            PipelineStage::ResultObtained => PipelineStage::Explained,
            PipelineStage::Explained => PipelineStage::Done,
            PipelineStage::Done => PipelineStage::Done,
            PipelineStage::Failed => PipelineStage::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
