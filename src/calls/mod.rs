//! 通话领域层 - 通话记录、时长格式化、分类

pub mod classifier;
pub mod duration;
pub mod record;

pub use classifier::{
    classify, CallCategory, CallClassifier, Classification, ClassificationMode, ClassifiedCall,
};
pub use duration::{format_duration, IN_PROGRESS_LABEL};
pub use record::{CallRecord, CallStatus};
