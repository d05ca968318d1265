pub mod attempt;
pub mod difficulty;
pub mod insight;
pub mod mock;
pub mod question;
pub mod topic_progress;
