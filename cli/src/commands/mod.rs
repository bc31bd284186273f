//! CLI Commands

mod candidates;
mod commit;
mod demo;
mod init;

pub use candidates::CandidatesCommand;
pub use commit::CommitCommand;
pub use demo::DemoCommand;
pub use init::InitCommand;
