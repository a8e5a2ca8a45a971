pub mod link;
pub mod task;
