pub mod export;
pub mod plan;
pub mod run;
pub mod select;
pub mod status;
