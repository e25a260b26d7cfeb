mod common;
mod engine;
mod problem;
mod submission;
