pub mod config;
pub mod datetime_utils;
pub mod error_utils;
pub mod manifest;
pub mod media;
pub mod naming;
pub mod orchestrator;
pub mod uploader;
pub mod vk;
pub mod yadisk;
