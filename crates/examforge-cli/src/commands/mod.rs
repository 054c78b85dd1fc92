pub mod create;
pub mod delete;
pub mod generate;
pub mod init;
pub mod list;
pub mod plan;
pub mod render;
pub mod show;
pub mod update;
pub mod workspace;
