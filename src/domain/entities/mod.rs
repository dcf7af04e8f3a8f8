pub mod plan;
pub mod subscription;
pub mod webhook_event;
