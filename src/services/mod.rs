pub mod application_workflow;
pub mod notice;
pub mod optimistic_view;
pub mod role_resolver;
pub mod status_machine;
pub mod write_dispatch;
