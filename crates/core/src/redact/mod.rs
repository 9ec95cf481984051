//! Redaction: operation filtering and rotation-aware rectangle mapping.

pub mod redactor;
pub mod rotate;

pub use redactor::{PartialImagePolicy, RedactConfig, RemovedResources, redact};
pub use rotate::{
    Rotation, user_point_to_visual, user_to_visual, visual_point_to_user, visual_to_user,
};
