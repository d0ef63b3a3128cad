//! Pure domain layer for the workflow engine: entities, the submission state
//! machine, the role sequence policy, and the read-model projection. Nothing
//! in this module performs I/O.

pub mod entities;
pub mod policy;
pub mod projection;
pub mod state;
