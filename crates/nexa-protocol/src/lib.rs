//! Nexa IDE - Protocol Types
//!
//! Wire types shared by the IDE front-end and the backend file service.
//! This crate is the single source of truth for route paths, service
//! method names, request/response bodies, and error codes.

pub mod error;
pub mod files;
pub mod methods;

pub use error::{IdeError, IdeErrorCode};
pub use files::{
    DeleteFileRequest, HandlerResult, LoadWorkspaceRequest, LoadWorkspaceResponse,
    RemoteFile, UpsertFileRequest, WorkspaceFiles,
};
pub use methods::{Methods, Routes};
