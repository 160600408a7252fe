//! Typed resource client for the clinic REST backend.
//!
//! # Overview
//! Maps backend collections (patients, doctors, appointments, tasks) onto
//! uniform CRUD operations. A [`ResourceDescriptor`] names a collection and
//! rebuilds typed entities from raw records; [`ResourceClient`] performs
//! get-by-id, paginated list (resolving every reference in the envelope
//! concurrently), create, update and delete for any descriptor.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`/`HttpResponse`);
//!   the network sits behind the [`Transport`] trait.
//! - Every failure is an [`ApiError`] with three cases: server rejected, no
//!   response, local fault. Nothing is retried or defaulted.
//! - Sessions are explicit arguments. The client holds no mutable state.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod pagination;
pub mod resource;
pub mod session;
pub mod transport;

pub use client::{IdHolder, ResourceClient};
pub use config::ClientConfig;
pub use error::{normalize, ApiError, ConfigError, TransportError, ValidationError};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{
    Appointment, AppointmentBase, AppointmentParams, Doctor, DoctorBase, DoctorParams, Gender,
    Patient, PatientBase, PatientParams, Task, TaskBase, TaskParams,
};
pub use pagination::{ListEnvelope, Page, PaginationParams, QueryParams, Reference};
pub use resource::ResourceDescriptor;
pub use session::Session;
pub use transport::{ReqwestTransport, Transport};
