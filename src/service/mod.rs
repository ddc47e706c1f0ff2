//! Backend access: the records service, its REST client and the call gateway

mod client;
mod error;
mod gateway;
mod session;
mod traits;

pub use client::HttpRecordService;
pub use error::{ServiceError, GENERIC_ERROR_MESSAGE};
pub use gateway::{AsyncCallGateway, CallOutcome, CallToken, FailureCallback, GatewayFailure};
pub use session::{InMemorySession, SessionContext, SessionUser};
pub use traits::{ListQuery, RecordService};

#[cfg(test)]
pub use session::MockSessionContext;
#[cfg(test)]
pub use traits::MockRecordService;
