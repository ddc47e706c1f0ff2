//! Single-flight wrapper around service calls
//!
//! Every screen that talks to the backend goes through an
//! [`AsyncCallGateway`], which tracks `loading` and the last error message.
//!
//! Policy for overlapping calls: while one call is in flight, further calls
//! are refused with [`CallOutcome::Busy`] and their operation is never
//! awaited. [`AsyncCallGateway::invalidate`] (screen unmount or reset) moves
//! the gateway to a new generation; a call that finishes under an older
//! generation is reported as [`CallOutcome::Stale`] and leaves the gateway
//! untouched.

use super::error::ServiceError;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Identity of one `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallToken {
    id: u64,
    generation: u64,
}

impl CallToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Failure of a call, with the message shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFailure {
    pub error: ServiceError,
    pub message: String,
}

/// Result of `execute`
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Completed(T),
    Failed(GatewayFailure),
    /// Refused: another call was already in flight
    Busy,
    /// Finished after the gateway was invalidated; result discarded
    Stale,
}

impl<T> CallOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, CallOutcome::Completed(_))
    }
}

/// Failure callback for [`AsyncCallGateway::execute_with`]
pub type FailureCallback<'a> = Box<dyn FnOnce(&ServiceError, &str) + Send + 'a>;

#[derive(Debug, Default)]
struct GatewayState {
    loading: bool,
    error: Option<String>,
    generation: u64,
    next_id: u64,
    active: Option<CallToken>,
    last: Option<CallToken>,
}

/// Loading/error state around one in-flight operation. Cheap to clone;
/// clones share state.
#[derive(Debug, Clone, Default)]
pub struct AsyncCallGateway {
    state: Arc<Mutex<GatewayState>>,
    timeout: Option<Duration>,
}

impl AsyncCallGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail calls that take longer than `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Message of the last failed call, cleared by the next success
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Token of the most recently started call
    pub fn last_call(&self) -> Option<CallToken> {
        self.lock().last
    }

    /// Start tracking a call. `None` if one is already in flight.
    pub fn begin(&self) -> Option<CallToken> {
        let mut state = self.lock();
        if state.loading {
            return None;
        }
        state.next_id += 1;
        let token = CallToken {
            id: state.next_id,
            generation: state.generation,
        };
        state.loading = true;
        state.active = Some(token);
        state.last = Some(token);
        Some(token)
    }

    /// Record the result of the call identified by `token`
    pub fn finish<T>(&self, token: CallToken, result: Result<T, ServiceError>) -> CallOutcome<T> {
        let mut state = self.lock();
        if token.generation != state.generation || state.active != Some(token) {
            tracing::debug!(
                "Discarding result of call {} (generation {} is current)",
                token.id,
                state.generation
            );
            return CallOutcome::Stale;
        }
        state.loading = false;
        state.active = None;
        match result {
            Ok(value) => {
                state.error = None;
                CallOutcome::Completed(value)
            }
            Err(error) => {
                let message = error.user_message();
                tracing::warn!("Call {} failed: {error}", token.id);
                state.error = Some(message.clone());
                CallOutcome::Failed(GatewayFailure { error, message })
            }
        }
    }

    /// Release the gateway for a call that will never finish. No-op once the
    /// call has finished or the gateway was invalidated.
    fn abandon(&self, token: CallToken) {
        let mut state = self.lock();
        if state.active == Some(token) {
            tracing::debug!("Call {} dropped before completion", token.id);
            state.loading = false;
            state.active = None;
        }
    }

    /// Drop tracking of any in-flight call; its result will be discarded
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.loading = false;
        state.active = None;
        state.error = None;
    }

    /// Run `operation` under the gateway
    pub async fn execute<T, Fut>(&self, operation: Fut) -> CallOutcome<T>
    where
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let Some(token) = self.begin() else {
            tracing::debug!("Refusing call while another is in flight");
            return CallOutcome::Busy;
        };
        let in_flight = InFlight {
            gateway: self,
            token,
            settled: false,
        };

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout),
            },
            None => operation.await,
        };

        in_flight.settle(result)
    }

    /// Callback flavour of [`execute`](Self::execute). Without `on_failure`
    /// the error is only kept in [`error`](Self::error) for the caller to
    /// render.
    pub async fn execute_with<T, Fut, S>(
        &self,
        operation: Fut,
        on_success: S,
        on_failure: Option<FailureCallback<'_>>,
    ) -> CallOutcome<()>
    where
        Fut: Future<Output = Result<T, ServiceError>>,
        S: FnOnce(T),
    {
        match self.execute(operation).await {
            CallOutcome::Completed(value) => {
                on_success(value);
                CallOutcome::Completed(())
            }
            CallOutcome::Failed(failure) => {
                if let Some(callback) = on_failure {
                    callback(&failure.error, &failure.message);
                }
                CallOutcome::Failed(failure)
            }
            CallOutcome::Busy => CallOutcome::Busy,
            CallOutcome::Stale => CallOutcome::Stale,
        }
    }
}

/// Frees the gateway when an `execute` future is dropped mid-call
struct InFlight<'a> {
    gateway: &'a AsyncCallGateway,
    token: CallToken,
    settled: bool,
}

impl InFlight<'_> {
    fn settle<T>(mut self, result: Result<T, ServiceError>) -> CallOutcome<T> {
        self.settled = true;
        self.gateway.finish(self.token, result)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.gateway.abandon(self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::error::GENERIC_ERROR_MESSAGE;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready, task};

    fn rejected(message: &str) -> ServiceError {
        ServiceError::Rejected {
            status: Some(400),
            message: Some(message.to_string()),
            field_errors: BTreeMap::new(),
        }
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn test_success_clears_loading_and_error() {
            let gateway = AsyncCallGateway::new();
            let outcome = gateway.execute(async { Ok(json!({"id": 1})) }).await;
            assert_eq!(outcome, CallOutcome::Completed(json!({"id": 1})));
            assert!(!gateway.is_loading());
            assert!(gateway.error().is_none());
        }

        #[tokio::test]
        async fn test_failure_stores_server_message() {
            let gateway = AsyncCallGateway::new();
            let outcome: CallOutcome<()> = gateway
                .execute(async { Err(rejected("Duplicate record")) })
                .await;
            match outcome {
                CallOutcome::Failed(failure) => assert_eq!(failure.message, "Duplicate record"),
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert_eq!(gateway.error().as_deref(), Some("Duplicate record"));
            assert!(!gateway.is_loading());
        }

        #[tokio::test]
        async fn test_network_failure_uses_generic_message() {
            let gateway = AsyncCallGateway::new();
            let _: CallOutcome<()> = gateway
                .execute(async { Err(ServiceError::Network("connection reset".to_string())) })
                .await;
            assert_eq!(gateway.error().as_deref(), Some(GENERIC_ERROR_MESSAGE));
        }

        #[tokio::test]
        async fn test_success_after_failure_clears_error() {
            let gateway = AsyncCallGateway::new();
            let _: CallOutcome<()> = gateway.execute(async { Err(rejected("nope")) }).await;
            let _ = gateway.execute(async { Ok(()) }).await;
            assert!(gateway.error().is_none());
        }

        #[tokio::test]
        async fn test_tokens_increase() {
            let gateway = AsyncCallGateway::new();
            let _ = gateway.execute(async { Ok(()) }).await;
            let first = gateway.last_call().unwrap();
            let _ = gateway.execute(async { Ok(()) }).await;
            let second = gateway.last_call().unwrap();
            assert!(second.id() > first.id());
            assert_eq!(first.generation(), second.generation());
        }

        #[tokio::test]
        async fn test_timeout_reports_failure() {
            let gateway = AsyncCallGateway::with_timeout(Duration::from_millis(20));
            let outcome: CallOutcome<()> = gateway
                .execute(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await;
            match outcome {
                CallOutcome::Failed(failure) => assert_eq!(failure.error, ServiceError::Timeout),
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert!(!gateway.is_loading());
        }
    }

    mod single_flight {
        use super::*;

        #[test]
        fn test_second_call_is_refused_while_loading() {
            let gateway = AsyncCallGateway::new();
            let (tx, rx) = oneshot::channel::<u32>();

            let first_gateway = gateway.clone();
            let mut first = task::spawn(async move {
                first_gateway
                    .execute(async move { rx.await.map_err(|e| ServiceError::Network(e.to_string())) })
                    .await
            });
            assert_pending!(first.poll());
            assert!(gateway.is_loading());

            let mut reached = false;
            let mut second = task::spawn(gateway.execute(async {
                reached = true;
                Ok(2)
            }));
            let second_outcome = assert_ready!(second.poll());
            drop(second);
            assert_eq!(second_outcome, CallOutcome::Busy);
            assert!(!reached);

            tx.send(1).unwrap();
            assert!(first.is_woken());
            assert_eq!(assert_ready!(first.poll()), CallOutcome::Completed(1));
            assert!(!gateway.is_loading());
        }

        #[test]
        fn test_invalidate_discards_late_result() {
            let gateway = AsyncCallGateway::new();
            let (tx, rx) = oneshot::channel::<u32>();

            let first_gateway = gateway.clone();
            let mut first = task::spawn(async move {
                first_gateway
                    .execute(async move { rx.await.map_err(|e| ServiceError::Network(e.to_string())) })
                    .await
            });
            assert_pending!(first.poll());

            gateway.invalidate();
            assert!(!gateway.is_loading());

            tx.send(1).unwrap();
            assert_eq!(assert_ready!(first.poll()), CallOutcome::Stale);
            assert!(gateway.error().is_none());
            assert!(!gateway.is_loading());
        }

        #[test]
        fn test_new_call_after_invalidate_is_allowed() {
            let gateway = AsyncCallGateway::new();
            let stale = gateway.begin().unwrap();
            gateway.invalidate();

            let fresh = gateway.begin().unwrap();
            assert_ne!(stale.generation(), fresh.generation());
            assert_eq!(gateway.finish(stale, Ok(1)), CallOutcome::Stale);
            assert!(gateway.is_loading());
            assert_eq!(gateway.finish(fresh, Ok(2)), CallOutcome::Completed(2));
        }

        #[test]
        fn test_dropped_call_releases_gateway() {
            let gateway = AsyncCallGateway::new();
            let mut call = task::spawn(gateway.execute(std::future::pending::<Result<u32, _>>()));
            assert_pending!(call.poll());
            assert!(gateway.is_loading());

            drop(call);
            assert!(!gateway.is_loading());
            assert!(gateway.error().is_none());

            let mut next = task::spawn(gateway.execute(async { Ok(3) }));
            assert_eq!(assert_ready!(next.poll()), CallOutcome::Completed(3));
        }

        #[test]
        fn test_dropping_stale_call_keeps_newer_call_active() {
            let gateway = AsyncCallGateway::new();
            let mut stale = task::spawn(gateway.execute(std::future::pending::<Result<u32, _>>()));
            assert_pending!(stale.poll());
            gateway.invalidate();

            let fresh = gateway.begin().unwrap();
            drop(stale);
            assert!(gateway.is_loading());
            assert_eq!(gateway.finish(fresh, Ok(4)), CallOutcome::Completed(4));
        }
    }

    mod callbacks {
        use super::*;

        #[tokio::test]
        async fn test_on_success_receives_value() {
            let gateway = AsyncCallGateway::new();
            let mut received = None;
            let outcome = gateway
                .execute_with(async { Ok(7) }, |v| received = Some(v), None)
                .await;
            assert!(outcome.is_completed());
            assert_eq!(received, Some(7));
        }

        #[tokio::test]
        async fn test_on_failure_receives_message() {
            let gateway = AsyncCallGateway::new();
            let mut seen = None;
            let outcome = gateway
                .execute_with(
                    async { Err::<u32, _>(rejected("Invalid LGA")) },
                    |_| panic!("success callback must not run"),
                    Some(Box::new(|_: &ServiceError, message: &str| {
                        seen = Some(message.to_string())
                    })),
                )
                .await;
            assert!(matches!(outcome, CallOutcome::Failed(_)));
            assert_eq!(seen.as_deref(), Some("Invalid LGA"));
        }

        #[tokio::test]
        async fn test_failure_without_callback_keeps_error() {
            let gateway = AsyncCallGateway::new();
            let _ = gateway
                .execute_with(async { Err::<u32, _>(rejected("Invalid LGA")) }, |_| {}, None)
                .await;
            assert_eq!(gateway.error().as_deref(), Some("Invalid LGA"));
        }
    }
}
