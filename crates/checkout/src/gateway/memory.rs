use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CheckoutLaunch, CheckoutSession, GatewayError, PaymentGateway};

/// Launches kept by default. Older ones are dropped first.
const DEFAULT_LAUNCH_HISTORY: usize = 256;

#[derive(Debug)]
struct InMemoryGatewayState {
    launches: VecDeque<CheckoutLaunch>,
    history_limit: usize,
    fail_on_launch: bool,
}

/// In-memory payment gateway for testing and local runs.
///
/// Records the most recent launches, up to a history limit. Clones share
/// the same state.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_LAUNCH_HISTORY)
    }

    /// Creates a gateway that keeps at most `limit` launches.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryGatewayState {
                launches: VecDeque::new(),
                history_limit: limit,
                fail_on_launch: false,
            })),
        }
    }

    /// Configures the gateway to fail every launch.
    pub async fn set_fail_on_launch(&self, fail: bool) {
        self.state.write().await.fail_on_launch = fail;
    }

    /// Returns the recorded launches, oldest first.
    pub async fn launches(&self) -> Vec<CheckoutLaunch> {
        self.state.read().await.launches.iter().cloned().collect()
    }

    pub async fn launch_count(&self) -> usize {
        self.state.read().await.launches.len()
    }
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn launch_checkout(
        &self,
        launch: CheckoutLaunch,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.write().await;

        if state.fail_on_launch {
            return Err(GatewayError::Launch("gateway unavailable".to_string()));
        }

        let session = CheckoutSession {
            reference: launch.reference.clone(),
            redirect_url: format!("memory://checkout/{}", launch.reference),
        };
        if state.history_limit == 0 {
            return Ok(session);
        }
        if state.launches.len() >= state.history_limit {
            state.launches.pop_front();
        }
        state.launches.push_back(launch);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::{GatewayReference, Money};

    fn launch() -> CheckoutLaunch {
        let order_id = OrderId::new();
        CheckoutLaunch {
            order_id,
            reference: GatewayReference::for_order(order_id),
            amount: Money::from_minor(1000),
            customer_email: None,
            customer_phone: "555-0100".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_launches() {
        let gateway = InMemoryPaymentGateway::new();

        let session = gateway.launch_checkout(launch()).await.unwrap();

        assert!(session.redirect_url.starts_with("memory://checkout/ORDER-"));
        assert_eq!(gateway.launch_count().await, 1);
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_launches() {
        let gateway = InMemoryPaymentGateway::with_history_limit(2);
        let launches: Vec<_> = (0..3).map(|_| launch()).collect();

        for l in &launches {
            gateway.launch_checkout(l.clone()).await.unwrap();
        }

        let recorded = gateway.launches().await;
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].order_id, launches[1].order_id);
        assert_eq!(recorded[1].order_id, launches[2].order_id);
    }

    #[tokio::test]
    async fn test_fail_on_launch() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_launch(true).await;

        let result = gateway.launch_checkout(launch()).await;

        assert!(result.is_err());
        assert_eq!(gateway.launch_count().await, 0);
    }
}
