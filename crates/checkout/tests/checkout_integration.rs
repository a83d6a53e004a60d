//! Integration tests for the checkout coordinator.

use std::sync::Arc;

use async_trait::async_trait;
use checkout::{
    CartLine, CartSnapshot, CheckoutCoordinator, CheckoutError, CheckoutLaunch, CheckoutRequest,
    CheckoutSession, GatewayError, InMemoryPaymentGateway, PaymentGateway, ValidationError,
};
use common::{OrderId, RestaurantId};
use domain::{DeliveryInfo, Money, OrderService, OrderStatus, PaymentMethod, PaymentStatus};
use order_store::{
    InMemoryOrderStore, OrderDocument, OrderQuery, OrderStore, OrderStoreError, Version,
};
use tokio::sync::Mutex;

type TestCoordinator = CheckoutCoordinator<InMemoryOrderStore, InMemoryPaymentGateway>;

struct TestHarness {
    coordinator: TestCoordinator,
    store: InMemoryOrderStore,
    gateway: InMemoryPaymentGateway,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryOrderStore::new();
        let gateway = InMemoryPaymentGateway::new();
        let orders = Arc::new(OrderService::new(store.clone()));
        let coordinator = CheckoutCoordinator::new(orders, gateway.clone());

        Self {
            coordinator,
            store,
            gateway,
        }
    }
}

fn two_item_cart() -> CartSnapshot {
    CartSnapshot::new(RestaurantId::new(), Money::from_minor(5000))
        .with_line(CartLine::new("p-1", "Hamburguesa", 2, Money::from_minor(15000)))
        .with_line(CartLine::new("p-2", "Gaseosa", 2, Money::from_minor(5000)))
}

fn request(cart: CartSnapshot, payment_method: PaymentMethod) -> CheckoutRequest {
    CheckoutRequest {
        cart,
        delivery_info: DeliveryInfo::new("Carrera 7 #12-30", "3001234567")
            .with_email("cliente@example.com")
            .with_instructions("Torre 2, apto 301"),
        payment_method,
    }
}

mod cash_checkout {
    use super::*;

    #[tokio::test]
    async fn two_item_cash_order_is_pending_without_reference() {
        let h = TestHarness::new();

        let receipt = h
            .coordinator
            .create_order(request(two_item_cart(), PaymentMethod::Cash))
            .await
            .unwrap();

        let order = receipt.order;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.gateway_reference.is_none());
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.totals.total.minor(), 45000);
        assert!(receipt.session.is_none());
        assert_eq!(h.gateway.launch_count().await, 0);

        let stored = h.store.get(order.id).await.unwrap().unwrap();
        assert!(stored.gateway_reference.is_none());
    }

    #[tokio::test]
    async fn bank_transfer_never_calls_gateway() {
        let h = TestHarness::new();

        h.coordinator
            .create_order(request(two_item_cart(), PaymentMethod::BankTransfer))
            .await
            .unwrap();

        assert_eq!(h.gateway.launch_count().await, 0);
    }
}

mod gateway_checkout {
    use super::*;

    #[tokio::test]
    async fn reference_is_attached_and_checkout_launched() {
        let h = TestHarness::new();

        let receipt = h
            .coordinator
            .create_order(request(two_item_cart(), PaymentMethod::Gateway))
            .await
            .unwrap();

        let order = receipt.order;
        let reference = order.gateway_reference.clone().unwrap();
        assert_eq!(reference.as_str(), format!("ORDER-{}", order.id));
        assert_eq!(order.status, OrderStatus::Pending);

        let session = receipt.session.unwrap();
        assert_eq!(session.reference, reference);

        let launches = h.gateway.launches().await;
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].order_id, order.id);
        assert_eq!(launches[0].amount.minor(), 45000);
        assert_eq!(
            launches[0].customer_email.as_deref(),
            Some("cliente@example.com")
        );
        assert_eq!(launches[0].customer_phone, "3001234567");
    }

    #[tokio::test]
    async fn gateway_failure_keeps_order_with_reference() {
        let h = TestHarness::new();
        h.gateway.set_fail_on_launch(true).await;

        let result = h
            .coordinator
            .create_order(request(two_item_cart(), PaymentMethod::Gateway))
            .await;

        let Err(CheckoutError::Gateway { order_id, .. }) = result else {
            panic!("expected gateway error, got {result:?}");
        };
        let stored = h.store.get(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, "pending");
        assert_eq!(
            stored.gateway_reference,
            Some(format!("ORDER-{}", order_id))
        );
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_write() {
        let h = TestHarness::new();
        let cart = CartSnapshot::new(RestaurantId::new(), Money::zero());

        let result = h
            .coordinator
            .create_order(request(cart, PaymentMethod::Gateway))
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::Validation(ValidationError::EmptyCart))
        ));
        assert_eq!(h.store.order_count().await, 0);
        assert_eq!(h.gateway.launch_count().await, 0);
    }

    #[tokio::test]
    async fn overflowing_total_is_rejected_before_any_write() {
        let h = TestHarness::new();
        let cart = CartSnapshot::new(RestaurantId::new(), Money::zero()).with_line(
            CartLine::new("p-1", "Banquete", 2, Money::from_minor(i64::MAX / 2 + 1)),
        );

        let result = h
            .coordinator
            .create_order(request(cart, PaymentMethod::Cash))
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::Validation(ValidationError::AmountOverflow))
        ));
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn incomplete_delivery_info_is_rejected() {
        let h = TestHarness::new();
        let mut req = request(two_item_cart(), PaymentMethod::Cash);
        req.delivery_info.phone = String::new();

        let result = h.coordinator.create_order(req).await;

        match result {
            Err(CheckoutError::Validation(ValidationError::IncompleteDeliveryInfo { missing })) => {
                assert_eq!(missing, vec!["phone"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(h.store.order_count().await, 0);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn creation_failure_aborts_before_gateway() {
        let h = TestHarness::new();
        h.store.set_unavailable(true).await;

        let result = h
            .coordinator
            .create_order(request(two_item_cart(), PaymentMethod::Gateway))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderCreation(_)));
        assert!(err.is_transient());
        assert_eq!(h.gateway.launch_count().await, 0);
    }

    /// Store whose conditional updates always fail.
    #[derive(Clone, Default)]
    struct ReadOnlyStore {
        inner: InMemoryOrderStore,
    }

    #[async_trait]
    impl OrderStore for ReadOnlyStore {
        async fn insert(&self, document: OrderDocument) -> order_store::Result<Version> {
            self.inner.insert(document).await
        }

        async fn get(&self, order_id: OrderId) -> order_store::Result<Option<OrderDocument>> {
            self.inner.get(order_id).await
        }

        async fn get_by_reference(
            &self,
            reference: &str,
        ) -> order_store::Result<Option<OrderDocument>> {
            self.inner.get_by_reference(reference).await
        }

        async fn update(
            &self,
            _document: OrderDocument,
            _expected: Version,
        ) -> order_store::Result<Version> {
            Err(OrderStoreError::Unavailable("writes disabled".to_string()))
        }

        async fn query(&self, query: OrderQuery) -> order_store::Result<Vec<OrderDocument>> {
            self.inner.query(query).await
        }
    }

    #[tokio::test]
    async fn reference_write_failure_is_surfaced_and_order_kept() {
        let store = ReadOnlyStore::default();
        let gateway = InMemoryPaymentGateway::new();
        let coordinator = CheckoutCoordinator::new(
            Arc::new(OrderService::new(store.clone())),
            gateway.clone(),
        );

        let result = coordinator
            .create_order(request(two_item_cart(), PaymentMethod::Gateway))
            .await;

        let Err(CheckoutError::ReferenceWrite { order_id, .. }) = result else {
            panic!("expected reference write error, got {result:?}");
        };
        assert_eq!(gateway.launch_count().await, 0);
        let stored = store.inner.get(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, "pending");
        assert!(stored.gateway_reference.is_none());
    }
}

mod ordering {
    use super::*;

    /// Gateway that looks the reference up in the store when launched.
    struct ObservingGateway {
        store: InMemoryOrderStore,
        visible_at_launch: Arc<Mutex<Vec<bool>>>,
    }

    #[async_trait]
    impl PaymentGateway for ObservingGateway {
        async fn launch_checkout(
            &self,
            launch: CheckoutLaunch,
        ) -> Result<CheckoutSession, GatewayError> {
            let found = self
                .store
                .get_by_reference(launch.reference.as_str())
                .await
                .map_err(|e| GatewayError::Launch(e.to_string()))?;
            self.visible_at_launch.lock().await.push(found.is_some());
            Ok(CheckoutSession {
                reference: launch.reference,
                redirect_url: "https://checkout.example.com".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn reference_is_persisted_before_launch() {
        let store = InMemoryOrderStore::new();
        let visible_at_launch = Arc::new(Mutex::new(Vec::new()));
        let gateway = ObservingGateway {
            store: store.clone(),
            visible_at_launch: Arc::clone(&visible_at_launch),
        };
        let coordinator =
            CheckoutCoordinator::new(Arc::new(OrderService::new(store.clone())), gateway);

        coordinator
            .create_order(request(two_item_cart(), PaymentMethod::Gateway))
            .await
            .unwrap();

        assert_eq!(*visible_at_launch.lock().await, vec![true]);
    }
}
