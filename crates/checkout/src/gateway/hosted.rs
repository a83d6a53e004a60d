use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{CheckoutLaunch, CheckoutSession, GatewayError, PaymentGateway};

/// Settings for the hosted checkout page.
#[derive(Debug, Clone)]
pub struct HostedCheckoutConfig {
    /// Base URL of the hosted checkout page.
    pub checkout_url: String,
    pub public_key: String,
    /// Secret used to sign the amount and reference.
    pub integrity_secret: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Where the gateway sends the customer after paying.
    pub redirect_url: Option<String>,
}

/// Gateway client that builds a signed redirect to the hosted checkout.
///
/// Launching only produces the URL; the customer's browser opens it.
#[derive(Debug, Clone)]
pub struct HostedCheckoutGateway {
    config: HostedCheckoutConfig,
}

impl HostedCheckoutGateway {
    pub fn new(config: HostedCheckoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HostedCheckoutConfig {
        &self.config
    }

    /// `hex(sha256(reference ‖ amount ‖ currency ‖ secret))`
    pub fn integrity_signature(&self, reference: &str, amount_minor: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        hasher.update(amount_minor.to_string().as_bytes());
        hasher.update(self.config.currency.as_bytes());
        hasher.update(self.config.integrity_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn build_url(&self, launch: &CheckoutLaunch) -> Result<String, GatewayError> {
        let amount = launch.amount.minor();
        if amount <= 0 {
            return Err(GatewayError::Launch(format!(
                "amount must be positive, got {amount}"
            )));
        }

        let reference = launch.reference.as_str();
        let mut params: Vec<(&str, String)> = vec![
            ("public-key", self.config.public_key.clone()),
            ("currency", self.config.currency.clone()),
            ("amount-in-cents", amount.to_string()),
            ("reference", reference.to_string()),
            (
                "signature:integrity",
                self.integrity_signature(reference, amount),
            ),
        ];
        if let Some(ref redirect_url) = self.config.redirect_url {
            params.push(("redirect-url", redirect_url.clone()));
        }
        if let Some(ref email) = launch.customer_email {
            params.push(("customer-data:email", email.clone()));
        }
        params.push(("customer-data:phone-number", launch.customer_phone.clone()));

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        Ok(format!("{}?{}", self.config.checkout_url, query))
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    #[tracing::instrument(skip(self, launch), fields(reference = %launch.reference))]
    async fn launch_checkout(
        &self,
        launch: CheckoutLaunch,
    ) -> Result<CheckoutSession, GatewayError> {
        if self.config.public_key.is_empty() {
            return Err(GatewayError::Configuration(
                "public key is not set".to_string(),
            ));
        }

        let redirect_url = self.build_url(&launch)?;
        tracing::debug!(amount = launch.amount.minor(), "Hosted checkout URL built");

        Ok(CheckoutSession {
            reference: launch.reference,
            redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::{GatewayReference, Money};

    fn gateway() -> HostedCheckoutGateway {
        HostedCheckoutGateway::new(HostedCheckoutConfig {
            checkout_url: "https://checkout.example.com/p/".to_string(),
            public_key: "pub_test_123".to_string(),
            integrity_secret: "test_integrity".to_string(),
            currency: "COP".to_string(),
            redirect_url: Some("https://shop.example.com/orders".to_string()),
        })
    }

    fn launch(amount: i64) -> CheckoutLaunch {
        let order_id = OrderId::new();
        CheckoutLaunch {
            order_id,
            reference: GatewayReference::for_order(order_id),
            amount: Money::from_minor(amount),
            customer_email: Some("ana@example.com".to_string()),
            customer_phone: "3001234567".to_string(),
        }
    }

    #[tokio::test]
    async fn test_url_carries_amount_reference_and_contact() {
        let launch = launch(4500000);
        let reference = launch.reference.clone();

        let session = gateway().launch_checkout(launch).await.unwrap();

        assert_eq!(session.reference, reference);
        let url = &session.redirect_url;
        assert!(url.starts_with("https://checkout.example.com/p/?"));
        assert!(url.contains("public-key=pub_test_123"));
        assert!(url.contains("currency=COP"));
        assert!(url.contains("amount-in-cents=4500000"));
        assert!(url.contains(&format!("reference={}", reference)));
        assert!(url.contains("customer-data%3Aemail=ana%40example.com"));
        assert!(url.contains("redirect-url=https%3A%2F%2Fshop.example.com%2Forders"));
    }

    #[test]
    fn test_integrity_signature_is_sha256_of_concatenation() {
        let gateway = gateway();
        let expected = hex::encode(Sha256::digest(b"ORDER-14500000COPtest_integrity"));

        assert_eq!(gateway.integrity_signature("ORDER-1", 4500000), expected);
        assert_eq!(expected.len(), 64);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let result = gateway().launch_checkout(launch(0)).await;
        assert!(matches!(result, Err(GatewayError::Launch(_))));
    }

    #[tokio::test]
    async fn test_missing_public_key_is_configuration_error() {
        let mut config = gateway().config().clone();
        config.public_key = String::new();

        let result = HostedCheckoutGateway::new(config)
            .launch_checkout(launch(1000))
            .await;

        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }
}
