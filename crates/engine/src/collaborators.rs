//! Services the engine consumes but does not own.

use serde::{Deserialize, Serialize};

use lotkeeper_core::{ProductDescriptor, UserId};
use lotkeeper_pricing::{ExchangeRate, PricingError};

/// Who is performing the current action.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;

    /// Name recorded as staff on ledger events.
    fn display_name(&self, user: UserId) -> Option<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub country_of_origin: Option<String>,
    pub category: Option<String>,
}

/// Product master lookup by descriptor.
pub trait ProductMaster: Send + Sync {
    fn lookup(&self, descriptor: &ProductDescriptor) -> Option<ProductInfo>;
}

/// Read-only settlement → ledger exchange rate.
pub trait ExchangeRateSource: Send + Sync {
    fn current_rate(&self) -> Result<ExchangeRate, PricingError>;
}

/// A single operator, fixed for the process.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<(UserId, String)>,
}

impl StaticIdentity {
    pub fn new(user: UserId, name: impl Into<String>) -> Self {
        Self {
            user: Some((user, name.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.as_ref().map(|(id, _)| *id)
    }

    fn display_name(&self, user: UserId) -> Option<String> {
        self.user
            .as_ref()
            .filter(|(id, _)| *id == user)
            .map(|(_, name)| name.clone())
    }
}

/// Product master backed by a fixed table; first matching descriptor wins.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductMaster {
    entries: Vec<(ProductDescriptor, ProductInfo)>,
}

impl InMemoryProductMaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: ProductDescriptor, info: ProductInfo) -> Self {
        self.entries.push((descriptor, info));
        self
    }
}

impl ProductMaster for InMemoryProductMaster {
    fn lookup(&self, descriptor: &ProductDescriptor) -> Option<ProductInfo> {
        self.entries
            .iter()
            .find(|(d, _)| d.matches(descriptor))
            .map(|(_, info)| info.clone())
    }
}

/// Rate fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub ExchangeRate);

impl ExchangeRateSource for FixedRate {
    fn current_rate(&self) -> Result<ExchangeRate, PricingError> {
        Ok(self.0)
    }
}
