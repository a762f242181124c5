use serde::{Deserialize, Serialize};

use crate::model::PackageDefinition;
use crate::time::Minutes;

/// Prices in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub total: u64,
    pub downpayment: u64,
}

/// Upfront share: ceil(50% of total).
pub fn downpayment(total: u64) -> u64 {
    total.div_ceil(2)
}

/// Package price plus every started 30-minute block of extension.
pub fn quote(package: &PackageDefinition, extension_minutes: Minutes, rate_per_30_min: u64) -> Quote {
    let blocks = u64::from(extension_minutes).div_ceil(30);
    let total = package
        .price_minor_units
        .saturating_add(blocks.saturating_mul(rate_per_30_min));
    Quote {
        total,
        downpayment: downpayment(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(price: u64) -> PackageDefinition {
        PackageDefinition {
            id: "solo".into(),
            name: "Solo".into(),
            price_minor_units: price,
            duration_minutes: 30,
        }
    }

    #[test]
    fn downpayment_rounds_up() {
        assert_eq!(downpayment(699), 350);
        assert_eq!(downpayment(700), 350);
        assert_eq!(downpayment(1), 1);
        assert_eq!(downpayment(0), 0);
    }

    #[test]
    fn quote_without_extension() {
        assert_eq!(quote(&package(699), 0, 100), Quote { total: 699, downpayment: 350 });
    }

    #[test]
    fn quote_charges_started_blocks() {
        assert_eq!(quote(&package(699), 15, 100).total, 799);
        assert_eq!(quote(&package(699), 30, 100).total, 799);
        assert_eq!(quote(&package(699), 45, 100).total, 899);
        assert_eq!(quote(&package(699), 45, 100).downpayment, 450);
    }
}
