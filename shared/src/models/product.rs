//! Product catalogue models

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const SKU_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SKU_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "product_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    Product,
    Service,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Product => "product",
            ProductType::Service => "service",
        }
    }

    pub fn sku_prefix(&self) -> &'static str {
        match self {
            ProductType::Product => "PROD",
            ProductType::Service => "SERV",
        }
    }

    /// Services are never stocked
    pub fn tracks_stock(&self) -> bool {
        matches!(self, ProductType::Product)
    }
}

impl std::str::FromStr for ProductType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "product" => Ok(ProductType::Product),
            "service" => Ok(ProductType::Service),
            other => Err(DomainError::validation(
                "product_type",
                format!("Unknown product type '{}'", other),
            )),
        }
    }
}

/// Random candidate SKU such as `PROD-7KX2QA`. Callers retry until unused.
pub fn generate_sku<R: Rng + ?Sized>(product_type: ProductType, rng: &mut R) -> String {
    let suffix: String = (0..SKU_SUFFIX_LEN)
        .map(|_| SKU_ALPHABET[rng.gen_range(0..SKU_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", product_type.sku_prefix(), suffix)
}

/// Category commission rates are percentages in 0..=100
pub fn validate_commission_percentage(percentage: Decimal) -> Result<(), DomainError> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation(
            "commission_percentage",
            "Commission percentage must be between 0 and 100",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sku_format() {
        let mut rng = rand::thread_rng();
        for product_type in [ProductType::Product, ProductType::Service] {
            let sku = generate_sku(product_type, &mut rng);
            let (prefix, suffix) = sku.split_once('-').unwrap();
            assert_eq!(prefix, product_type.sku_prefix());
            assert_eq!(suffix.len(), 6);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_product_type_parse() {
        assert_eq!("Product".parse::<ProductType>(), Ok(ProductType::Product));
        assert_eq!(" SERVICE ".parse::<ProductType>(), Ok(ProductType::Service));
        assert_eq!("".parse::<ProductType>(), Ok(ProductType::Product));
        assert!("goods".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_only_products_track_stock() {
        assert!(ProductType::Product.tracks_stock());
        assert!(!ProductType::Service.tracks_stock());
    }

    #[test]
    fn test_commission_percentage_bounds() {
        assert!(validate_commission_percentage(Decimal::ZERO).is_ok());
        assert!(validate_commission_percentage(Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_commission_percentage(Decimal::from(101)).is_err());
        assert!(validate_commission_percentage(Decimal::from(-1)).is_err());
    }
}
