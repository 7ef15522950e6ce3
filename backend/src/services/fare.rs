//! Distance to peso conversion.
//!
//! ₱15 covers the first 3 km and every started kilometre after that adds ₱3.
//! Discounted riders pay 20% less, and the payable amount is rounded to the
//! nearest ₱0.50.

use serde::Serialize;
use thiserror::Error;

use crate::database::models::DiscountType;

pub const BASE_FARE: f64 = 15.0;
pub const BASE_DISTANCE_KM: f64 = 3.0;
pub const PER_KM_RATE: f64 = 3.0;
pub const DISCOUNT_RATE: f64 = 0.20;

#[derive(Debug, Error, PartialEq)]
pub enum FareError {
    #[error("Distance must be a finite, non-negative number of kilometres")]
    InvalidDistance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareBreakdown {
    pub distance_km: f64,
    pub base_fare: f64,
    pub additional_km: u32,
    pub additional_fare: f64,
    pub subtotal: f64,
    pub discount_rate: f64,
    pub discount_amount: f64,
    pub total: f64,
    pub discount_type: Option<DiscountType>,
}

impl FareBreakdown {
    pub fn is_discounted(&self) -> bool {
        self.discount_type.is_some()
    }
}

pub fn round_to_half(amount: f64) -> f64 {
    (amount * 2.0).round() / 2.0
}

/// All discount types share the same rate.
pub fn discount_rate(_discount: DiscountType) -> f64 {
    DISCOUNT_RATE
}

pub fn calculate_fare(
    distance_km: f64,
    discount: Option<DiscountType>,
) -> Result<FareBreakdown, FareError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(FareError::InvalidDistance);
    }

    let additional_km = (distance_km - BASE_DISTANCE_KM).max(0.0).ceil() as u32;
    let additional_fare = f64::from(additional_km) * PER_KM_RATE;
    let subtotal = BASE_FARE + additional_fare;

    let rate = discount.map(discount_rate).unwrap_or(0.0);
    let total = round_to_half(subtotal * (1.0 - rate));

    Ok(FareBreakdown {
        distance_km,
        base_fare: BASE_FARE,
        additional_km,
        additional_fare,
        subtotal,
        discount_rate: rate,
        discount_amount: subtotal - total,
        total,
        discount_type: discount,
    })
}
