//! # Catalog Inputs
//!
//! Form payloads for warehouses, items, partners, users and prices, with the
//! normalization each one goes through before it reaches the database.
//!
//! Every `normalized()` trims text, turns blank optionals into `None` and
//! rejects what the database must never see.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::validation::{
    normalize_optional, validate_id, validate_name, validate_non_negative_quantity,
    validate_password, validate_phone, validate_price_cents, validate_sku, validate_username,
};

const NAME_MAX: usize = 200;
const ADDRESS_MAX: usize = 500;

/// Warehouse form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWarehouse {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewWarehouse {
    pub fn new(name: impl Into<String>) -> Self {
        NewWarehouse {
            name: name.into(),
            location: None,
        }
    }

    pub fn normalized(&self) -> CoreResult<Self> {
        Ok(NewWarehouse {
            name: validate_name("warehouse name", &self.name, NAME_MAX)?,
            location: normalize_optional("location", self.location.as_deref(), ADDRESS_MAX)?,
        })
    }
}

/// New item form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub sku: String,
    /// Opening stock.
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
    #[serde(default)]
    pub buy_price_cents: i64,
    #[serde(default)]
    pub sell_price_cents: i64,
    #[serde(default)]
    pub warehouse_id: Option<i64>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, sku: impl Into<String>) -> Self {
        NewItem {
            name: name.into(),
            sku: sku.into(),
            quantity: 0,
            min_quantity: 0,
            buy_price_cents: 0,
            sell_price_cents: 0,
            warehouse_id: None,
        }
    }

    pub fn normalized(&self) -> CoreResult<Self> {
        validate_non_negative_quantity("quantity", self.quantity)?;
        validate_non_negative_quantity("minimum quantity", self.min_quantity)?;
        validate_price_cents("buy price", self.buy_price_cents)?;
        validate_price_cents("sell price", self.sell_price_cents)?;
        if let Some(id) = self.warehouse_id {
            validate_id("warehouse", id)?;
        }

        Ok(NewItem {
            name: validate_name("item name", &self.name, NAME_MAX)?,
            sku: validate_sku(&self.sku)?,
            ..self.clone()
        })
    }
}

/// Item edit form. Stock and prices have their own flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    pub name: String,
    pub sku: String,
    pub min_quantity: i64,
    #[serde(default)]
    pub warehouse_id: Option<i64>,
}

impl ItemChanges {
    pub fn normalized(&self) -> CoreResult<Self> {
        validate_non_negative_quantity("minimum quantity", self.min_quantity)?;
        if let Some(id) = self.warehouse_id {
            validate_id("warehouse", id)?;
        }

        Ok(ItemChanges {
            name: validate_name("item name", &self.name, NAME_MAX)?,
            sku: validate_sku(&self.sku)?,
            ..self.clone()
        })
    }
}

/// Price-list edit. `None` leaves a price unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    #[serde(default)]
    pub buy_price_cents: Option<i64>,
    #[serde(default)]
    pub sell_price_cents: Option<i64>,
}

impl PriceChange {
    pub fn validate(&self) -> CoreResult<()> {
        if self.buy_price_cents.is_none() && self.sell_price_cents.is_none() {
            return Err(ValidationError::required("price").into());
        }
        if let Some(cents) = self.buy_price_cents {
            validate_price_cents("buy price", cents)?;
        }
        if let Some(cents) = self.sell_price_cents {
            validate_price_cents("sell price", cents)?;
        }
        Ok(())
    }
}

/// Supplier or customer form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPartner {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewPartner {
    pub fn new(name: impl Into<String>) -> Self {
        NewPartner {
            name: name.into(),
            phone: None,
            address: None,
        }
    }

    pub fn normalized(&self) -> CoreResult<Self> {
        Ok(NewPartner {
            name: validate_name("name", &self.name, NAME_MAX)?,
            phone: validate_phone(self.phone.as_deref())?,
            address: normalize_optional("address", self.address.as_deref(), ADDRESS_MAX)?,
        })
    }
}

/// New user form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub role_id: i64,
}

impl NewUser {
    pub fn normalized(&self) -> CoreResult<Self> {
        validate_password(&self.password)?;
        validate_id("role", self.role_id)?;

        Ok(NewUser {
            username: validate_username(&self.username)?,
            password: self.password.clone(),
            full_name: self.full_name.trim().to_string(),
            role_id: self.role_id,
        })
    }
}

/// Validates a role name.
pub fn validate_role_name(name: &str) -> CoreResult<String> {
    Ok(validate_name("role name", name, 50)?)
}

// =============================================================================
// Unit Tests
// =============================================================================
