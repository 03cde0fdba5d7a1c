use std::{collections::BTreeSet, fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

pub type BankId = String;
pub type CustomerId = String;
pub type AccountId = String;

/// Interest rate given to every freshly opened account, and to stored
/// accounts that have none: 0.01, i.e. 1%.
pub const DEFAULT_INTEREST_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const CARD_NUMBER_LEN: usize = 8;

fn default_interest_rate() -> Decimal {
    DEFAULT_INTEREST_RATE
}

/// Permission tag carried by a customer.
///
/// Stored lowercase (`"user"`, `"admin"`); the `ROLE_` prefixed spelling is
/// accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown role `{0}`")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        let tag = tag
            .strip_prefix("ROLE_")
            .or_else(|| tag.strip_prefix("role_"))
            .unwrap_or(tag);
        match tag.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

fn default_roles() -> BTreeSet<Role> {
    BTreeSet::from([Role::User])
}

/// Unknown tags are dropped; an empty or missing list becomes `{user}`.
fn deserialize_roles<'de, D>(deserializer: D) -> Result<BTreeSet<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    let roles: BTreeSet<Role> = tags
        .iter()
        .filter_map(|tag| match tag.parse() {
            Ok(role) => Some(role),
            Err(err) => {
                warn!("Ignoring stored role: {err}");
                None
            }
        })
        .collect();
    if roles.is_empty() {
        Ok(default_roles())
    } else {
        Ok(roles)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub id: BankId,
    #[serde(default)]
    pub name: String,
}

impl Bank {
    pub fn new(id: impl Into<BankId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub card_number: String,
    /// Banks the customer opened accounts with, in insertion order.
    #[serde(default)]
    pub bank_ids: Vec<BankId>,
    #[serde(default = "default_roles", deserialize_with = "deserialize_roles")]
    pub roles: BTreeSet<Role>,
}

impl Customer {
    /// New customer holding only the [`Role::User`] tag.
    pub fn new(
        id: impl Into<CustomerId>,
        name: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        card_number: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            card_number: card_number.into(),
            bank_ids: Vec::new(),
            roles: default_roles(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Role set handed to the authorization layer. Never empty.
    pub fn permissions(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision")]
    pub balance: Decimal,
    /// Fraction, not percent: 0.01 is 1%.
    #[serde(
        default = "default_interest_rate",
        with = "rust_decimal::serde::arbitrary_precision"
    )]
    pub interest_rate: Decimal,
    #[serde(default)]
    pub bank_id: BankId,
    #[serde(default)]
    pub customer_id: CustomerId,
}

impl Account {
    /// Opens an empty account at the default interest rate.
    pub fn new(
        id: impl Into<AccountId>,
        customer_id: impl Into<CustomerId>,
        bank_id: impl Into<BankId>,
    ) -> Self {
        Self {
            id: id.into(),
            balance: Decimal::ZERO,
            interest_rate: DEFAULT_INTEREST_RATE,
            bank_id: bank_id.into(),
            customer_id: customer_id.into(),
        }
    }
}

pub(crate) fn new_bank_id() -> BankId {
    Uuid::new_v4().to_string()
}

pub(crate) fn new_card_number() -> String {
    let mut card = Uuid::new_v4().simple().to_string();
    card.truncate(CARD_NUMBER_LEN);
    card
}
